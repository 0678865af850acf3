//! End-to-end invocation: template → variables → context → model → output.

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use heyi_crawler::{CrawlerStrategy, Retriever};
use heyi_shared::Result;

use crate::assembler;
use crate::contract::OutputContract;
use crate::preset::ResolvedOptions;
use crate::provider::{CompletionRequest, ModelProvider};
use crate::variables::{self, Prompter};

/// Everything one run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The raw prompt template, placeholders unfilled.
    pub template: String,
    /// Merged flag, preset and default options.
    pub options: ResolvedOptions,
    /// Whether missing placeholders may be asked for.
    pub interactive: bool,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the result is ready.
    fn done(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self) {}
}

/// Run one invocation and return the text to print.
///
/// The output contract is built first, so a missing or malformed schema
/// fails before any question is asked or any source is fetched.
#[instrument(skip_all, fields(model = %invocation.options.model, format = %invocation.options.format))]
pub async fn run<M, P>(
    invocation: Invocation,
    provider: &M,
    prompter: &mut P,
    progress: &dyn ProgressReporter,
) -> Result<String>
where
    M: ModelProvider,
    P: Prompter,
{
    let start = Instant::now();
    let Invocation {
        template,
        options,
        interactive,
    } = invocation;

    let contract = OutputContract::new(options.format, options.schema.as_deref())?;
    if options.schema.is_some() && !options.format.requires_schema() {
        debug!(format = %options.format, "schema ignored for scalar format");
    }

    let mut vars = options.vars;
    let missing = variables::find_missing(&template, &vars);
    if !missing.is_empty() {
        if interactive {
            variables::resolve_missing(&missing, prompter, &mut vars).await?;
        } else {
            let names: Vec<&str> = missing.iter().map(|p| p.name.as_str()).collect();
            warn!(?names, "no interactive input available, leaving placeholders unfilled");
        }
    }
    let prompt = variables::substitute(&template, &vars);

    let strategy = CrawlerStrategy::from_token(&options.crawler);
    let retriever = Retriever::new(strategy)?;
    if !options.files.is_empty() || !options.urls.is_empty() {
        progress.phase("Gathering context");
    }
    let prompt = assembler::assemble(&prompt, &options.files, &options.urls, &retriever).await?;

    progress.phase("Waiting for the model");
    let request = CompletionRequest {
        model: options.model,
        prompt,
        schema: contract.response_schema(),
    };
    let response = provider.complete(&request).await?;
    let output = contract.unwrap_result(&response)?;

    progress.done();
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "invocation complete");
    Ok(output)
}

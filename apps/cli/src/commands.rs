//! CLI command definitions, routing, and tracing setup.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncReadExt;
use tracing::info;

use heyi_core::variables::parse_assignment;
use heyi_core::{
    Defaults, FlagOptions, Invocation, OpenRouterClient, PresetConfig, ProgressReporter,
    load_preset, merge,
};
use heyi_shared::{HeyiConfig, HeyiError, OutputFormat};

use crate::prompt::TerminalPrompter;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// heyi: ask a model from the terminal, with templates, context and typed output.
#[derive(Parser)]
#[command(
    name = "heyi",
    version,
    about = "Send a prompt to a language model, optionally with file or URL context, and print a typed answer.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a prompt given as an argument or piped on stdin.
    Prompt {
        /// Prompt template. Read from stdin when omitted.
        prompt: Option<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Run a preset file, with flags overriding its settings.
    Preset {
        /// Path to the preset JSON file.
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Options shared by every run.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Model identifier, e.g. openai/gpt-4o-mini.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output format: string, number, object, or array.
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Schema for object/array output, e.g. '{ name: string, tags?: [string] }'.
    #[arg(short, long)]
    pub schema: Option<String>,

    /// URL retrieval: fetch, browser, or a path to a Chrome/Chromium binary.
    #[arg(short, long)]
    pub crawler: Option<String>,

    /// File to add as context (repeatable).
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// URL to add as context (repeatable).
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Template variable (repeatable).
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub vars: Vec<(String, String)>,
}

impl From<RunArgs> for FlagOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            model: args.model,
            format: args.format,
            schema: args.schema,
            crawler: args.crawler,
            files: args.files,
            urls: args.urls,
            vars: args.vars.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout carries
/// only the result.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "heyi=warn",
        1 => "heyi=info",
        2 => "heyi=debug",
        _ => "heyi=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    // Fail on a missing API key before reading input or touching the network.
    let config = HeyiConfig::from_env()?;

    let invocation = match cli.command {
        Command::Prompt { prompt, run } => prompt_invocation(prompt, run, &config).await?,
        Command::Preset { file, run } => preset_invocation(&file, run, &config).await?,
    };

    info!(
        model = %invocation.options.model,
        format = %invocation.options.format,
        crawler = %invocation.options.crawler,
        "running prompt"
    );

    let provider = OpenRouterClient::from_config(&config)?;
    let mut prompter = TerminalPrompter::new();
    let reporter = CliProgress::new();

    let output = heyi_core::run(invocation, &provider, &mut prompter, &reporter).await;
    reporter.clear();

    println!("{}", output?);
    Ok(())
}

async fn prompt_invocation(
    prompt: Option<String>,
    args: RunArgs,
    config: &HeyiConfig,
) -> Result<Invocation> {
    let stdin_is_terminal = std::io::stdin().is_terminal();

    let (template, interactive) = match prompt {
        Some(prompt) => (prompt, stdin_is_terminal),
        None if !stdin_is_terminal => (read_stdin().await?, false),
        None => {
            return Err(HeyiError::validation(
                "no prompt given: pass one as an argument or pipe it on stdin",
            )
            .into());
        }
    };

    Ok(Invocation {
        template,
        options: merge(args.into(), None, &Defaults::from(config)),
        interactive,
    })
}

async fn preset_invocation(file: &Path, args: RunArgs, config: &HeyiConfig) -> Result<Invocation> {
    let preset: PresetConfig = load_preset(file).await?;
    let stdin_is_terminal = std::io::stdin().is_terminal();

    let (template, interactive) = match preset.prompt.clone() {
        Some(prompt) => (prompt, stdin_is_terminal),
        None if !stdin_is_terminal => (read_stdin().await?, false),
        None => {
            return Err(HeyiError::validation(format!(
                "preset {} has no prompt and none was piped on stdin",
                file.display()
            ))
            .into());
        }
    };

    Ok(Invocation {
        template,
        options: merge(args.into(), Some(&preset), &Defaults::from(config)),
        interactive,
    })
}

/// Read the whole of stdin as the prompt template.
async fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .wrap_err("failed to read prompt from stdin")?;

    if buf.trim().is_empty() {
        return Err(HeyiError::validation("the prompt read from stdin is empty").into());
    }
    Ok(buf)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner on stderr. Created on the first phase so it never draws over
/// interactive questions, which are asked before any phase starts.
struct CliProgress {
    spinner: OnceLock<ProgressBar>,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: OnceLock::new(),
        }
    }

    fn spinner(&self) -> &ProgressBar {
        self.spinner.get_or_init(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
                spinner.set_style(
                    style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                );
            }
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        })
    }

    fn clear(&self) {
        if let Some(spinner) = self.spinner.get() {
            spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner().set_message(name.to_string());
    }

    fn done(&self) {
        self.clear();
    }
}

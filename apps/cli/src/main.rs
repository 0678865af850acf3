//! heyi: a command-line client for language models.
//!
//! Fills `{{placeholders}}` in a prompt, attaches file and URL context, and
//! prints the model's answer in the requested shape.

mod commands;
mod prompt;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

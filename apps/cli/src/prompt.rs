//! Terminal prompter: asks for missing placeholder values on stderr and
//! reads answers line by line from stdin.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use heyi_core::Prompter;
use heyi_shared::{HeyiError, Result};

pub(crate) struct TerminalPrompter {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalPrompter {
    pub(crate) fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Prompter for TerminalPrompter {
    async fn ask(&mut self, question: &str) -> Result<String> {
        eprint!("{question}: ");
        std::io::stderr()
            .flush()
            .map_err(|e| HeyiError::Prompt(e.to_string()))?;

        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(line.trim_end_matches('\r').to_string()),
            Ok(None) => Err(HeyiError::Prompt(format!(
                "input closed before '{question}' was answered"
            ))),
            Err(e) => Err(HeyiError::Prompt(e.to_string())),
        }
    }
}

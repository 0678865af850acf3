//! Retrieval strategy selection from the `--crawler` token.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Token selecting the lightweight HTTP strategy.
pub const FETCH_TOKEN: &str = "fetch";

/// Token selecting the full-render strategy with an auto-detected browser.
pub const BROWSER_TOKEN: &str = "browser";

/// How URL sources are turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CrawlerStrategy {
    /// Plain HTTP GET, no script execution.
    #[default]
    Fetch,
    /// Headless Chromium render. `executable` overrides browser detection.
    Browser { executable: Option<PathBuf> },
}

impl CrawlerStrategy {
    /// Interpret a crawler token.
    ///
    /// `browser` selects full render; a path-shaped token selects full render
    /// with that executable; everything else falls back to [`Self::Fetch`].
    /// The executable is not checked here, launch reports a bad path.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();

        if token == BROWSER_TOKEN {
            return Self::Browser { executable: None };
        }

        if looks_like_path(token) {
            return Self::Browser {
                executable: Some(PathBuf::from(token)),
            };
        }

        if token != FETCH_TOKEN {
            tracing::debug!(token, "unrecognized crawler token, using fetch");
        }
        Self::Fetch
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetch => FETCH_TOKEN,
            Self::Browser { .. } => BROWSER_TOKEN,
        }
    }
}

fn looks_like_path(token: &str) -> bool {
    !token.is_empty()
        && (Path::new(token).is_absolute() || token.contains('/') || token.contains(MAIN_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_token_selects_full_render() {
        assert_eq!(
            CrawlerStrategy::from_token("browser"),
            CrawlerStrategy::Browser { executable: None }
        );
    }

    #[test]
    fn path_tokens_select_full_render_with_executable() {
        assert_eq!(
            CrawlerStrategy::from_token("/usr/bin/chromium"),
            CrawlerStrategy::Browser {
                executable: Some(PathBuf::from("/usr/bin/chromium"))
            }
        );
        assert_eq!(
            CrawlerStrategy::from_token("./bin/chrome"),
            CrawlerStrategy::Browser {
                executable: Some(PathBuf::from("./bin/chrome"))
            }
        );
        assert_eq!(
            CrawlerStrategy::from_token("../chrome-linux/chrome"),
            CrawlerStrategy::Browser {
                executable: Some(PathBuf::from("../chrome-linux/chrome"))
            }
        );
    }

    #[test]
    fn everything_else_is_fetch() {
        assert_eq!(CrawlerStrategy::from_token("fetch"), CrawlerStrategy::Fetch);
        assert_eq!(CrawlerStrategy::from_token("chromium"), CrawlerStrategy::Fetch);
        assert_eq!(CrawlerStrategy::from_token(""), CrawlerStrategy::Fetch);
    }
}

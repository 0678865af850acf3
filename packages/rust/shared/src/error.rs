//! Error types for heyi.
//!
//! Library crates use [`HeyiError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all heyi operations.
#[derive(Debug, thiserror::Error)]
pub enum HeyiError {
    /// Environment or configuration error (missing API key, missing schema, ...).
    #[error("config error: {message}")]
    Config { message: String },

    /// Invalid user input (missing prompt, malformed `--var`, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A URL whose scheme the retriever refuses to fetch.
    #[error("unsupported URL scheme '{scheme}' in {url}: only http and https are allowed")]
    UnsupportedScheme { scheme: String, url: String },

    /// Schema-language parse error.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// The preset file does not exist.
    #[error("preset not found: {}", path.display())]
    PresetNotFound { path: PathBuf },

    /// The preset file exists but is not a valid preset document.
    #[error("malformed preset {}: {message}", path.display())]
    MalformedPreset { path: PathBuf, message: String },

    /// A context source (file or URL) could not be retrieved.
    #[error("failed to retrieve {label}: {message}")]
    Retrieval { label: String, message: String },

    /// Remote model provider error (HTTP, API, or response contract).
    #[error("provider error: {0}")]
    Provider(String),

    /// The interactive input channel failed or closed.
    #[error("prompt error: {0}")]
    Prompt(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HeyiError>;

impl HeyiError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    /// Attribute a retrieval failure to the source that caused it.
    pub fn retrieval(label: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Retrieval {
            label: label.into(),
            message: msg.to_string(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

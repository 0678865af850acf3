//! Core domain types shared by the heyi crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::HeyiError;

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// The response shape requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A plain string.
    #[default]
    String,
    /// A single numeric value.
    Number,
    /// One structured object described by a schema.
    Object,
    /// A list of structured items, each described by a schema.
    Array,
}

impl OutputFormat {
    /// The token used on the command line and in preset files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Whether this shape needs a schema description.
    pub fn requires_schema(&self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = HeyiError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            other => Err(HeyiError::validation(format!(
                "unknown format '{other}': expected string, number, object, or array"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Context sources
// ---------------------------------------------------------------------------

/// A place context text is pulled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSource {
    /// A local file, read as UTF-8 text.
    File(PathBuf),
    /// A remote URL, fetched and reduced to plain text.
    Url(String),
}

impl ContextSource {
    /// The label shown to the model and used in error messages.
    pub fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
        }
    }
}

/// Text retrieved from one [`ContextSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedContent {
    /// Original path or URL.
    pub label: String,
    /// File contents, or sanitized page text.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_known_tokens() {
        assert_eq!("string".parse::<OutputFormat>().unwrap(), OutputFormat::String);
        assert_eq!("array".parse::<OutputFormat>().unwrap(), OutputFormat::Array);
        assert!("Array".parse::<OutputFormat>().is_err());
        assert!("list".parse::<OutputFormat>().unwrap_err().to_string().contains("'list'"));
    }

    #[test]
    fn format_deserializes_lowercase() {
        let f: OutputFormat = serde_json::from_str("\"object\"").unwrap();
        assert_eq!(f, OutputFormat::Object);
        assert!(serde_json::from_str::<OutputFormat>("\"table\"").is_err());
    }

    #[test]
    fn only_structured_formats_require_schema() {
        assert!(!OutputFormat::String.requires_schema());
        assert!(!OutputFormat::Number.requires_schema());
        assert!(OutputFormat::Object.requires_schema());
        assert!(OutputFormat::Array.requires_schema());
    }

    #[test]
    fn source_labels() {
        assert_eq!(ContextSource::File("docs/a.txt".into()).label(), "docs/a.txt");
        assert_eq!(
            ContextSource::Url("https://example.com/x".into()).label(),
            "https://example.com/x"
        );
    }
}

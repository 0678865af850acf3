//! Preset files and option merging.
//!
//! A preset is a JSON document bundling a prompt with default options.
//! Scalars resolve as flag, then preset, then built-in default. List options
//! concatenate: preset entries first, flag entries after.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use heyi_shared::{DEFAULT_CRAWLER, DEFAULT_MODEL, HeyiConfig, HeyiError, OutputFormat, Result};

use crate::variables::VariableMap;

/// A parsed preset file. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PresetConfig {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Schema-language text for `object` and `array` formats.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub crawler: Option<String>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Options given on the command line.
///
/// A scalar is `Some` exactly when its flag was present, so an explicit flag
/// equal to a default still overrides the preset.
#[derive(Debug, Clone, Default)]
pub struct FlagOptions {
    pub model: Option<String>,
    pub format: Option<OutputFormat>,
    pub schema: Option<String>,
    pub crawler: Option<String>,
    pub files: Vec<PathBuf>,
    pub urls: Vec<String>,
    pub vars: VariableMap,
}

/// Values used when neither a flag nor the preset sets an option.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub model: String,
    pub crawler: String,
    pub format: OutputFormat,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            crawler: DEFAULT_CRAWLER.to_string(),
            format: OutputFormat::default(),
        }
    }
}

impl From<&HeyiConfig> for Defaults {
    fn from(config: &HeyiConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            crawler: config.default_crawler.clone(),
            format: OutputFormat::default(),
        }
    }
}

/// Fully merged options for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub model: String,
    pub format: OutputFormat,
    pub schema: Option<String>,
    pub crawler: String,
    pub files: Vec<PathBuf>,
    pub urls: Vec<String>,
    pub vars: VariableMap,
}

/// Read and parse a preset file.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn load_preset(path: &Path) -> Result<PresetConfig> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HeyiError::PresetNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(HeyiError::io(path, e)),
    };

    let preset = parse_preset(path, &raw)?;
    debug!(
        has_prompt = preset.prompt.is_some(),
        files = preset.files.len(),
        urls = preset.urls.len(),
        "preset loaded"
    );
    Ok(preset)
}

/// Parse preset JSON, attributing failures to `path`.
pub fn parse_preset(path: &Path, raw: &str) -> Result<PresetConfig> {
    serde_json::from_str(raw).map_err(|e| HeyiError::MalformedPreset {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Combine flags, an optional preset and defaults.
pub fn merge(flags: FlagOptions, preset: Option<&PresetConfig>, defaults: &Defaults) -> ResolvedOptions {
    let FlagOptions {
        model,
        format,
        schema,
        crawler,
        files,
        urls,
        vars,
    } = flags;

    let Some(preset) = preset else {
        return ResolvedOptions {
            model: model.unwrap_or_else(|| defaults.model.clone()),
            format: format.unwrap_or(defaults.format),
            schema,
            crawler: crawler.unwrap_or_else(|| defaults.crawler.clone()),
            files,
            urls,
            vars,
        };
    };

    ResolvedOptions {
        model: model
            .or_else(|| preset.model.clone())
            .unwrap_or_else(|| defaults.model.clone()),
        format: format.or(preset.format).unwrap_or(defaults.format),
        schema: schema.or_else(|| preset.schema.clone()),
        crawler: crawler
            .or_else(|| preset.crawler.clone())
            .unwrap_or_else(|| defaults.crawler.clone()),
        files: preset.files.iter().cloned().chain(files).collect(),
        urls: preset.urls.iter().cloned().chain(urls).collect(),
        vars,
    }
}

//! Shared types, error model, and configuration for heyi.
//!
//! This crate is the foundation depended on by all other heyi crates.
//! It provides:
//! - [`HeyiError`]: the unified error type
//! - Domain types ([`OutputFormat`], [`ContextSource`], [`RetrievedContent`])
//! - Environment configuration ([`HeyiConfig`])

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    API_KEY_ENV, BASE_URL_ENV, CRAWLER_ENV, DEFAULT_BASE_URL, DEFAULT_CRAWLER, DEFAULT_MODEL,
    HeyiConfig, MODEL_ENV,
};
pub use error::{HeyiError, Result};
pub use types::{ContextSource, OutputFormat, RetrievedContent};

//! Core logic for heyi.
//!
//! This crate turns a prompt template plus options into a model answer:
//! placeholder filling, context assembly, preset merging, the output
//! contract with its schema language, and the provider client.

pub mod assembler;
pub mod contract;
pub mod pipeline;
pub mod preset;
pub mod provider;
pub mod schema;
pub mod variables;

pub use contract::OutputContract;
pub use pipeline::{Invocation, ProgressReporter, SilentProgress, run};
pub use preset::{Defaults, FlagOptions, PresetConfig, ResolvedOptions, load_preset, merge};
pub use provider::{CompletionRequest, ModelProvider, OpenRouterClient};
pub use schema::Schema;
pub use variables::{Placeholder, Prompter, VariableMap};

//! Context source retrieval for heyi.
//!
//! This crate provides:
//! - [`Retriever`]: reads files and fetches URLs into [`RetrievedContent`]
//! - [`CrawlerStrategy`]: lightweight HTTP fetch vs. full browser render
//! - [`render`]: the browser session seam and its Chromium implementation
//! - [`html_to_text`]: markup stripping shared by both strategies
//!
//! [`RetrievedContent`]: heyi_shared::RetrievedContent

pub mod engine;
pub mod render;
pub mod sanitize;
pub mod strategy;

pub use engine::Retriever;
pub use render::{
    BrowserLauncher, ChromiumLauncher, DEFAULT_IDLE_TIMEOUT, RenderError, RenderSession,
    render_page,
};
pub use sanitize::html_to_text;
pub use strategy::{BROWSER_TOKEN, CrawlerStrategy, FETCH_TOKEN};

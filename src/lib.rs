//! `glean` - content mining for pages with no stable schema
//!
//! # Features
//!
//! - **Document index**: search-anywhere key lookup over parsed JSON with a
//!   deterministic, type-stratified walk order
//! - **Social posts**: author, text, images, timestamp and engagement counters
//!   from a post page's embedded JSON
//! - **Forum articles**: title, markdown and plain text bodies and images from
//!   forum HTML, with metadata, footer and comment threads stripped
//!
//! Extraction is synchronous and pure: documents are fetched by the caller and
//! no extractor keeps state between calls.
//!
//! # Example
//!
//! ```rust
//! use glean::json::JsonNode;
//!
//! let tree = JsonNode::parse(r#"{"meta": {"id": 1}, "items": [{"id": 2}]}"#).unwrap();
//! // lists are walked before sibling dicts
//! assert_eq!(tree.first("id").and_then(JsonNode::as_i64), Some(2));
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod json;
pub mod site;

pub use config::{Config, ForumOptions, PostOptions};
pub use error::{ExtractionError, Result};
pub use json::{JsonNode, Scalar};
pub use site::{Engagement, ExtractedArticle, ExtractedPost};

/// Version of glean
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

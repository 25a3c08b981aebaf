//! Platform-specific content extraction.
//!
//! Each platform module turns an already-fetched document into a structured
//! record. Extraction is synchronous and stateless: no I/O, no shared state,
//! and independent calls may run in parallel.
//!
//! - [`facebook`]: embedded page JSON → [`ExtractedPost`]
//! - [`ptt`]: forum article HTML → [`ExtractedArticle`]
//!
//! # Example
//!
//! ```rust
//! use glean::config::ForumOptions;
//! use glean::site::ptt;
//!
//! let html = r#"<html><head><title>t</title></head><body>
//!   <div id="main-content">Hello forum</div></body></html>"#;
//! let article = ptt::sanitize(html, "https://www.ptt.cc/bbs/Test/M.1.html", &ForumOptions::default())?;
//! assert_eq!(article.plain_text_body.as_deref(), Some("Hello forum"));
//! # Ok::<(), glean::ExtractionError>(())
//! ```

pub mod facebook;
pub mod ptt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Engagement counters as the provider displays them (e.g. `"1.2K"`).
///
/// These are opaque display strings, never parsed into numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Engagement {
    pub likes: String,
    pub comments: String,
    pub shares: String,
}

/// A social-media post mined from embedded page JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedPost {
    pub author_name: String,
    /// Empty when the post has no message.
    pub text: String,
    /// Absolute image URLs in post order.
    pub image_links: Vec<String>,
    pub canonical_url: String,
    /// Creation time in epoch seconds, when the page carries it.
    pub created_at: Option<i64>,
    pub like_count: String,
    pub comment_count: String,
    pub share_count: String,
}

impl ExtractedPost {
    pub fn engagement(&self) -> Engagement {
        Engagement {
            likes: self.like_count.clone(),
            comments: self.comment_count.clone(),
            shares: self.share_count.clone(),
        }
    }

    /// Creation time as a UTC timestamp.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// A forum article with structural noise removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub markdown_body: Option<String>,
    pub plain_text_body: Option<String>,
    /// Absolute, de-duplicated, first-occurrence order.
    pub image_links: Vec<String>,
}

impl ExtractedArticle {
    /// Best available description: plain text, else markdown, else empty.
    pub fn description(&self) -> &str {
        self.plain_text_body
            .as_deref()
            .or(self.markdown_body.as_deref())
            .unwrap_or_default()
    }
}

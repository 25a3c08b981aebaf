//! Rendering of cleaned HTML fragments.
//!
//! - [`html::html_to_markdown`]: markdown with `#` headings via `html2md`
//! - [`html::normalize_plain_text`]: line-based plain text cleanup

pub mod html;

pub use html::{html_to_markdown, normalize_plain_text};

//! Extraction errors.
//!
//! Every failure is terminal for the call that produced it. Each variant maps
//! to a short machine-readable reason via [`ExtractionError::reason`] so callers
//! can surface a generic "could not parse this content" message while keeping
//! the cause for diagnostics.

use thiserror::Error;

/// Errors raised by the post extractor and the article sanitizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("content region not found")]
    ContentRegionMissing,

    #[error("no post data found")]
    PostDataMissing,

    #[error("cannot resolve post root")]
    PostRootUnresolvable,

    #[error("engagement counters missing: {0}")]
    CountersMissing(&'static str),

    #[error("{step}: missing field `{field}`")]
    FieldMissing {
        step: &'static str,
        field: &'static str,
    },

    #[error("no extractable content")]
    NoExtractableContent,
}

impl ExtractionError {
    /// Machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ContentRegionMissing => "content-region-missing",
            Self::PostDataMissing => "post-data-missing",
            Self::PostRootUnresolvable => "post-root-unresolvable",
            Self::CountersMissing(_) => "counters-missing",
            Self::FieldMissing { .. } => "field-missing",
            Self::NoExtractableContent => "no-extractable-content",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractionError>;

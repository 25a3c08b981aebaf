//! Extractor options, optionally loaded from `~/.config/glean/config.toml`.
//!
//! Only localized markers and marker keys are configurable; the structural
//! selectors of each page layout are fixed in the extractors themselves.
//!
//! ```toml
//! [post]
//! blob_marker = "i18n_reaction_count"
//!
//! [forum]
//! title_label = "標題"
//! footer_marker = "※ 發信站"
//! image_extensions = ["jpg", "png"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Options for the social post extractor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostOptions {
    /// Substring that marks an embedded JSON block as carrying post engagement data.
    pub blob_marker: String,
}

impl Default for PostOptions {
    fn default() -> Self {
        Self {
            blob_marker: "i18n_reaction_count".to_string(),
        }
    }
}

/// Options for the forum article sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForumOptions {
    /// Metadata label whose value is the article title.
    pub title_label: String,
    /// Line that introduces the signature/footer block.
    pub divider: String,
    /// Text that must follow the divider for it to count as one.
    pub footer_marker: String,
    /// Hyperlink extensions treated as images (without the dot, any case).
    pub image_extensions: Vec<String>,
}

impl Default for ForumOptions {
    fn default() -> Self {
        Self {
            title_label: "標題".to_string(),
            divider: "--".to_string(),
            footer_marker: "※ 發信站".to_string(),
            image_extensions: ["jpg", "jpeg", "png", "gif", "webp", "bmp"]
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub post: PostOptions,
    pub forum: ForumOptions,
}

impl Config {
    /// Parse a TOML document. Missing tables and keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid TOML in config")
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; an explicitly given path
    /// must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }
}

/// Return the path to the default config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glean")
        .join("config.toml")
}

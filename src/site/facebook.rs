//! Facebook post extraction from embedded page JSON.
//!
//! Post pages ship their data as many `<script type="application/json">`
//! blocks whose shape drifts between site releases. Instead of a fixed schema
//! the extractor searches the parsed tree by key (see [`crate::json::index`]):
//!
//! 1. pick the block carrying engagement data ([`select_post_blob`])
//! 2. locate the post root, trying each known wrapping in turn ([`resolve_root`])
//! 3. read counters, timestamp, author, text, images and URL ([`extract`])
//!
//! # Example
//!
//! ```rust
//! use glean::json::JsonNode;
//! use glean::site::facebook;
//!
//! let blob = JsonNode::parse(r#"{"data": {
//!     "comet_ufi_summary_and_actions_renderer": {"feedback": {
//!         "i18n_reaction_count": "10", "i18n_share_count": "1",
//!         "comment_rendering_instance": {"comments": {"total_count": 2}}}},
//!     "content": {"story": {
//!         "actors": [{"name": "Alice"}], "message": {"text": "Hello"},
//!         "wwwURL": "https://example/post/1"}}}}"#).unwrap();
//!
//! let post = facebook::extract(&blob)?;
//! assert_eq!(post.author_name, "Alice");
//! assert_eq!(post.like_count, "10");
//! # Ok::<(), glean::ExtractionError>(())
//! ```

use std::cmp::Reverse;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use super::{Engagement, ExtractedPost};
use crate::config::PostOptions;
use crate::error::{ExtractionError, Result};
use crate::json::JsonNode;

const WWWFB: &str = "https://www.facebook.com/";

/// Node holding the post's feedback (reactions, comments, shares).
const FEEDBACK_RENDERER: &str = "comet_ufi_summary_and_actions_renderer";

/// Single-photo node used when no attachment yields images.
const SINGLE_PHOTO_RENDERER: &str = "comet_photo_attachment_resolution_renderer";

static JSON_SCRIPT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/json"][data-content-len][data-sjs]"#)
        .expect("valid selector")
});

/// One embedded JSON text block from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBlock {
    pub text: String,
    /// Length declared by the page, used only for ranking.
    pub declared_len: Option<usize>,
}

impl JsonBlock {
    pub fn new(text: impl Into<String>, declared_len: Option<usize>) -> Self {
        Self {
            text: text.into(),
            declared_len,
        }
    }
}

/// Collect the data-carrying JSON script blocks of a post page.
pub fn embedded_json_blocks(html: &str) -> Vec<JsonBlock> {
    let document = Html::parse_document(html);

    document
        .select(&JSON_SCRIPT)
        .map(|script| JsonBlock {
            text: script.text().collect(),
            declared_len: script
                .value()
                .attr("data-content-len")
                .and_then(|len| len.trim().parse().ok()),
        })
        .collect()
}

/// Choose and parse the block that describes the post.
///
/// Candidates must contain `options.blob_marker`. They are tried by declared
/// length, longest first (undeclared last); the first one that parses into a
/// non-empty tree wins.
pub fn select_post_blob(blocks: &[JsonBlock], options: &PostOptions) -> Result<JsonNode> {
    let mut ranked: Vec<&JsonBlock> = blocks
        .iter()
        .filter(|b| b.text.contains(options.blob_marker.as_str()))
        .collect();
    ranked.sort_by_key(|b| Reverse(b.declared_len));

    for block in ranked {
        match JsonNode::parse(&block.text) {
            Ok(node) if !node.is_empty() => return Ok(node),
            Ok(_) => tracing::debug!("Skipping empty post blob"),
            Err(e) => tracing::warn!("Skipping unparseable post blob: {}", e),
        }
    }

    Err(ExtractionError::PostDataMissing)
}

/// A way of locating the post root inside a post blob.
type RootStrategy = fn(&JsonNode) -> Option<&JsonNode>;

/// Tried in order; the same post is wrapped differently on timelines and in groups.
const ROOT_STRATEGIES: [(&str, RootStrategy); 2] =
    [("normal", normal_post_root), ("group", group_post_root)];

fn normal_post_root(post: &JsonNode) -> Option<&JsonNode> {
    let data = post.first("data")?;
    if data.contains_key(FEEDBACK_RENDERER) {
        Some(data)
    } else {
        data.path(&["node", "comet_sections"])
    }
}

fn group_post_root(post: &JsonNode) -> Option<&JsonNode> {
    post.first("group_hoisted_feed")?.first("comet_sections")
}

/// Locate the post's root content node.
pub fn resolve_root(post: &JsonNode) -> Result<&JsonNode> {
    ROOT_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            let root = strategy(post).filter(|r| !r.is_empty())?;
            tracing::debug!("Post root resolved via {} strategy", name);
            Some(root)
        })
        .ok_or(ExtractionError::PostRootUnresolvable)
}

/// Read likes, comments and shares. All three are required.
pub fn read_counters(root: &JsonNode) -> Result<Engagement> {
    let feedback = root
        .first(FEEDBACK_RENDERER)
        .ok_or(ExtractionError::CountersMissing(FEEDBACK_RENDERER))?
        .get("feedback")
        .ok_or(ExtractionError::CountersMissing("feedback"))?;

    Ok(Engagement {
        likes: counter(feedback, &["i18n_reaction_count"])?,
        comments: counter(
            feedback,
            &["comment_rendering_instance", "comments", "total_count"],
        )?,
        shares: counter(feedback, &["i18n_share_count"])?,
    })
}

fn counter(feedback: &JsonNode, path: &[&'static str]) -> Result<String> {
    feedback
        .path(path)
        .and_then(JsonNode::as_scalar)
        .map(ToString::to_string)
        .ok_or_else(|| {
            ExtractionError::CountersMissing(path.last().copied().unwrap_or_default())
        })
}

/// Image URLs of the post, from the first attachment that has any.
///
/// Photo-less posts are valid and yield an empty list.
pub fn read_images(root: &JsonNode) -> Vec<String> {
    for attachment in root.all("attachment") {
        let Some(entries) = attachment.as_map() else {
            continue;
        };

        let images = if entries.iter().any(|(k, _)| k.ends_with("subattachments")) {
            subattachment_images(entries)
        } else if attachment.contains_key("media") && !is_sticker(attachment) {
            uris(attachment, "photo_image")
        } else {
            Vec::new()
        };

        if !images.is_empty() {
            return absolute_unique(images);
        }
    }

    root.all(SINGLE_PHOTO_RENDERER)
        .into_iter()
        .find_map(|r| r.path(&["image", "uri"]).and_then(JsonNode::as_str))
        .map(|uri| absolute_unique(vec![uri.to_string()]))
        .unwrap_or_default()
}

/// Albums: the largest `*subattachments` collection whose items carry a
/// displayable image.
fn subattachment_images(entries: &[(String, JsonNode)]) -> Vec<String> {
    let collections: Vec<&JsonNode> = entries
        .iter()
        .filter(|(k, v)| k.ends_with("subattachments") && v.contains_key("nodes"))
        .map(|(_, v)| v)
        .collect();

    let size = |c: &JsonNode| {
        c.get("nodes")
            .and_then(JsonNode::as_seq)
            .map_or(0, <[JsonNode]>::len)
    };

    let Some(largest) = collections.iter().map(|c| size(*c)).max() else {
        return Vec::new();
    };

    collections
        .into_iter()
        .filter(|c| size(*c) == largest)
        .find(|c| !c.all("viewer_image").is_empty())
        .map(|c| uris(c, "viewer_image"))
        .unwrap_or_default()
}

fn is_sticker(attachment: &JsonNode) -> bool {
    attachment
        .nodes()
        .any(|n| n.get("__typename").and_then(JsonNode::as_str) == Some("Sticker"))
}

fn uris(node: &JsonNode, key: &str) -> Vec<String> {
    node.all(key)
        .into_iter()
        .filter_map(|img| img.get("uri").and_then(JsonNode::as_str))
        .map(str::to_string)
        .collect()
}

fn absolute_unique(links: Vec<String>) -> Vec<String> {
    let Ok(base) = Url::parse(WWWFB) else {
        return links;
    };

    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter_map(|link| base.join(&link).ok())
        .map(String::from)
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

fn missing(step: &'static str, field: &'static str) -> ExtractionError {
    ExtractionError::FieldMissing { step, field }
}

/// Extract a post from its parsed blob.
pub fn extract(post: &JsonNode) -> Result<ExtractedPost> {
    let root = resolve_root(post)?;
    let counters = read_counters(root)?;

    let created_at = root
        .path(&["context_layout", "story", "comet_sections", "metadata"])
        .and_then(|metadata| metadata.first("creation_time"))
        .and_then(JsonNode::as_i64);

    let story = root
        .path(&["content", "story"])
        .ok_or_else(|| missing("story", "content.story"))?;

    let author_name = story
        .get("actors")
        .and_then(|actors| actors.at(0))
        .and_then(|actor| actor.get("name"))
        .and_then(JsonNode::as_str)
        .ok_or_else(|| missing("author", "actors[0].name"))?;

    let text = story
        .get("message")
        .and_then(|message| message.get("text"))
        .and_then(JsonNode::as_str)
        .unwrap_or_default();

    let canonical_url = story
        .get("wwwURL")
        .and_then(JsonNode::as_str)
        .ok_or_else(|| missing("canonical url", "wwwURL"))?;

    Ok(ExtractedPost {
        author_name: author_name.to_string(),
        text: text.to_string(),
        image_links: read_images(story),
        canonical_url: canonical_url.to_string(),
        created_at,
        like_count: counters.likes,
        comment_count: counters.comments,
        share_count: counters.shares,
    })
}

/// Extract a post straight from a fetched page.
pub fn extract_from_html(html: &str, options: &PostOptions) -> Result<ExtractedPost> {
    let blocks = embedded_json_blocks(html);
    tracing::debug!("Found {} embedded JSON blocks", blocks.len());
    let post = select_post_blob(&blocks, options)?;
    extract(&post)
}

/// Format a post as markdown.
pub fn format_post_markdown(post: &ExtractedPost) -> String {
    let mut md = String::new();

    md.push_str("## ");
    md.push_str(&post.author_name);
    md.push_str("\n\n");

    if !post.text.is_empty() {
        md.push_str(&post.text);
        md.push_str("\n\n");
    }

    let metrics = format_engagement(&post.engagement());
    if !metrics.is_empty() {
        md.push_str(&metrics);
        md.push_str("\n\n");
    }

    if let Some(published) = post.published() {
        md.push_str(&published.format("%Y-%m-%d %H:%M UTC").to_string());
        md.push_str("\n\n");
    }

    for (i, link) in post.image_links.iter().enumerate() {
        md.push_str(&format!("![Photo {}]({link})\n", i + 1));
    }
    if !post.image_links.is_empty() {
        md.push('\n');
    }

    md.push_str("[View on Facebook](");
    md.push_str(&post.canonical_url);
    md.push_str(")\n");

    md
}

/// Counters joined on one line; `null` counters are left out.
fn format_engagement(engagement: &Engagement) -> String {
    [
        ("❤️", &engagement.likes),
        ("💬", &engagement.comments),
        ("🔁", &engagement.shares),
    ]
    .iter()
    .filter(|(_, value)| value.as_str() != "null")
    .map(|(icon, value)| format!("{icon} {value}"))
    .collect::<Vec<_>>()
    .join(" • ")
}

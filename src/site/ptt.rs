//! PTT forum article sanitizing.
//!
//! A forum article page mixes the post body with metadata rows (author,
//! board, title, time), a signature/footer block introduced by a `--` line,
//! nested push (comment) threads and system notice lines. [`sanitize`] runs a
//! fixed pipeline over the parsed page:
//!
//! 1. [`isolate_body`]: the `#main-content` region
//! 2. [`ArticleBody::strip_metadata`]: capture the title, drop metadata rows
//! 3. [`ArticleBody::strip_trailing_region`]: cut the signature/footer block
//! 4. [`ArticleBody::strip_comment_region`]: drop pushes, polling, notices
//! 5. [`ArticleBody::extract_images`]: absolute image URLs
//! 6. [`ArticleBody::render`]: markdown and normalized plain text
//!
//! Image hyperlinks stay in the rendered body; their targets are also
//! reported in `image_links`.

use std::collections::HashSet;

use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use super::ExtractedArticle;
use crate::config::ForumOptions;
use crate::content::{html_to_markdown, normalize_plain_text};
use crate::error::{ExtractionError, Result};

static MAIN_CONTENT: Lazy<Selector> = Lazy::new(|| selector("#main-content"));
static METALINE: Lazy<Selector> =
    Lazy::new(|| selector(".article-metaline, .article-metaline-right"));
static META_TAG: Lazy<Selector> = Lazy::new(|| selector(".article-meta-tag"));
static META_VALUE: Lazy<Selector> = Lazy::new(|| selector(".article-meta-value"));
static COMMENT_REGION: Lazy<Selector> =
    Lazy::new(|| selector("div.push, #article-polling, span.f2"));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img[src]"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| selector(r#"meta[name="description"]"#));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// The article region of a parsed page, mutated in place by each stage.
///
/// The rest of the page (`<title>`, meta tags) stays available for fallbacks.
pub struct ArticleBody {
    document: Html,
    root: NodeId,
}

/// Where the signature/footer block starts.
struct Divider {
    node: NodeId,
    /// Byte offset of the divider line when it sits inside a larger text run.
    cut: Option<usize>,
}

/// Locate the main content region.
pub fn isolate_body(html: &str) -> Result<ArticleBody> {
    let document = Html::parse_document(html);
    let root = document
        .select(&MAIN_CONTENT)
        .next()
        .map(|el| el.id())
        .ok_or(ExtractionError::ContentRegionMissing)?;

    Ok(ArticleBody { document, root })
}

impl ArticleBody {
    fn root(&self) -> Option<ElementRef<'_>> {
        self.document.tree.get(self.root).and_then(ElementRef::wrap)
    }

    fn select_ids(&self, selector: &Selector) -> Vec<NodeId> {
        self.root()
            .map(|root| root.select(selector).map(|el| el.id()).collect())
            .unwrap_or_default()
    }

    fn detach(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            if id == self.root {
                continue;
            }
            if let Some(mut node) = self.document.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    /// Text content of the region in document order.
    ///
    /// `<br>` and block element boundaries become line breaks, so paragraphs
    /// and lines in separate elements stay on separate lines.
    pub fn text(&self) -> String {
        let Some(root) = self.document.tree.get(self.root) else {
            return String::new();
        };

        let mut out = String::new();
        for edge in root.traverse() {
            match edge {
                Edge::Open(node) if node.id() != self.root => match node.value() {
                    Node::Text(text) => out.push_str(text),
                    Node::Element(el) if el.name() == "br" => out.push('\n'),
                    Node::Element(el) if is_block(el.name()) => line_break(&mut out),
                    _ => {}
                },
                Edge::Close(node) if node.id() != self.root => {
                    if let Node::Element(el) = node.value() {
                        if is_block(el.name()) {
                            line_break(&mut out);
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Markup of the region without the region element itself.
    pub fn inner_html(&self) -> String {
        self.root().map(|root| root.inner_html()).unwrap_or_default()
    }

    /// Capture the title from the metadata rows, then remove every row.
    ///
    /// When several rows carry the title label the last one wins.
    pub fn strip_metadata(&mut self, options: &ForumOptions) -> Option<String> {
        let mut title = None;
        let mut rows = Vec::new();

        if let Some(root) = self.root() {
            for row in root.select(&METALINE) {
                let tag = row.select(&META_TAG).next();
                let value = row.select(&META_VALUE).next();
                if let (Some(tag), Some(value)) = (tag, value) {
                    if element_text(tag).trim() == options.title_label {
                        title = Some(element_text(value).trim().to_string());
                    }
                }
                rows.push(row.id());
            }
        }

        tracing::debug!("Removing {} metadata rows", rows.len());
        self.detach(rows);
        title.filter(|t| !t.is_empty())
    }

    /// Remove the signature/footer block and everything after it.
    ///
    /// The block starts at a line consisting solely of the divider whose next
    /// non-empty content contains the footer marker. A bare divider is kept.
    /// Returns whether anything was removed.
    pub fn strip_trailing_region(&mut self, options: &ForumOptions) -> bool {
        let Some(divider) = self.find_divider(options) else {
            return false;
        };

        let mut following = Vec::new();
        let mut current = self.document.tree.get(divider.node);
        while let Some(node) = current {
            if node.id() == self.root {
                break;
            }
            following.extend(node.next_siblings().map(|n| n.id()));
            current = node.parent();
        }
        tracing::debug!("Removing {} nodes after footer divider", following.len());
        self.detach(following);

        match divider.cut {
            Some(offset) => self.truncate_text(divider.node, offset),
            None => self.detach([divider.node]),
        }
        true
    }

    /// Last divider in document order that is followed by the footer marker.
    fn find_divider(&self, options: &ForumOptions) -> Option<Divider> {
        let root = self.document.tree.get(self.root)?;
        let marker = options.footer_marker.as_str();
        let divider = options.divider.as_str();
        if divider.is_empty() {
            return None;
        }
        let mut found = None;

        for node in root.descendants().skip(1) {
            match node.value() {
                Node::Text(text) => {
                    let text: &str = text;
                    let mut offset = 0;
                    for line in text.split_inclusive('\n') {
                        let start = offset;
                        offset += line.len();
                        if line.trim() != divider {
                            continue;
                        }
                        if footer_follows(&text[offset..], node, marker) {
                            found = Some(Divider {
                                node: node.id(),
                                cut: Some(start),
                            });
                        }
                    }
                }
                Node::Element(_) => {
                    if node_text(node).trim() == divider && footer_follows("", node, marker) {
                        found = Some(Divider {
                            node: node.id(),
                            cut: None,
                        });
                    }
                }
                _ => {}
            }
        }

        found
    }

    /// Keep only the first `offset` bytes of a text node, or drop it when
    /// nothing but whitespace would remain.
    fn truncate_text(&mut self, id: NodeId, offset: usize) {
        let Some(mut node) = self.document.tree.get_mut(id) else {
            return;
        };

        let mut emptied = false;
        if let Node::Text(text) = node.value() {
            let kept = text[..offset].to_string();
            emptied = kept.trim().is_empty();
            text.text.clear();
            text.text.push_slice(&kept);
        }

        if emptied {
            node.detach();
        }
    }

    /// Remove push/comment threads, the polling control and system notice lines.
    pub fn strip_comment_region(&mut self) {
        let ids = self.select_ids(&COMMENT_REGION);
        tracing::debug!("Removing {} comment-region elements", ids.len());
        self.detach(ids);
    }

    /// Absolute image URLs: every `<img src>`, then every hyperlink whose
    /// target has an image extension. De-duplicated by first occurrence.
    pub fn extract_images(&self, base_url: &str, options: &ForumOptions) -> Vec<String> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let base = Url::parse(base_url).ok();
        let resolve = |href: &str| {
            let href = href.trim();
            if href.is_empty() {
                return None;
            }
            match &base {
                Some(base) => base.join(href).ok(),
                None => Url::parse(href).ok(),
            }
        };

        let sources = root
            .select(&IMG)
            .filter_map(|img| img.value().attr("src").and_then(&resolve));
        let linked = root
            .select(&LINK)
            .filter_map(|a| a.value().attr("href").and_then(&resolve))
            .filter(|url| has_image_extension(url, &options.image_extensions));

        let mut seen = HashSet::new();
        sources
            .chain(linked)
            .map(String::from)
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Markdown and plain text renderings of what is left of the region.
    pub fn render(&self, options: &ForumOptions) -> (Option<String>, Option<String>) {
        let markdown = html_to_markdown(&self.inner_html());
        let plain = normalize_plain_text(&self.text(), &options.divider);
        (markdown, plain)
    }

    /// The page's `<title>`.
    pub fn document_title(&self) -> Option<String> {
        self.document
            .select(&TITLE)
            .next()
            .map(|el| element_text(el).trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// The page's `<meta name="description">` content.
    pub fn meta_description(&self) -> Option<String> {
        self.document
            .select(&META_DESCRIPTION)
            .find_map(|meta| meta.value().attr("content"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// Start a new line unless already at the start of one.
fn line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn node_text(node: NodeRef<'_, Node>) -> String {
    match node.value() {
        Node::Text(text) => text.to_string(),
        Node::Element(_) => ElementRef::wrap(node).map(element_text).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Whether the first non-empty content after a divider contains `marker`.
///
/// `rest` is what follows the divider inside its own text run; when it is
/// blank the node's following siblings are inspected.
fn footer_follows(rest: &str, node: NodeRef<'_, Node>, marker: &str) -> bool {
    if !rest.trim().is_empty() {
        return rest.contains(marker);
    }

    for sibling in node.next_siblings() {
        let text = node_text(sibling);
        if text.contains(marker) {
            return true;
        }
        if !text.trim().is_empty() {
            return false;
        }
    }
    false
}

fn has_image_extension(url: &Url, extensions: &[String]) -> bool {
    url.path()
        .rsplit_once('.')
        .is_some_and(|(_, ext)| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Run the full pipeline over a fetched article page.
///
/// Falls back to the page `<title>` for the title and to the meta
/// description when the body yields neither text nor images.
pub fn sanitize(html: &str, url: &str, options: &ForumOptions) -> Result<ExtractedArticle> {
    let mut body = isolate_body(html)?;

    let mut title = body.strip_metadata(options);
    if body.strip_trailing_region(options) {
        tracing::debug!("Signature/footer block removed");
    }
    body.strip_comment_region();

    let image_links = body.extract_images(url, options);
    let (markdown_body, mut plain_text_body) = body.render(options);

    if title.is_none() {
        title = body.document_title();
    }

    if plain_text_body.is_none() && image_links.is_empty() {
        tracing::debug!("Empty body, falling back to meta description");
        plain_text_body = body.meta_description();
    }

    if title.is_none() && plain_text_body.is_none() && image_links.is_empty() {
        return Err(ExtractionError::NoExtractableContent);
    }

    Ok(ExtractedArticle {
        title,
        markdown_body,
        plain_text_body,
        image_links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.ptt.cc/bbs/Gossiping/M.1700000000.A.123.html";

    fn page(main: &str) -> String {
        format!(
            r#"<html><head><title>Page Title</title>
            <meta name="description" content="  Meta summary  "></head>
            <body><div id="topbar">nav</div><div id="main-content">{main}</div></body></html>"#
        )
    }

    fn metaline(tag: &str, value: &str) -> String {
        format!(
            r#"<div class="article-metaline"><span class="article-meta-tag">{tag}</span><span class="article-meta-value">{value}</span></div>"#
        )
    }

    fn opts() -> ForumOptions {
        ForumOptions::default()
    }

    #[test]
    fn missing_region_is_an_error() {
        let err = isolate_body("<html><body><p>nothing</p></body></html>").err().unwrap();
        assert_eq!(err, ExtractionError::ContentRegionMissing);
    }

    #[test]
    fn metadata_title_is_captured_and_rows_removed() {
        let html = page(&format!(
            "{}{}{}Body",
            metaline("作者", "someone (nick)"),
            metaline("標題", " [問卦] Test Title "),
            metaline("時間", "Tue Nov 14 22:13:20 2023"),
        ));
        let mut body = isolate_body(&html).unwrap();
        let title = body.strip_metadata(&opts());
        assert_eq!(title.as_deref(), Some("[問卦] Test Title"));
        assert_eq!(body.text(), "Body");
    }

    #[test]
    fn right_aligned_metadata_rows_are_removed() {
        let html = page(
            r#"<div class="article-metaline-right"><span class="article-meta-tag">看板</span><span class="article-meta-value">Gossiping</span></div>Text"#,
        );
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_metadata(&opts()).is_none());
        assert_eq!(body.text(), "Text");
    }

    #[test]
    fn footer_after_divider_is_removed() {
        let html = page(
            "Line1\n\nLine2\n--\n<span class=\"f2\">※ 發信站: 批踢踢實業坊(ptt.cc), 來自: 1.2.3.4</span>\n<span class=\"f2\">※ 文章網址: x</span>\n<div class=\"push\">推 comment</div>",
        );
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "Line1\n\nLine2\n");
    }

    #[test]
    fn divider_in_own_text_node() {
        let html = page("Body<br>--<br><span>※ 發信站: ptt</span>");
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "Body\n");
    }

    #[test]
    fn divider_element_removes_following_content() {
        let html = page("<p>Body</p><p>--</p><p>※ 發信站: ptt</p><p>tail</p>");
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "Body\n");
    }

    #[test]
    fn wrapped_divider_with_outer_footer() {
        let html = page("<div>Keep</div><div><p>--</p></div>\n<p>※ 發信站: ptt</p><div>after</div>");
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "Keep\n");
    }

    #[test]
    fn wrapped_divider_with_inner_footer() {
        let html = page("<div>Keep</div><div><p>--</p><p>※ 發信站: ptt</p></div><div>after</div>");
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "Keep\n");
        assert!(!body.inner_html().contains("after"));
    }

    #[test]
    fn removal_climbs_out_of_nested_divider() {
        let html = page("<div>Body\n--\n<span>※ 發信站</span>sig</div><p>after</p>");
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "Body\n");
    }

    #[test]
    fn bare_divider_is_kept() {
        let html = page("--");
        let mut body = isolate_body(&html).unwrap();
        assert!(!body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "--");
    }

    #[test]
    fn divider_without_footer_marker_is_kept() {
        let html = page("Body\n--\nmy own signature\n");
        let mut body = isolate_body(&html).unwrap();
        assert!(!body.strip_trailing_region(&opts()));
        assert!(body.text().contains("my own signature"));
    }

    #[test]
    fn only_the_last_marked_divider_cuts() {
        let html = page("Quote\n--\n※ 發信站 quoted\nReply body\n--\n<span>※ 發信站: ptt</span>");
        let mut body = isolate_body(&html).unwrap();
        assert!(body.strip_trailing_region(&opts()));
        assert_eq!(body.text(), "Quote\n--\n※ 發信站 quoted\nReply body\n");
    }

    #[test]
    fn comment_region_is_removed_anywhere() {
        let html = page(
            r#"Body<div class="push"><span>推</span>nice</div><div><div class="push">nested</div></div><div id="article-polling">poll</div><span class="f2">※ 編輯: x</span>End"#,
        );
        let mut body = isolate_body(&html).unwrap();
        body.strip_comment_region();
        assert_eq!(body.text(), "Body\nEnd");
    }

    #[test]
    fn images_from_tags_and_links_are_deduplicated() {
        let html = page(
            r#"<img src="/img/a.jpg"><a href="https://www.ptt.cc/img/a.jpg">a</a>
            <a href="https://i.imgur.com/b.PNG?x=1">b</a><a href="https://example.com/page">no</a>
            <a href="  ">blank</a><img src="https://i.imgur.com/b.PNG?x=1">"#,
        );
        let body = isolate_body(&html).unwrap();
        assert_eq!(
            body.extract_images(URL, &opts()),
            vec!["https://www.ptt.cc/img/a.jpg", "https://i.imgur.com/b.PNG?x=1"]
        );
    }

    #[test]
    fn image_extension_ignores_query_and_case() {
        let exts = opts().image_extensions;
        let url = |s: &str| Url::parse(s).unwrap();
        assert!(has_image_extension(&url("https://x/a.JPEG?size=l"), &exts));
        assert!(has_image_extension(&url("https://x/a.webp#frag"), &exts));
        assert!(!has_image_extension(&url("https://x/a.html?f=b.jpg"), &exts));
        assert!(!has_image_extension(&url("https://x/jpg"), &exts));
    }

    #[test]
    fn render_produces_both_forms() {
        let html = page("<h2>Heading</h2>\nLine1\n\n\n\nLine2   \n--\n");
        let body = isolate_body(&html).unwrap();
        let (markdown, plain) = body.render(&opts());
        assert!(markdown.unwrap().starts_with("## Heading\n"));
        assert_eq!(plain.as_deref(), Some("Heading\n\nLine1\n\nLine2"));
    }

    #[test]
    fn block_boundaries_separate_lines() {
        let render = |main: &str| isolate_body(&page(main)).unwrap().render(&opts());

        let (markdown, plain) = render("<p>Line1</p><p>Line2</p>");
        assert_eq!(plain.as_deref(), Some("Line1\nLine2"));
        assert_eq!(markdown.as_deref(), Some("Line1\n\nLine2"));

        let (_, plain) = render("Line1<br>Line2<div>Line3</div>");
        assert_eq!(plain.as_deref(), Some("Line1\nLine2\nLine3"));

        let (_, plain) = render("A<br><br>B");
        assert_eq!(plain.as_deref(), Some("A\n\nB"));

        let (_, plain) = render("<span class=\"hl\">in</span>line <a href=\"/x\">link</a> text");
        assert_eq!(plain.as_deref(), Some("inline link text"));
    }

    #[test]
    fn headings_render_with_hash_markers() {
        let render = |main: &str| isolate_body(&page(main)).unwrap().render(&opts());

        for (html, md, plain) in [
            ("<h1>A</h1>", "# A", "A"),
            ("<h2>B</h2>", "## B", "B"),
            ("<h3>C</h3>", "### C", "C"),
        ] {
            let (markdown, text) = render(html);
            assert_eq!(markdown.as_deref(), Some(md), "{html}");
            assert_eq!(text.as_deref(), Some(plain), "{html}");
        }
    }

    #[test]
    fn render_of_empty_region_is_none() {
        let body = isolate_body(&page("  \n ")).unwrap();
        assert_eq!(body.render(&opts()), (None, None));
    }

    #[test]
    fn sanitize_scenario() {
        let html = page(&format!(
            "{}Line1\n\nLine2\n--\n<span class=\"f2\">※ 發信站: 批踢踢實業坊(ptt.cc)</span>\n",
            metaline("標題", "Test Title")
        ));
        let article = sanitize(&html, URL, &opts()).unwrap();
        assert_eq!(article.title.as_deref(), Some("Test Title"));
        assert_eq!(article.plain_text_body.as_deref(), Some("Line1\n\nLine2"));
        assert!(article.image_links.is_empty());
        assert!(!article.markdown_body.unwrap().contains("發信站"));
    }

    #[test]
    fn title_falls_back_to_document_title() {
        let article = sanitize(&page("Body"), URL, &opts()).unwrap();
        assert_eq!(article.title.as_deref(), Some("Page Title"));
    }

    #[test]
    fn empty_body_falls_back_to_meta_description() {
        let article = sanitize(&page(&metaline("作者", "x")), URL, &opts()).unwrap();
        assert_eq!(article.plain_text_body.as_deref(), Some("Meta summary"));
    }

    #[test]
    fn images_suppress_meta_description_fallback() {
        let article = sanitize(&page(r#"<img src="a.png">"#), URL, &opts()).unwrap();
        assert!(article.plain_text_body.is_none());
        assert_eq!(article.image_links, vec!["https://www.ptt.cc/bbs/Gossiping/a.png"]);
    }

    #[test]
    fn nothing_extractable_is_an_error() {
        let html = r#"<html><body><div id="main-content"> </div></body></html>"#;
        let err = sanitize(html, URL, &opts()).unwrap_err();
        assert_eq!(err.reason(), "no-extractable-content");
    }

    #[test]
    fn localized_labels_come_from_options() {
        let options = ForumOptions {
            title_label: "Title".to_string(),
            footer_marker: "Sent from".to_string(),
            ..ForumOptions::default()
        };
        let html = page(&format!(
            "{}Hello\n--\nSent from my phone\n",
            metaline("Title", "English")
        ));
        let article = sanitize(&html, URL, &options).unwrap();
        assert_eq!(article.title.as_deref(), Some("English"));
        assert_eq!(article.plain_text_body.as_deref(), Some("Hello"));
    }
}

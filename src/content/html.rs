//! HTML to markdown and plain text rendering.
//!
//! Both renderings return `None` instead of an empty string so callers can
//! fall back to other sources.

/// Convert an HTML fragment to markdown.
///
/// Headings always use `#` markers. Leading and trailing whitespace is
/// trimmed; an empty result is `None`.
pub fn html_to_markdown(html: &str) -> Option<String> {
    let md = atx_headings(&html2md::parse_html(html));
    let md = md.trim();
    (!md.is_empty()).then(|| md.to_string())
}

/// Rewrite headings in `#` style.
///
/// `html2md` underlines `<h1>`/`<h2>` (setext) and closes deeper levels with
/// a trailing `###` run.
fn atx_headings(md: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut lines = md.lines().peekable();

    while let Some(line) = lines.next() {
        let level = lines.peek().and_then(|next| setext_level(next));
        match level {
            Some(level) if !line.trim().is_empty() && setext_level(line).is_none() => {
                out.push(format!("{} {}", "#".repeat(level), line.trim()));
                lines.next();
            }
            _ => out.push(close_atx(line)),
        }
    }

    out.join("\n")
}

/// Heading level of a setext underline (`===` is 1, `---` is 2).
fn setext_level(line: &str) -> Option<usize> {
    let line = line.trim();
    if line.len() < 3 {
        return None;
    }
    if line.chars().all(|c| c == '=') {
        Some(1)
    } else if line.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

/// Drop the optional closing `#` run of an ATX heading.
fn close_atx(line: &str) -> String {
    let hashes = line.len() - line.trim_start_matches('#').len();
    let rest = &line[hashes..];
    if hashes == 0 || hashes > 6 || !rest.starts_with(' ') {
        return line.to_string();
    }

    let text = rest.trim();
    let open = text.trim_end_matches('#');
    let text = if open.len() < text.len() && open.ends_with(' ') {
        open.trim_end()
    } else {
        text
    };
    format!("{} {text}", &line[..hashes])
}

/// Normalize extracted text content line by line.
///
/// - trailing whitespace is trimmed from every line
/// - lines consisting only of `divider` are dropped
/// - runs of blank lines collapse to one blank line
/// - leading and trailing blank lines are removed
///
/// Returns `None` when nothing but whitespace remains.
pub fn normalize_plain_text(raw: &str, divider: &str) -> Option<String> {
    let mut lines: Vec<&str> = Vec::new();
    let mut last_blank = false;

    for line in raw.lines() {
        let line = line.trim_end();
        let stripped = line.trim_start();

        if !divider.is_empty() && stripped == divider {
            continue;
        }

        if stripped.is_empty() {
            if !last_blank && !lines.is_empty() {
                lines.push("");
            }
            last_blank = true;
            continue;
        }

        lines.push(line);
        last_blank = false;
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }

    let text = lines.join("\n");
    (!text.is_empty()).then_some(text)
}

//! HTML newsletter to plain text.

use scraper::{Html, Selector};
use tracing::debug;

use leadscout_shared::{LeadScoutError, Result};

use crate::cleanup;

/// Tags whose content never carries newsletter text.
const SKIP_TAGS: &[&str] = &[
    "head", "script", "style", "nav", "iframe", "noscript", "svg", "img", "form",
];

/// Plain text and `<title>` of an HTML newsletter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlText {
    pub title: Option<String>,
    pub text: String,
}

/// Convert an HTML newsletter to plain text.
///
/// Picks the main content container when one exists, converts it with `htmd`,
/// then runs the cleanup passes.
pub fn html_to_text(html: &str) -> Result<HtmlText> {
    let doc = Html::parse_document(html);
    let title = extract_title(&doc);
    let content = extract_content_html(&doc).unwrap_or_else(|| html.to_string());

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let markdown = converter
        .convert(&content)
        .map_err(|e| LeadScoutError::Conversion(format!("htmd conversion failed: {e}")))?;

    let text = cleanup::run_pipeline(&markdown);
    debug!(html_len = html.len(), text_len = text.len(), "html converted");

    Ok(HtmlText { title, text })
}

/// Cheap sniff for HTML content in files without an HTML extension.
pub fn looks_like_html(content: &str) -> bool {
    let head: String = content
        .trim_start()
        .chars()
        .take(512)
        .collect::<String>()
        .to_lowercase();
    head.starts_with("<!doctype html") || head.contains("<html") || head.contains("<body")
}

fn extract_title(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// Inner HTML of the first content container, in priority order.
fn extract_content_html(doc: &Html) -> Option<String> {
    let selectors = ["article", "main", "[role=\"main\"]", ".content", "body"];

    selectors.iter().find_map(|sel_str| {
        let selector = Selector::parse(sel_str).ok()?;
        doc.select(&selector).next().map(|el| el.inner_html())
    })
}

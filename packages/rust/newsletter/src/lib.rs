//! Newsletter acquisition: files and inbox directories to plain text.
//!
//! A newsletter is identified by the SHA-256 of its normalized text, so the
//! same issue saved twice (or forwarded under another file name) is only
//! processed once by the run history.

mod cleanup;
mod html;

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use leadscout_shared::{LeadScoutError, Result};

pub use html::{HtmlText, html_to_text, looks_like_html};

/// File extensions picked up from an inbox directory.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "eml", "html", "htm"];

/// Lines scanned for a `Subject:` header in plain-text newsletters.
const SUBJECT_SCAN_LINES: usize = 20;

// ---------------------------------------------------------------------------
// Newsletter
// ---------------------------------------------------------------------------

/// One newsletter issue, ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Newsletter {
    /// Hex SHA-256 of `text`.
    pub id: String,
    /// File path, `stdin`, or another caller-chosen label.
    pub source: String,
    pub subject: String,
    pub text: String,
}

impl Newsletter {
    /// Build a newsletter from already-plain text.
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        let text = text.into();
        let subject = find_subject_line(&text).unwrap_or_else(|| source.clone());
        Self {
            id: content_id(&text),
            source,
            subject,
            text,
        }
    }

    /// Build a newsletter from raw content, converting HTML when detected.
    pub fn from_raw(source: impl Into<String>, raw: &str, is_html: bool) -> Result<Self> {
        let source = source.into();
        if is_html || looks_like_html(raw) {
            let HtmlText { title, text } = html_to_text(raw)?;
            let subject = title.unwrap_or_else(|| source.clone());
            return Ok(Self {
                id: content_id(&text),
                source,
                subject,
                text,
            });
        }
        Ok(Self::from_text(source, raw.trim().to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Hex SHA-256 of newsletter text.
pub fn content_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load one newsletter file (`.txt`, `.md`, `.eml`, `.html`, `.htm`).
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_file(path: &Path) -> Result<Newsletter> {
    let raw = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;
    let source = path.display().to_string();

    let extension = extension_of(path);
    let newsletter = match extension.as_deref() {
        Some("html" | "htm") => Newsletter::from_raw(source, &raw, true)?,
        Some("eml") => from_email(source, &raw)?,
        _ => Newsletter::from_raw(source, &raw, false)?,
    };

    debug!(id = %newsletter.id, subject = %newsletter.subject, chars = newsletter.text.len(), "newsletter loaded");
    Ok(newsletter)
}

/// Load every supported file in `dir`, sorted by file name.
///
/// Unreadable files are skipped with a warning so one bad file does not block
/// the rest of the inbox.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_dir(dir: &Path) -> Result<Vec<Newsletter>> {
    let entries = std::fs::read_dir(dir).map_err(|e| LeadScoutError::io(dir, e))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    paths.sort();

    let mut newsletters = Vec::with_capacity(paths.len());
    for path in &paths {
        match load_file(path) {
            Ok(n) if n.is_empty() => debug!(path = %path.display(), "skipping empty newsletter"),
            Ok(n) => newsletters.push(n),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable newsletter"),
        }
    }

    info!(found = paths.len(), loaded = newsletters.len(), "inbox scanned");
    Ok(newsletters)
}

/// Whether `path` has an extension the loader understands.
pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Email (.eml)
// ---------------------------------------------------------------------------

/// Split a saved message into headers and body; subject comes from the headers.
fn from_email(source: String, raw: &str) -> Result<Newsletter> {
    let normalized = raw.replace("\r\n", "\n");
    let (headers, body) = normalized
        .split_once("\n\n")
        .unwrap_or(("", normalized.as_str()));

    let subject = header_value(headers, "subject");
    let is_html = header_value(headers, "content-type")
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html"));

    let mut newsletter = Newsletter::from_raw(source, body, is_html)?;
    if let Some(subject) = subject {
        newsletter.subject = subject;
    }
    Ok(newsletter)
}

/// Value of an RFC 822 header, with folded continuation lines joined.
fn header_value(headers: &str, name: &str) -> Option<String> {
    let mut value: Option<String> = None;
    for line in headers.lines() {
        if let Some(current) = value.as_mut() {
            if line.starts_with([' ', '\t']) {
                current.push(' ');
                current.push_str(line.trim());
                continue;
            }
            break;
        }
        if let Some((key, rest)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                value = Some(rest.trim().to_string());
            }
        }
    }
    value.filter(|v| !v.is_empty())
}

/// A `Subject:` line near the top of a plain-text newsletter.
fn find_subject_line(text: &str) -> Option<String> {
    text.lines()
        .take(SUBJECT_SCAN_LINES)
        .find_map(|line| {
            let (key, rest) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("subject")
                .then(|| rest.trim().to_string())
        })
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_inbox() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("leadscout-inbox-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn plain_text_subject_line() {
        let n = Newsletter::from_text("stdin", "Subject: Funding Friday\n\nAcme raised $2M.");
        assert_eq!(n.subject, "Funding Friday");
        assert_eq!(n.source, "stdin");
        assert_eq!(n.id.len(), 64);
    }

    #[test]
    fn subject_defaults_to_source() {
        let n = Newsletter::from_text("issue-1.txt", "Acme raised $2M.");
        assert_eq!(n.subject, "issue-1.txt");
    }

    #[test]
    fn id_ignores_surrounding_whitespace() {
        assert_eq!(content_id("Acme raised $2M.\n"), content_id("  Acme raised $2M."));
        assert_ne!(content_id("Acme"), content_id("Beta"));
    }

    #[test]
    fn raw_html_is_detected() {
        let n = Newsletter::from_raw(
            "x",
            "<html><head><title>Weekly</title></head><body><p>Acme raised $2M.</p></body></html>",
            false,
        )
        .unwrap();
        assert_eq!(n.subject, "Weekly");
        assert!(n.text.contains("Acme raised $2M."));
    }

    #[test]
    fn email_headers_are_parsed() {
        let raw = "From: news@example.com\r\nSubject: Funding\r\n  roundup #7\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<p>Beta closed a <b>Series A</b>.</p>";
        let n = from_email("a.eml".into(), raw).unwrap();
        assert_eq!(n.subject, "Funding roundup #7");
        assert!(n.text.contains("Beta closed a Series A."));
        assert!(!n.text.contains("Subject"));
    }

    #[test]
    fn email_without_headers_is_plain_body() {
        let n = from_email("b.eml".into(), "Acme raised $2M.").unwrap();
        assert_eq!(n.text, "Acme raised $2M.");
    }

    #[test]
    fn load_dir_reads_supported_files_in_order() {
        let dir = temp_inbox();
        std::fs::write(dir.join("b.txt"), "Subject: Second\nBeta raised $1M.").unwrap();
        std::fs::write(dir.join("a.html"), "<title>First</title><p>Acme raised $2M.</p>").unwrap();
        std::fs::write(dir.join("notes.pdf"), "ignored").unwrap();
        std::fs::write(dir.join("empty.md"), "   \n").unwrap();

        let newsletters = load_dir(&dir).unwrap();
        let subjects: Vec<_> = newsletters.iter().map(|n| n.subject.as_str()).collect();
        assert_eq!(subjects, vec!["First", "Second"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_dir_missing_directory_is_io_error() {
        let dir = std::env::temp_dir().join("leadscout-no-such-inbox");
        let err = load_dir(&dir).unwrap_err();
        assert!(matches!(err, LeadScoutError::Io { .. }));
    }

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported(Path::new("issue.HTML")));
        assert!(is_supported(Path::new("issue.eml")));
        assert!(!is_supported(Path::new("issue.pdf")));
        assert!(!is_supported(Path::new("README")));
    }
}

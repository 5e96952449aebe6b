//! Cleanup passes that turn converted Markdown into plain newsletter text.
//!
//! Each pass is a function `&str -> String` applied in sequence. Images and
//! tracking pixels are dropped, links keep only their text, and whitespace is
//! normalized so the extraction prompt stays short.

use std::sync::LazyLock;

use regex::Regex;

/// Run every cleanup pass on converted Markdown.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = drop_images(&result);
    result = flatten_links(&result);
    result = strip_html_tags(&result);
    result = strip_emphasis(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Drop images
// ---------------------------------------------------------------------------

/// Remove `![alt](src)` images, including 1x1 tracking pixels.
fn drop_images(md: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex")
    });

    IMAGE_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Flatten links
// ---------------------------------------------------------------------------

/// Replace `[text](url)` with `text`; links without text disappear.
fn flatten_links(md: &str) -> String {
    static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex")
    });

    LINK_RE.replace_all(md, "$1").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Strip leftover HTML
// ---------------------------------------------------------------------------

/// Remove any HTML tag that survived conversion, keeping inner text.
fn strip_html_tags(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*(?:\s[^>]*)?/?>").expect("valid regex")
    });

    HTML_TAG_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Strip emphasis markers
// ---------------------------------------------------------------------------

/// Drop `**bold**` and `__bold__` markers around words.
fn strip_emphasis(md: &str) -> String {
    static STRONG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(\*\*|__)(\S(?:.*?\S)?)(\*\*|__)").expect("valid regex")
    });

    STRONG_RE.replace_all(md, "$2").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace and turn non-breaking spaces into plain spaces.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.replace('\u{a0}', " ").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 6: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single blank line.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\n{3,}").expect("valid regex")
    });

    MULTI_BLANK_RE.replace_all(md.trim_start_matches('\n'), "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 7: Ensure trailing newline
// ---------------------------------------------------------------------------

fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_are_removed() {
        let input = "Hello ![pixel](https://t.example.com/open.gif) world";
        assert_eq!(drop_images(input), "Hello  world");
    }

    #[test]
    fn links_keep_text_only() {
        let input = "Read about [Acme](https://acme.io/news) and [](https://x.io)";
        assert_eq!(flatten_links(input), "Read about Acme and ");
    }

    #[test]
    fn leftover_tags_are_stripped() {
        let input = "<table><tr><td>Acme raised $2M</td></tr></table><br/>";
        assert_eq!(strip_html_tags(input), "Acme raised $2M");
    }

    #[test]
    fn dollar_amounts_survive_tag_stripping() {
        let input = "Acme < $5M > Beta";
        assert_eq!(strip_html_tags(input), input);
    }

    #[test]
    fn emphasis_is_stripped() {
        assert_eq!(strip_emphasis("**Acme** raised __$2M__"), "Acme raised $2M");
    }

    #[test]
    fn blank_runs_collapse_to_one() {
        assert_eq!(clean_blank_lines("\n\nA\n\n\n\n\nB"), "A\n\nB");
    }

    #[test]
    fn full_pipeline_yields_plain_text() {
        let input = "# Weekly Funding\n\n\n\n**[Acme](https://acme.io)** raised $2M\u{a0}Seed   \n\n![](https://t.io/p.gif)\n";
        let result = run_pipeline(input);
        assert_eq!(result, "# Weekly Funding\n\nAcme raised $2M Seed\n");
    }
}

//! Wikitext-to-plain-text normalization.
//!
//! Each pass is a regex substitution applied in sequence. Pass order matters:
//! templates are stripped before link unwrapping so `{{…[[x]]…}}` disappears
//! whole, and bold quotes are unwrapped before italics so `'''` is not
//! half-eaten by the `''` pass.

use std::sync::LazyLock;

use regex::Regex;

/// Normalize raw wikitext into plain text the extractors can scan line by line.
pub fn normalize(text: &str) -> String {
    let result = strip_templates(text);
    let result = unwrap_wiki_links(&result);
    let result = unwrap_external_links(&result);
    let result = unwrap_bold(&result);
    unwrap_italics(&result)
}

// ---------------------------------------------------------------------------
// Pass 1: strip {…} templates
// ---------------------------------------------------------------------------

/// Remove brace-delimited templates, including multi-line ones.
fn strip_templates(text: &str) -> String {
    static TEMPLATE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").expect("valid regex"));
    TEMPLATE_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: unwrap [[target|label]] links
// ---------------------------------------------------------------------------

/// `[[target|label]]` → `label`, `[[target]]` → `target`.
fn unwrap_wiki_links(text: &str) -> String {
    static WIKI_LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\[(?:[^\]]*\|)?(.*?)]]").expect("valid regex"));
    WIKI_LINK_RE.replace_all(text, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: unwrap [url label] external links
// ---------------------------------------------------------------------------

/// `[url label]` → `label`; a bare `[url]` disappears.
fn unwrap_external_links(text: &str) -> String {
    static EXTERNAL_LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[.*?(?: (.*?))?]").expect("valid regex"));
    EXTERNAL_LINK_RE.replace_all(text, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4/5: unwrap quote markup
// ---------------------------------------------------------------------------

/// `'''bold'''` → `bold`.
fn unwrap_bold(text: &str) -> String {
    static BOLD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"'''(.*?)'''").expect("valid regex"));
    BOLD_RE.replace_all(text, "$1").into_owned()
}

/// `''italic''` → `italic`.
fn unwrap_italics(text: &str) -> String {
    static ITALIC_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"''(.*?)''").expect("valid regex"));
    ITALIC_RE.replace_all(text, "$1").into_owned()
}

use once_cell::sync::Lazy;
use regex::Regex;

/// Titles shorter than this (in characters) are markup residue, not titles.
pub const MIN_TITLE_CHARS: usize = 5;

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#?[A-Za-z0-9]+;").expect("valid entity regex"));

// CJK unified ideographs, hiragana, katakana, Arabic.
static FOREIGN_SCRIPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{4E00}-\x{9FFF}\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{0600}-\x{06FF}]+")
        .expect("valid script range regex")
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\x{00A0}]+").expect("valid whitespace regex"));

static EDGE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\W_]+|[\W_]+$").expect("valid edge punctuation regex"));

/// Clean a raw title pulled out of an alert email.
///
/// Returns `None` when nothing meaningful survives the cleanup.
pub fn normalize_title(raw: &str) -> Option<String> {
    let title = ENTITY_RE.replace_all(raw, "");
    let title = FOREIGN_SCRIPT_RE.replace_all(&title, "");
    let title = WHITESPACE_RE.replace_all(&title, " ");
    let title = EDGE_PUNCT_RE.replace_all(title.trim(), "");

    if title.chars().count() >= MIN_TITLE_CHARS {
        Some(title.into_owned())
    } else {
        None
    }
}

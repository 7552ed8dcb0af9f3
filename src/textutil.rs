use once_cell::sync::Lazy;
use regex::Regex;

static KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{4e00}-\x{9fa5}]+|[A-Za-z0-9]+").expect("keyword regex"));

/// Canonical lookup key: lower-cased, with everything that is not alphanumeric or a CJK
/// ideograph removed (whitespace and punctuation included).
#[must_use]
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    text.to_lowercase()
        .chars()
        .filter(|&ch| ch.is_alphanumeric() || is_cjk_ideograph(ch))
        .collect()
}

/// Maximal runs of CJK ideographs or ASCII alphanumerics, in input order.
#[must_use]
pub fn keyword_tokens(text: &str) -> Vec<String> {
    KEYWORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[inline]
pub fn is_cjk_ideograph(ch: char) -> bool {
    matches!(ch as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF)
}

/// Shortens `text` to at most `max_chars` characters for log lines.
pub fn clip_for_log(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

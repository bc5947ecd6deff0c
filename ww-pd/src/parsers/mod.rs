//! Source parsers: pattern-based answer extraction from raw page content
//!
//! Pure functions, no I/O. Each scraped source has an ordered pattern list,
//! most specific first: patterns tied to a known sentence template on that
//! page are tried before generic ones, because generic patterns risk false
//! positives. Every candidate must pass the word-validity filter before it
//! is accepted.

use once_cell::sync::Lazy;
use regex::Regex;

/// Five-letter structural words that commonly co-occur with the real answer
/// in prose on these pages. They are artifacts of phrasing, never solutions.
const DENY_LIST: &[&str] = &[
    "TODAY", "GUESS", "HINTS", "WORDS", "DAILY", "CLUES", "GAMES", "START", "EVERY", "WHICH",
];

/// Word-validity filter: exactly 5 ASCII letters, uppercased, not a
/// deny-listed structural word.
pub fn normalize_candidate(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() != 5 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let word = trimmed.to_ascii_uppercase();
    if DENY_LIST.contains(&word.as_str()) {
        return None;
    }
    Some(word)
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid extraction pattern"))
        .collect()
}

// Pattern lists are ordered most specific first. Each pattern captures the
// candidate word in group 1.
static TOMSGUIDE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)today's\s+Wordle\s+answer\s+for\s+game\s+#?\d+\s+is\s+([A-Za-z]{5})\b",
        r"(?i)the\s+answer\s+to\s+today's\s+Wordle\s+is\s+([A-Za-z]{5})\b",
        r"(?i)Wordle\s+answer\s+(?:today\s+)?is\s+([A-Za-z]{5})\b",
    ])
});

// The gap between "is" and the answer may hold punctuation, whitespace, or
// inline markup such as <strong>, so tags are consumed whole.
static TECHRADAR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)today's\s+Wordle\s+answer\s+\(game\s+#?\d+\)\s+is(?:[^A-Za-z]|</?[A-Za-z][^>]*>){0,40}?([A-Za-z]{5})\b",
        r"(?i)the\s+Wordle\s+answer\s+today\s+is(?:[^A-Za-z]|</?[A-Za-z][^>]*>){0,40}?([A-Za-z]{5})\b",
        r"(?i)answer\s+is(?:[^A-Za-z]|</?[A-Za-z][^>]*>){0,40}?([A-Za-z]{5})\b",
    ])
});

static WORDTIPS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)Wordle\s+#?\d+\s+answer\s+(?:for\s+\w+\s+)?is[^A-Za-z]{0,20}([A-Za-z]{5})\b",
        r#"(?i)class="answer-word"[^>]*>\s*([A-Za-z]{5})\s*<"#,
        r"(?i)today's\s+answer\s+is[^A-Za-z]{0,20}([A-Za-z]{5})\b",
    ])
});

fn patterns_for(source_id: &str) -> Option<&'static [Regex]> {
    match source_id {
        "tomsguide" => Some(&TOMSGUIDE_PATTERNS),
        "techradar" => Some(&TECHRADAR_PATTERNS),
        "wordtips" => Some(&WORDTIPS_PATTERNS),
        _ => None,
    }
}

/// Extract a 5-letter answer candidate from raw page content.
///
/// Tries the source's patterns in priority order; within one pattern, each
/// match is screened through the validity filter so a deny-listed word does
/// not shadow the real answer later in the same sentence.
pub fn extract(source_id: &str, content: &str) -> Option<String> {
    let patterns = patterns_for(source_id)?;
    for pattern in patterns {
        for caps in pattern.captures_iter(content) {
            if let Some(m) = caps.get(1) {
                if let Some(word) = normalize_candidate(m.as_str()) {
                    return Some(word);
                }
            }
        }
    }
    None
}

/// Source identifiers with a registered parser
pub fn known_sources() -> &'static [&'static str] {
    &["tomsguide", "techradar", "wordtips"]
}

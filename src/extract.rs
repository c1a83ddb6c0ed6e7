//! Pulls Big-O notation out of free-form analysis text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const DEFAULT_TIME: &str = "O(n)";
const DEFAULT_SPACE: &str = "O(1)";

/// Prefix followed by `o(...)`, allowing one level of nested parentheses.
fn notation_after(prefix: &str) -> Regex {
    let pattern = format!(r"{prefix}o\s*\(\s*((?:[^()]|\([^()]*\))+?)\s*\)");
    Regex::new(&pattern).expect("regex should compile")
}

// Order matters: the first pattern that matches wins.
static TIME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"time complexity[:\s*]*",
        r"time[:\s*]*",
        r"runtime[:\s*]*",
        r"temporal complexity[:\s*]*",
        r"time[^.]*?",
        r"complexity[:\s*]*",
    ]
    .into_iter()
    .map(notation_after)
    .collect()
});

static SPACE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"space complexity[:\s*]*",
        r"space[:\s*]*",
        r"memory[:\s*]*",
        r"auxiliary space[:\s*]*",
        r"space[^.]*?",
    ]
    .into_iter()
    .map(notation_after)
    .collect()
});

static CLEANUPS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\s+", " "),
        (r"(?i)n\s*\*\s*log\s*\(\s*n\s*\)", "n log n"),
        (r"(?i)log\s*\(\s*n\s*\)", "log n"),
        (r"(?i)n\s*log\s*n", "n log n"),
        (r"(?i)n\s*\^\s*2", "n²"),
        (r"(?i)n\s*\*\s*n", "n²"),
        (r"(?i)n2", "n²"),
        (r"(?i)2\s*\^\s*n", "2^n"),
        (r"(?i)O\s*\(\s*", "O("),
        (r"\s*\)", ")"),
        (r"(?i)m\s*\+\s*n", "m+n"),
        (r"(?i)n\s*\+\s*m", "m+n"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("regex should compile"),
            replacement,
        )
    })
    .collect()
});

/// Time and space notation found in an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Complexities {
    pub time: String,
    pub space: String,
}

/// Extracts time and space complexity, defaulting to `O(n)` / `O(1)`.
pub fn extract_complexities(analysis: &str) -> Complexities {
    let text = analysis.to_lowercase();
    let time = first_match(&TIME_PATTERNS, &text).unwrap_or_else(|| DEFAULT_TIME.to_owned());
    let space = first_match(&SPACE_PATTERNS, &text).unwrap_or_else(|| DEFAULT_SPACE.to_owned());

    Complexities {
        time: clean(&time),
        space: clean(&space),
    }
}

/// Whether the text looks like it mentions complexity at all.
pub fn has_complexity_info(analysis: &str) -> bool {
    let text = analysis.to_lowercase();
    ["complexity", "o(", "time:", "space:"]
        .iter()
        .any(|marker| text.contains(marker))
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|inner| format!("O({})", inner.as_str().trim()))
    })
}

fn clean(notation: &str) -> String {
    CLEANUPS
        .iter()
        .fold(notation.to_owned(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

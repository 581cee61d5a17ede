//! Lexical tokenization
//!
//! Lower-cases, drops everything that is neither a word character nor
//! whitespace, then splits on whitespace. The query and every candidate must
//! go through this same function before lexical scoring.

use regex::Regex;
use std::sync::OnceLock;

fn non_word() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    // \w is Unicode-aware here, so Bengali vowel signs survive
    NON_WORD.get_or_init(|| Regex::new(r"[^\w\s]").expect("static pattern is valid"))
}

/// Split text into normalized lexical terms
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    non_word()
        .replace_all(&lowered, "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

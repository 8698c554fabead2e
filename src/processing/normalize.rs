use lazy_static::lazy_static;
use regex::Regex;

use crate::models::rules::BOILERPLATE_PHRASES;
use crate::models::{CanonicalText, RecognizedText};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref BOILERPLATE: Regex = Regex::new(&format!(
        "(?i){}",
        BOILERPLATE_PHRASES
            .iter()
            .map(|phrase| phrase_pattern(phrase))
            .collect::<Vec<_>>()
            .join("|")
    ))
    .unwrap();
}

/// Builds a pattern that matches `phrase` with OCR slack: any whitespace
/// (or none) between words, accented or bare vowels, optional apostrophes.
fn phrase_pattern(phrase: &str) -> String {
    let body = phrase
        .split_whitespace()
        .map(|word| word.chars().map(char_pattern).collect::<String>())
        .collect::<Vec<_>>()
        .join(r"\s*");

    let latin = phrase.chars().any(|c| c.is_ascii_alphabetic());
    if latin {
        format!(r"\b(?:{})\b", body)
    } else {
        format!("(?:{})", body)
    }
}

fn char_pattern(c: char) -> String {
    match c {
        'A' => "[AÀÂ]".to_string(),
        'E' => "[EÉÈÊ]".to_string(),
        'I' => "[IÎÏ]".to_string(),
        'O' => "[OÔ]".to_string(),
        'U' => "[UÛÙ]".to_string(),
        '\'' => r"\s*['’`]?\s*".to_string(),
        _ => regex::escape(&c.to_string()),
    }
}

pub struct TextNormalizer;

impl TextNormalizer {
    /// Collapse whitespace, trim, and strip card boilerplate.
    ///
    /// Runs to a fixed point, so `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(raw: &str) -> String {
        let mut text = collapse_whitespace(raw);
        loop {
            let stripped = BOILERPLATE.replace_all(&text, " ");
            let next = collapse_whitespace(&stripped);
            if next == text {
                return text;
            }
            text = next;
        }
    }

    pub fn canonicalize(recognized: &RecognizedText) -> CanonicalText {
        CanonicalText::new(recognized.side, Self::normalize(&recognized.text))
    }
}

fn collapse_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input, " ").trim().to_string()
}

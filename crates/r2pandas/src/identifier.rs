//! Identifier normalization
//!
//! Maps R identifiers (`my.data`, `totalCount`, `col-1`) onto the snake_case
//! names used in the generated Python. The mapping is idempotent so it can be
//! applied by several rules to the same name without compounding.

use cow_utils::CowUtils;

/// Words that must never be treated as user identifiers
pub const RESERVED_WORDS: &[&str] = &[
    "if", "else", "for", "while", "repeat", "function", "in", "next", "break", "return", "TRUE",
    "FALSE", "NULL", "NA", "NA_integer_", "NA_real_", "NA_character_", "Inf", "NaN", "True",
    "False", "None", "and", "or", "not", "def", "elif", "continue", "raise", "lambda", "pass",
];

/// Check whether a word is reserved in either the source or the target language
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Normalize an identifier to its canonical snake_case form
///
/// Dots and hyphens become underscores, an underscore is inserted at every
/// lowercase-or-digit to uppercase transition and the result is lower-cased.
pub fn normalize_identifier(name: &str) -> String {
    let folded = name.cow_replace('.', "_");
    let folded = folded.cow_replace('-', "_");

    let mut normalized = String::with_capacity(folded.len() + 4);
    let mut previous: Option<char> = None;
    for ch in folded.chars() {
        if ch.is_uppercase() {
            if previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                normalized.push('_');
            }
            normalized.extend(ch.to_lowercase());
        } else {
            normalized.push(ch);
        }
        previous = Some(ch);
    }
    normalized
}

//! Shared type definitions for the r2pandas crate
//!
//! This module contains common types that are used across multiple passes
//! of the pipeline, ensuring consistency and avoiding circular dependencies.

use std::hash::BuildHasherDefault;

use indexmap::IndexSet;
use rustc_hash::FxHasher;

/// Type alias for IndexSet with FxHasher for better performance
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// One physical line of input together with its 1-based line number
///
/// Lines are never mutated in place; every pass produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number in the original source
    pub number: usize,
    /// Line text without the trailing newline
    pub text: String,
}

impl SourceLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// Produce a successor line carrying the same line number
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            number: self.number,
            text: text.into(),
        }
    }
}

/// Split source text into numbered lines
///
/// Accepts both `\n` and `\r\n` line endings.
pub fn source_lines(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .map(|(idx, text)| SourceLine::new(idx + 1, text))
        .collect()
}

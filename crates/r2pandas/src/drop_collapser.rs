//! Chained column-drop collapsing
//!
//! R drops columns by assigning `NULL`, often as a chain
//! (`a$x <- a$y <- NULL`) or across consecutive lines. After expression
//! rewriting those read `a["x"] = a["y"] = None`, which pandas would turn
//! into columns full of `None`. Consecutive drops from the same frame are
//! accumulated and flushed as one `a = a.drop(columns=[...])` statement.
//! `NA` also renders as `None`, so only lines whose R source assigns `NULL`
//! are candidates.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    diagnostics::{DiagnosticKind, Diagnostics},
    types::{FxIndexSet, SourceLine},
};

static DROP_CHAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^\s*((?:[A-Za-z_.][\w.]*\["[^"]*"\]\s*=\s*)+)None\s*"#,
        "(\u{1A}\\d+\u{1A})?\\s*$"
    ))
    .expect("drop chain regex")
});
static NULL_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:<-|[^=!<>]=)\s*NULL\s*",
        "(\u{1A}\\d+\u{1A})?\\s*$"
    ))
    .expect("null assignment regex")
});
static DROP_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_.][\w.]*)\["([^"]*)"\]\s*="#).expect("drop target regex")
});

/// Whether a shielded R line ends by assigning `NULL`
pub fn assigns_null(source: &str) -> bool {
    NULL_ASSIGNMENT.is_match(source)
}

/// Columns dropped so far from one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropAccumulator {
    pub target: String,
    /// Column names in first-seen order, without duplicates
    pub columns: FxIndexSet<String>,
    /// Line number of the first line in the chain
    pub first_line: usize,
    /// Comment placeholders trailing the chain lines
    pub comments: Vec<String>,
}

impl DropAccumulator {
    fn new(chain: DropChain, line: usize) -> Self {
        let mut accumulator = Self {
            target: chain.target,
            columns: FxIndexSet::default(),
            first_line: line,
            comments: Vec::new(),
        };
        accumulator.columns.extend(chain.columns);
        accumulator.comments.extend(chain.comment);
        accumulator
    }

    /// Render the collapsed statement
    pub fn render(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| format!("\"{c}\"")).collect();
        let mut rendered = format!(
            "{target} = {target}.drop(columns=[{}])",
            columns.join(", "),
            target = self.target
        );
        for comment in &self.comments {
            rendered.push(' ');
            rendered.push_str(comment);
        }
        rendered
    }
}

/// One line of null assignments
#[derive(Debug, Clone, PartialEq, Eq)]
struct DropChain {
    target: String,
    columns: Vec<String>,
    comment: Option<String>,
}

/// Result of matching a line against the drop-chain pattern
#[derive(Debug, PartialEq, Eq)]
enum ChainMatch {
    NotAChain,
    /// A chain whose assignments name more than one frame
    MixedTargets,
    Chain(DropChain),
}

fn match_chain(text: &str) -> ChainMatch {
    let Some(caps) = DROP_CHAIN.captures(text) else {
        return ChainMatch::NotAChain;
    };
    let assignments = caps.get(1).map_or("", |m| m.as_str());

    let mut target: Option<&str> = None;
    let mut columns = Vec::new();
    for assignment in DROP_TARGET.captures_iter(assignments) {
        let (Some(frame), Some(column)) = (assignment.get(1), assignment.get(2)) else {
            continue;
        };
        match target {
            Some(existing) if existing != frame.as_str() => return ChainMatch::MixedTargets,
            _ => target = Some(frame.as_str()),
        }
        columns.push(column.as_str().to_owned());
    }

    match target {
        Some(target) => ChainMatch::Chain(DropChain {
            target: target.to_owned(),
            columns,
            comment: caps.get(2).map(|m| m.as_str().to_owned()),
        }),
        None => ChainMatch::NotAChain,
    }
}

/// Line-spanning collapser; owns the pending accumulator
#[derive(Debug, Default)]
pub struct DropCollapser {
    pending: Option<DropAccumulator>,
}

impl DropCollapser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one rewritten line; returns the lines ready for emission, in order
    pub fn push(&mut self, line: SourceLine, diagnostics: &mut Diagnostics) -> Vec<SourceLine> {
        let mut ready = Vec::with_capacity(2);
        match match_chain(&line.text) {
            ChainMatch::Chain(chain) => match &mut self.pending {
                Some(pending) if pending.target == chain.target => {
                    pending.columns.extend(chain.columns);
                    pending.comments.extend(chain.comment);
                }
                _ => {
                    ready.extend(self.flush());
                    self.pending = Some(DropAccumulator::new(chain, line.number));
                }
            },
            ChainMatch::MixedTargets => {
                ready.extend(self.flush());
                diagnostics.warn(
                    line.number,
                    DiagnosticKind::ChainFlush,
                    "null-assignment chain spans several frames; left as written",
                );
                ready.push(line);
            }
            ChainMatch::NotAChain => {
                ready.extend(self.flush());
                ready.push(line);
            }
        }
        ready
    }

    /// Pass a line that can never be a drop, flushing any pending chain first
    pub fn pass(&mut self, line: SourceLine) -> Vec<SourceLine> {
        let mut ready: Vec<SourceLine> = self.flush().into_iter().collect();
        ready.push(line);
        ready
    }

    /// Flush the pending accumulator, if any
    pub fn flush(&mut self) -> Option<SourceLine> {
        let pending = self.pending.take()?;
        debug!(
            "collapsed {} dropped column(s) of `{}` from line {}",
            pending.columns.len(),
            pending.target,
            pending.first_line
        );
        Some(SourceLine::new(pending.first_line, pending.render()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::literal_shield::placeholder;

    fn feed(lines: &[&str]) -> (Vec<SourceLine>, Diagnostics) {
        let mut collapser = DropCollapser::new();
        let mut diagnostics = Diagnostics::new();
        let mut out = Vec::new();
        for (idx, text) in lines.iter().enumerate() {
            out.extend(collapser.push(SourceLine::new(idx + 1, *text), &mut diagnostics));
        }
        out.extend(collapser.flush());
        (out, diagnostics)
    }

    fn texts(lines: &[SourceLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn test_single_line_chain() {
        let (out, diagnostics) = feed(&[r#"a["curt_prt"] = a["curt_rt_x"] = None"#]);
        assert_eq!(texts(&out), vec![r#"a = a.drop(columns=["curt_prt", "curt_rt_x"])"#]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_consecutive_lines_are_merged_in_first_seen_order() {
        let (out, _) = feed(&[
            r#"df["a"] = None"#,
            r#"df["b"] = df["a"] = None"#,
            r#"df["c"] = None"#,
            "x = 1",
        ]);
        assert_eq!(
            texts(&out),
            vec![r#"df = df.drop(columns=["a", "b", "c"])"#, "x = 1"]
        );
        assert_eq!(out[0].number, 1);
        assert_eq!(out[1].number, 4);
    }

    #[test]
    fn test_target_change_flushes() {
        let (out, _) = feed(&[r#"a["x"] = None"#, r#"b["y"] = None"#]);
        assert_eq!(
            texts(&out),
            vec![r#"a = a.drop(columns=["x"])"#, r#"b = b.drop(columns=["y"])"#]
        );
    }

    #[test]
    fn test_mixed_targets_pass_through() {
        let (out, diagnostics) = feed(&[r#"a["x"] = b["y"] = None"#]);
        assert_eq!(texts(&out), vec![r#"a["x"] = b["y"] = None"#]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().map(|d| d.kind),
            Some(DiagnosticKind::ChainFlush)
        );
    }

    #[test]
    fn test_trailing_comments_are_kept() {
        let first = format!(r#"a["x"] = None {}"#, placeholder(0));
        let second = format!(r#"a["y"] = None {}"#, placeholder(1));
        let (out, _) = feed(&[first.as_str(), second.as_str()]);
        assert_eq!(
            out[0].text,
            format!(
                r#"a = a.drop(columns=["x", "y"]) {} {}"#,
                placeholder(0),
                placeholder(1)
            )
        );
    }

    #[test]
    fn test_only_null_sources_are_candidates() {
        assert!(assigns_null("df$x <- NULL"));
        assert!(assigns_null("a$x <- a$y <- NULL  "));
        assert!(assigns_null(&format!("df$x <- NULL {}", placeholder(3))));
        assert!(assigns_null("df$x = NULL"));
        assert!(!assigns_null("df$x <- NA"));
        assert!(!assigns_null("if (x == NULL"));
        assert!(!assigns_null("df$x <- NA_character_"));
        assert!(!assigns_null("is_null <- is.null(y)"));
    }

    #[test]
    fn test_pass_flushes_pending_chain() {
        let mut collapser = DropCollapser::new();
        let mut diagnostics = Diagnostics::new();
        assert!(
            collapser
                .push(SourceLine::new(1, r#"a["x"] = None"#), &mut diagnostics)
                .is_empty()
        );
        let out = collapser.pass(SourceLine::new(2, r#"a["y"] = None"#));
        assert_eq!(
            texts(&out),
            vec![r#"a = a.drop(columns=["x"])"#, r#"a["y"] = None"#]
        );
        assert!(collapser.flush().is_none());
    }

    #[test]
    fn test_non_null_assignments_are_untouched() {
        let (out, _) = feed(&[r#"a["x"] = 0"#, r#"a["y"] = None + 1"#]);
        assert_eq!(texts(&out), vec![r#"a["x"] = 0"#, r#"a["y"] = None + 1"#]);
    }
}

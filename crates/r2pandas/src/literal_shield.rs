//! Literal shielding
//!
//! Quoted strings and comments are lifted out of each line and replaced by
//! opaque placeholders before any rewrite rule runs, then restored verbatim
//! when the line is emitted. Rewrite rules therefore never see, and can never
//! corrupt, literal text.
//!
//! A placeholder is `\u{1A}<index>\u{1A}`. The table is file-wide so that
//! line-spanning passes (chain collapsing) may move placeholders between
//! lines without collisions.

use log::{trace, warn};

use crate::{
    diagnostics::{DiagnosticKind, Diagnostics},
    identifier::normalize_identifier,
    types::SourceLine,
};

/// Reserved character delimiting placeholders
pub const PLACEHOLDER_MARK: char = '\u{1A}';

/// What a shielded span contained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// A complete single- or double-quoted string including its quotes
    String,
    /// A comment running to end of line, including the `#`
    Comment,
    /// An unterminated quote and everything after it on the line
    Unterminated,
}

#[derive(Debug, Clone)]
struct ShieldedSpan {
    text: String,
    kind: SpanKind,
    restored: usize,
}

/// File-wide table of shielded spans
#[derive(Debug, Default)]
pub struct LiteralShield {
    spans: Vec<ShieldedSpan>,
}

/// Render the placeholder for a span index
pub fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_MARK}{index}{PLACEHOLDER_MARK}")
}

/// Parse text that consists of exactly one placeholder
pub fn parse_placeholder(text: &str) -> Option<usize> {
    let inner = text
        .strip_prefix(PLACEHOLDER_MARK)?
        .strip_suffix(PLACEHOLDER_MARK)?;
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

/// Indices of all placeholders appearing in `text`, in order
pub fn placeholder_indices(text: &str) -> Vec<usize> {
    text.split(PLACEHOLDER_MARK)
        .skip(1)
        .step_by(2)
        .filter_map(|inner| inner.parse().ok())
        .collect()
}

impl LiteralShield {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace string and comment spans of a line with placeholders
    pub fn shield(&mut self, line: &SourceLine, diagnostics: &mut Diagnostics) -> SourceLine {
        let text = line.text.as_str();
        let mut shielded = String::with_capacity(text.len());
        let mut chars = text.char_indices();

        while let Some((start, ch)) = chars.next() {
            match ch {
                '"' | '\'' => {
                    let mut escaped = false;
                    let mut end = None;
                    for (idx, inner) in chars.by_ref() {
                        if escaped {
                            escaped = false;
                        } else if inner == '\\' {
                            escaped = true;
                        } else if inner == ch {
                            end = Some(idx + inner.len_utf8());
                            break;
                        }
                    }
                    if let Some(end) = end {
                        shielded.push_str(&self.push_span(&text[start..end], SpanKind::String));
                    } else {
                        diagnostics.warn(
                            line.number,
                            DiagnosticKind::UnterminatedLiteral,
                            format!("unterminated {ch} quote; rest of line left untranslated"),
                        );
                        shielded.push_str(&self.push_span(&text[start..], SpanKind::Unterminated));
                        break;
                    }
                }
                '#' => {
                    shielded.push_str(&self.push_span(&text[start..], SpanKind::Comment));
                    break;
                }
                _ => shielded.push(ch),
            }
        }

        trace!("line {}: shielded {:?}", line.number, shielded);
        line.with_text(shielded)
    }

    fn push_span(&mut self, text: &str, kind: SpanKind) -> String {
        let index = self.spans.len();
        self.spans.push(ShieldedSpan {
            text: text.to_owned(),
            kind,
            restored: 0,
        });
        placeholder(index)
    }

    /// Original text of a shielded span
    pub fn span_text(&self, index: usize) -> Option<&str> {
        self.spans.get(index).map(|span| span.text.as_str())
    }

    pub fn span_kind(&self, index: usize) -> Option<SpanKind> {
        self.spans.get(index).map(|span| span.kind)
    }

    /// Whether `text` is exactly one placeholder for a complete string literal
    pub fn is_string_literal(&self, text: &str) -> bool {
        parse_placeholder(text.trim()).and_then(|idx| self.span_kind(idx)) == Some(SpanKind::String)
    }

    /// Normalize the contents of a string literal used as a column name
    ///
    /// Only literals whose contents look like an identifier are touched.
    /// Returns true when the literal was rewritten.
    pub fn normalize_column_literal(&mut self, index: usize) -> bool {
        let Some(span) = self.spans.get_mut(index) else {
            return false;
        };
        if span.kind != SpanKind::String || span.text.len() < 2 {
            return false;
        }
        let quote = &span.text[..1];
        let inner = &span.text[1..span.text.len() - 1];
        let looks_like_name = !inner.is_empty()
            && inner
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !looks_like_name {
            return false;
        }
        let normalized = format!("{quote}{}{quote}", normalize_identifier(inner));
        if normalized == span.text {
            return false;
        }
        span.text = normalized;
        true
    }

    /// Replace every placeholder in `text` with its original span
    pub fn restore(&mut self, text: &str) -> String {
        let mut restored = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find(PLACEHOLDER_MARK) {
            restored.push_str(&rest[..open]);
            let after_open = &rest[open + PLACEHOLDER_MARK.len_utf8()..];
            let Some(close) = after_open.find(PLACEHOLDER_MARK) else {
                restored.push_str(&rest[open..]);
                rest = "";
                break;
            };
            let index = after_open[..close].parse::<usize>().ok();
            match index.and_then(|idx| self.spans.get_mut(idx)) {
                Some(span) => {
                    span.restored += 1;
                    if span.restored > 1 {
                        warn!("literal span {:?} restored more than once", span.text);
                    }
                    restored.push_str(&span.text);
                }
                None => restored.push_str(&rest[open..open + close + 2 * PLACEHOLDER_MARK.len_utf8()]),
            }
            rest = &after_open[close + PLACEHOLDER_MARK.len_utf8()..];
        }
        restored.push_str(rest);
        restored
    }

    /// Indices of spans that were shielded but never restored
    pub fn unrestored(&self) -> Vec<usize> {
        self.spans
            .iter()
            .enumerate()
            .filter(|(_, span)| span.restored == 0)
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shield_one(text: &str) -> (LiteralShield, String, Diagnostics) {
        let mut shield = LiteralShield::new();
        let mut diagnostics = Diagnostics::new();
        let line = shield.shield(&SourceLine::new(1, text), &mut diagnostics);
        (shield, line.text, diagnostics)
    }

    #[test]
    fn test_strings_and_comments_become_placeholders() {
        let (shield, text, diagnostics) = shield_one(r#"x <- "a %in% b" # note"#);
        assert_eq!(text, format!("x <- {} {}", placeholder(0), placeholder(1)));
        assert_eq!(shield.span_text(0), Some(r#""a %in% b""#));
        assert_eq!(shield.span_kind(1), Some(SpanKind::Comment));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_escaped_quotes_stay_inside_the_span() {
        let (shield, text, _) = shield_one(r#"msg <- "say \"hi\"" ; y <- 'it\'s'"#);
        assert_eq!(text, format!("msg <- {} ; y <- {}", placeholder(0), placeholder(1)));
        assert_eq!(shield.span_text(0), Some(r#""say \"hi\"""#));
        assert_eq!(shield.span_text(1), Some(r"'it\'s'"));
    }

    #[test]
    fn test_hash_inside_string_is_not_a_comment() {
        let (shield, text, _) = shield_one(r##"tag <- "#1""##);
        assert_eq!(text, format!("tag <- {}", placeholder(0)));
        assert_eq!(shield.span_kind(0), Some(SpanKind::String));
    }

    #[test]
    fn test_unterminated_quote_is_shielded_defensively() {
        let (shield, text, diagnostics) = shield_one(r#"x <- "open $col"#);
        assert_eq!(text, format!("x <- {}", placeholder(0)));
        assert_eq!(shield.span_kind(0), Some(SpanKind::Unterminated));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().map(|d| d.kind),
            Some(DiagnosticKind::UnterminatedLiteral)
        );
    }

    #[test]
    fn test_restore_round_trips_and_tracks_usage() {
        let original = r#"paste("a", 'b') # done"#;
        let (mut shield, text, _) = shield_one(original);
        assert_eq!(shield.unrestored(), vec![0, 1, 2]);
        assert_eq!(shield.restore(&text), original);
        assert!(shield.unrestored().is_empty());
    }

    #[test]
    fn test_normalize_column_literal() {
        let (mut shield, _, _) = shield_one(r#"df[["col.Name"]]; "two words""#);
        assert!(shield.normalize_column_literal(0));
        assert_eq!(shield.span_text(0), Some(r#""col_name""#));
        assert!(!shield.normalize_column_literal(1));
        assert_eq!(shield.span_text(1), Some(r#""two words""#));
    }

    #[test]
    fn test_parse_placeholder() {
        assert_eq!(parse_placeholder(&placeholder(12)), Some(12));
        assert_eq!(parse_placeholder("12"), None);
        assert_eq!(parse_placeholder(&format!("{}x", placeholder(1))), None);
    }

    #[test]
    fn test_placeholder_indices() {
        let text = format!("c({}, {}) {}", placeholder(3), placeholder(4), placeholder(5));
        assert_eq!(placeholder_indices(&text), vec![3, 4, 5]);
        assert!(placeholder_indices("plain").is_empty());
    }
}

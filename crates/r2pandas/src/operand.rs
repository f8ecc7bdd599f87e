//! Operand shape classification
//!
//! Several R operators mean different things in pandas depending on whether
//! they are applied to a column or to a single value. Rules that need that
//! decision classify the already-rewritten operand text into an
//! [`OperandShape`] instead of guessing from raw R text.

use crate::{
    literal_shield::LiteralShield,
    scanner::{is_ident_byte, matching_close},
};

/// Shape of an operand as far as it can be told from rewritten text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// An indexed frame column or another element-wise result
    Vectorized,
    /// A literal value
    Scalar,
    /// Anything whose shape cannot be read off the text
    Unknown,
}

/// Method suffixes whose result is element-wise
const VECTORIZED_METHODS: &[&str] = &[".isna()", ".notna()", ".unique()", ".columns"];

/// Calls known to produce frames or series
const VECTORIZED_CALLS: &[&str] = &["pd.concat(", "pd.merge(", "pd.Series("];

/// Classify an operand
pub fn classify_operand(text: &str, shield: &LiteralShield) -> OperandShape {
    let operand = text.trim();
    if operand.is_empty() {
        return OperandShape::Unknown;
    }

    if let Some(inner) = strip_outer_parens(operand) {
        if contains_vectorized(inner) {
            return OperandShape::Vectorized;
        }
        return classify_operand(inner, shield);
    }

    if operand.ends_with(']') && !operand.starts_with('[') {
        return OperandShape::Vectorized;
    }
    if VECTORIZED_METHODS.iter().any(|m| operand.ends_with(m))
        || VECTORIZED_CALLS.iter().any(|c| operand.starts_with(c))
        || ends_with_isin_call(operand)
    {
        return OperandShape::Vectorized;
    }

    if is_scalar_literal(operand) || shield.is_string_literal(operand) {
        return OperandShape::Scalar;
    }

    OperandShape::Unknown
}

/// Whether any part of `text` is visibly element-wise
pub fn contains_vectorized(text: &str) -> bool {
    let bytes = text.as_bytes();
    let indexed = bytes.iter().enumerate().any(|(idx, &b)| {
        b == b'['
            && idx > 0
            && (is_ident_byte(bytes[idx - 1]) || matches!(bytes[idx - 1], b']' | b')'))
    });
    indexed
        || text.contains(".isin(")
        || VECTORIZED_METHODS.iter().any(|m| text.contains(m))
}

fn ends_with_isin_call(text: &str) -> bool {
    text.ends_with(')')
        && text
            .rfind(".isin(")
            .is_some_and(|pos| matching_close(text, pos + ".isin".len()) == Some(text.len() - 1))
}

/// Contents of `text` when one parenthesis pair encloses all of it
fn strip_outer_parens(text: &str) -> Option<&str> {
    if text.starts_with('(') && matching_close(text, 0) == Some(text.len() - 1) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn is_scalar_literal(text: &str) -> bool {
    if matches!(text, "True" | "False" | "None" | "np.nan" | "np.inf") {
        return true;
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty()
        && digits.bytes().next().is_some_and(|b| b.is_ascii_digit() || b == b'.')
        && digits
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'L'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostics::Diagnostics, types::SourceLine};

    fn shape(text: &str) -> OperandShape {
        classify_operand(text, &LiteralShield::new())
    }

    #[test]
    fn test_indexed_access_is_vectorized() {
        assert_eq!(shape(r#"df["score"]"#), OperandShape::Vectorized);
        assert_eq!(shape(r#"df["a"][df["b"] > 1]"#), OperandShape::Vectorized);
        assert_eq!(shape("df.columns"), OperandShape::Vectorized);
        assert_eq!(shape(r#"df["a"].isin([1, 2])"#), OperandShape::Vectorized);
        assert_eq!(shape(r#"(df["a"] > 3)"#), OperandShape::Vectorized);
    }

    #[test]
    fn test_literals_are_scalar() {
        assert_eq!(shape("42"), OperandShape::Scalar);
        assert_eq!(shape("-1.5e3"), OperandShape::Scalar);
        assert_eq!(shape("True"), OperandShape::Scalar);
        assert_eq!(shape("(7)"), OperandShape::Scalar);

        let mut shield = LiteralShield::new();
        let line = shield.shield(&SourceLine::new(1, r#""abc""#), &mut Diagnostics::new());
        assert_eq!(classify_operand(&line.text, &shield), OperandShape::Scalar);
    }

    #[test]
    fn test_bare_names_and_calls_are_unknown() {
        assert_eq!(shape("x"), OperandShape::Unknown);
        assert_eq!(shape("toupper(x)"), OperandShape::Unknown);
        assert_eq!(shape("[1, 2]"), OperandShape::Unknown);
    }
}

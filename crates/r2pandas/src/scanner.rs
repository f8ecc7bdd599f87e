//! Bracket-aware scanning over shielded text
//!
//! Rewrite rules work on shielded lines, so quotes never need to be tracked
//! here: every `(`, `[`, `{` and `,` that survives shielding is real syntax.
//! All delimiters are ASCII, which keeps byte indexing on char boundaries.

use crate::literal_shield::PLACEHOLDER_MARK;

/// Whether a byte can start an identifier in rewritten text
pub const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'.' || b == b'_'
}

/// Whether a byte can continue an identifier
pub const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'_'
}

const fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

const fn opener_for(close: u8) -> Option<u8> {
    match close {
        b')' => Some(b'('),
        b']' => Some(b'['),
        b'}' => Some(b'{'),
        _ => None,
    }
}

/// Index of the bracket closing the one at `open`
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut stack = vec![closer_for(*bytes.get(open)?)?];
    for (idx, &b) in bytes.iter().enumerate().skip(open + 1) {
        if let Some(closer) = closer_for(b) {
            stack.push(closer);
        } else if opener_for(b).is_some() {
            if stack.pop() != Some(b) {
                return None;
            }
            if stack.is_empty() {
                return Some(idx);
            }
        }
    }
    None
}

/// Index of the bracket opening the one at `close`
pub fn matching_open(text: &str, close: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut stack = vec![opener_for(*bytes.get(close)?)?];
    for idx in (0..close).rev() {
        let b = bytes[idx];
        if let Some(opener) = opener_for(b) {
            stack.push(opener);
        } else if closer_for(b).is_some() {
            if stack.pop() != Some(b) {
                return None;
            }
            if stack.is_empty() {
                return Some(idx);
            }
        }
    }
    None
}

/// Split at `separator` occurrences that are not nested in brackets
///
/// Returns `None` when the brackets in `text` are unbalanced.
pub fn split_top_level(text: &str, separator: u8) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, &b) in text.as_bytes().iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.checked_sub(1)?,
            _ if b == separator && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&text[start..]);
    Some(parts)
}

/// Split a call's argument text into trimmed arguments
///
/// An empty argument list yields an empty vector.
pub fn split_args(text: &str) -> Option<Vec<&str>> {
    if text.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(split_top_level(text, b',')?.into_iter().map(str::trim).collect())
}

/// Split `name = value` into its parts when `arg` is a keyword argument
pub fn keyword_arg(arg: &str) -> Option<(&str, &str)> {
    let bytes = arg.as_bytes();
    let mut depth = 0usize;
    for (idx, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 => {
                let next = bytes.get(idx + 1).copied();
                let prev = idx.checked_sub(1).map(|p| bytes[p]);
                if next == Some(b'=') || matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) {
                    return None;
                }
                let name = arg[..idx].trim();
                if is_identifier(name) {
                    return Some((name, arg[idx + 1..].trim()));
                }
                return None;
            }
            _ => {}
        }
    }
    None
}

/// Whether `text` is a single bare identifier
pub fn is_identifier(text: &str) -> bool {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(&first) if is_ident_start(first) => {
            bytes.iter().all(|&b| is_ident_byte(b))
                && !(first == b'.' && bytes.get(1).is_some_and(u8::is_ascii_digit))
        }
        _ => false,
    }
}

/// Location of a call `name(...)` within a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Start of the callee name
    pub start: usize,
    /// Index of the opening parenthesis
    pub open: usize,
    /// Index of the matching closing parenthesis, `None` when unbalanced
    pub close: Option<usize>,
}

/// Find the next call of `name` at or after `from`
///
/// The callee must not be part of a longer identifier and must not follow `$`.
pub fn find_call(text: &str, name: &str, from: usize) -> Option<CallSite> {
    let bytes = text.as_bytes();
    let mut search = from;
    while let Some(rel) = text.get(search..)?.find(name) {
        let start = search + rel;
        let end = start + name.len();
        search = start + 1;

        let prev = start.checked_sub(1).map(|p| bytes[p]);
        if prev.is_some_and(|b| is_ident_byte(b) || b == b'$') {
            continue;
        }
        let mut open = end;
        while bytes.get(open) == Some(&b' ') {
            open += 1;
        }
        if bytes.get(open) != Some(&b'(') {
            continue;
        }
        return Some(CallSite {
            start,
            open,
            close: matching_close(text, open),
        });
    }
    None
}

/// Rewrite every call of `name`, innermost calls first
///
/// `render` receives the already-rewritten argument text and returns the
/// replacement for the whole call, or `None` to keep the call as it is.
/// Unbalanced calls stop the scan and the rest of the text is left alone.
pub fn replace_calls(
    text: &str,
    name: &str,
    render: &mut dyn FnMut(&str) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(site) = find_call(text, name, cursor) {
        let Some(close) = site.close else {
            break;
        };
        let inner = replace_calls(&text[site.open + 1..close], name, render);
        out.push_str(&text[cursor..site.start]);
        match render(&inner) {
            Some(rendered) => out.push_str(&rendered),
            None => {
                out.push_str(&text[site.start..=site.open]);
                out.push_str(&inner);
                out.push(')');
            }
        }
        cursor = close + 1;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Byte span of an identifier token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentToken {
    pub start: usize,
    pub end: usize,
}

/// Identifier tokens of a shielded line
///
/// Numeric literals (including `1e5`, `.5` and placeholder indices) are
/// skipped rather than split into identifier fragments.
pub fn identifiers(text: &str) -> Vec<IdentToken> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        let starts_number = b.is_ascii_digit()
            || (b == b'.' && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit));
        if starts_number {
            idx += 1;
            while idx < bytes.len() && is_ident_byte(bytes[idx]) {
                idx += 1;
            }
        } else if is_ident_start(b) {
            let start = idx;
            while idx < bytes.len() && is_ident_byte(bytes[idx]) {
                idx += 1;
            }
            tokens.push(IdentToken { start, end: idx });
        } else {
            idx += 1;
        }
    }
    tokens
}

/// First non-space byte at or after `idx`
pub fn next_non_space(text: &str, idx: usize) -> Option<u8> {
    text.as_bytes()
        .get(idx..)?
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

/// Last non-space byte before `idx`
pub fn prev_non_space(text: &str, idx: usize) -> Option<u8> {
    text.as_bytes()
        .get(..idx)?
        .iter()
        .rev()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

fn is_operand_byte(b: u8) -> bool {
    is_ident_byte(b) || b == PLACEHOLDER_MARK as u8 || b == b'"'
}

/// Start of the postfix expression ending right before `end`
///
/// Consumes identifiers, literals, placeholders, calls and index groups,
/// for example `df["a"]`, `f(x)[1]` or `x.columns`.
pub fn operand_start(text: &str, end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut idx = end;
    while idx > 0 && bytes[idx - 1].is_ascii_whitespace() {
        idx -= 1;
    }
    let trimmed_end = idx;
    while idx > 0 {
        let b = bytes[idx - 1];
        if matches!(b, b')' | b']') {
            match matching_open(text, idx - 1) {
                Some(open) => idx = open,
                None => break,
            }
        } else if is_operand_byte(b) {
            idx -= 1;
        } else {
            break;
        }
    }
    if idx == trimmed_end { end } else { idx }
}

/// End (exclusive) of the postfix expression starting at or after `start`
pub fn operand_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    if bytes.get(idx) == Some(&b'-') {
        idx += 1;
    }
    while idx < bytes.len() {
        let b = bytes[idx];
        if matches!(b, b'(' | b'[') {
            match matching_close(text, idx) {
                Some(close) => idx = close + 1,
                None => break,
            }
        } else if is_operand_byte(b) {
            idx += 1;
        } else {
            break;
        }
    }
    idx
}

/// Render `expr` so a method or attribute can be appended to it
///
/// Postfix expressions are used as they are; anything else is parenthesized.
pub fn as_receiver(expr: &str) -> String {
    let expr = expr.trim();
    if !expr.is_empty() && !expr.starts_with('-') && operand_end(expr, 0) == expr.len() {
        expr.to_owned()
    } else {
        format!("({expr})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_brackets() {
        let text = "f(a[1], (b))";
        assert_eq!(matching_close(text, 1), Some(11));
        assert_eq!(matching_close(text, 3), Some(5));
        assert_eq!(matching_open(text, 11), Some(1));
        assert_eq!(matching_close("f(a]", 1), None);
    }

    #[test]
    fn test_split_args_respects_nesting() {
        let args = split_args("df[df$a > 1, ], y, by = c(1, 2)").unwrap();
        assert_eq!(args, vec!["df[df$a > 1, ]", "y", "by = c(1, 2)"]);
        assert_eq!(split_args("  ").unwrap(), Vec::<&str>::new());
        assert_eq!(split_args("a, (b"), None);
    }

    #[test]
    fn test_keyword_arg() {
        assert_eq!(keyword_arg("by.x = id"), Some(("by.x", "id")));
        assert_eq!(keyword_arg("a == b"), None);
        assert_eq!(keyword_arg("a >= b"), None);
        assert_eq!(keyword_arg("f(x = 1)"), None);
    }

    #[test]
    fn test_find_call_requires_word_boundary() {
        let text = "rbind(a, b) + bind (c)";
        let site = find_call(text, "bind", 0).unwrap();
        assert_eq!(site.start, 14);
        assert_eq!(site.open, 19);
        assert_eq!(site.close, Some(21));
    }

    #[test]
    fn test_replace_calls_rewrites_nested_calls() {
        let rewritten = replace_calls("c(1, c(2, 3))", "c", &mut |args| Some(format!("[{args}]")));
        assert_eq!(rewritten, "[1, [2, 3]]");
    }

    #[test]
    fn test_identifiers_skip_numbers() {
        let text = "x1 + 1e5 * .5 - my.var";
        let names: Vec<&str> = identifiers(text)
            .into_iter()
            .map(|t| &text[t.start..t.end])
            .collect();
        assert_eq!(names, vec!["x1", "my.var"]);
    }

    #[test]
    fn test_operand_bounds() {
        let text = r#"keep & df["a"][1] %in% vals"#;
        let op = text.find(" %in%").unwrap();
        assert_eq!(&text[operand_start(text, op)..op], r#"df["a"][1]"#);
        let after = op + " %in%".len();
        assert_eq!(&text[after..operand_end(text, after)], " vals");
    }

    #[test]
    fn test_as_receiver() {
        assert_eq!(as_receiver(r#"df["a"]"#), r#"df["a"]"#);
        assert_eq!(as_receiver("f(x)"), "f(x)");
        assert_eq!(as_receiver("a + b"), "(a + b)");
        assert_eq!(as_receiver("-x"), "(-x)");
    }
}

//! Vector construction: `c(...)` literals and integer ranges

use super::{RewriteContext, RewriteRule};
use crate::{
    diagnostics::DiagnosticKind,
    identifier::normalize_identifier,
    literal_shield::PLACEHOLDER_MARK,
    scanner::{
        as_receiver, find_call, is_ident_byte, keyword_arg, operand_end, operand_start,
        prev_non_space, replace_calls, split_args,
    },
};

/// `c(a, b)` becomes `[a, b]`
///
/// Precondition: `names-assignment` has run, so a `names(x)` argument here is
/// always a read and is spliced as `*x.columns`. A `c(...)` whose arguments
/// are all named becomes a `dict(...)` call.
#[derive(Debug, Clone, Copy)]
pub struct VectorLiteral;

impl RewriteRule for VectorLiteral {
    fn name(&self) -> &'static str {
        "vector-literal"
    }

    fn apply(&self, text: &str, _ctx: &mut RewriteContext<'_>) -> Option<String> {
        if find_call(text, "c", 0).is_none() {
            return None;
        }
        Some(replace_calls(text, "c", &mut render_vector))
    }
}

fn render_vector(args: &str) -> Option<String> {
    let parts = split_args(args)?;
    let named: Vec<(&str, &str)> = parts.iter().filter_map(|part| keyword_arg(part)).collect();

    if !parts.is_empty() && named.len() == parts.len() {
        let entries: Vec<String> = named
            .iter()
            .map(|(key, value)| format!("{}={value}", normalize_identifier(key)))
            .collect();
        return Some(format!("dict({})", entries.join(", ")));
    }

    let items: Vec<String> = parts
        .iter()
        .map(|part| {
            let value = keyword_arg(part).map_or(*part, |(_, value)| value);
            splice_column_names(value).unwrap_or_else(|| value.to_owned())
        })
        .collect();
    Some(format!("[{}]", items.join(", ")))
}

/// `names(x)` spanning a whole argument, rendered as `*x.columns`
fn splice_column_names(arg: &str) -> Option<String> {
    for name in ["names", "colnames"] {
        let Some(site) = find_call(arg, name, 0) else {
            continue;
        };
        if site.start != 0 || site.close != Some(arg.len() - 1) {
            continue;
        }
        let inner = split_args(&arg[site.open + 1..arg.len() - 1])?;
        if let [frame] = inner.as_slice() {
            return Some(format!("*{}.columns", as_receiver(frame)));
        }
    }
    None
}

/// Integer sequences become `range(...)` with an inclusive upper bound
///
/// Covers `a:b`, `seq(a, b[, by])`, `seq_len(n)` and `seq_along(x)`.
/// Precondition: `builtins` has rewritten `length`/`nrow` so bounds such as
/// `1:nrow(df)` read `1:len(df)`.
#[derive(Debug, Clone, Copy)]
pub struct Ranges;

impl RewriteRule for Ranges {
    fn name(&self) -> &'static str {
        "ranges"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        let text = replace_calls(text, "seq_len", &mut |args| {
            let args = split_args(args)?;
            match args.as_slice() {
                [n] => Some(format!("range(1, {})", inclusive_end(n, false))),
                _ => None,
            }
        });
        let text = replace_calls(&text, "seq_along", &mut |args| {
            let args = split_args(args)?;
            match args.as_slice() {
                [x] => Some(format!("range(1, len({x}) + 1)")),
                _ => None,
            }
        });
        let line = ctx.line;
        let text = replace_calls(&text, "seq", &mut |args| {
            let rendered = render_seq(args);
            if rendered.is_none() {
                ctx.diagnostics.warn(
                    line,
                    DiagnosticKind::UnrecognizedConstruct,
                    format!("seq({args}) has no range equivalent; passed through"),
                );
            }
            rendered
        });
        Some(rewrite_colon_ranges(&text))
    }
}

fn int_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    text.strip_suffix('L').unwrap_or(text).parse().ok()
}

/// Exclusive bound for an inclusive R end point
///
/// Literal end points are folded unless the folded value would overflow.
fn inclusive_end(end: &str, descending: bool) -> String {
    let end = end.trim();
    let folded = int_literal(end).and_then(|n| {
        if descending {
            n.checked_sub(1)
        } else {
            n.checked_add(1)
        }
    });
    match (folded, descending) {
        (Some(n), _) => n.to_string(),
        (None, false) => format!("{end} + 1"),
        (None, true) => format!("{end} - 1"),
    }
}

fn render_range(start: &str, end: &str) -> String {
    match (int_literal(start), int_literal(end)) {
        (Some(a), Some(b)) if a > b => format!("range({a}, {}, -1)", inclusive_end(end, true)),
        (Some(a), Some(_)) => format!("range({a}, {})", inclusive_end(end, false)),
        _ => format!("range({}, {})", start.trim(), inclusive_end(end, false)),
    }
}

fn render_seq(args: &str) -> Option<String> {
    let mut from = None;
    let mut to = None;
    let mut by = None;
    let mut positional = Vec::new();

    for arg in split_args(args)? {
        match keyword_arg(arg) {
            Some(("from", value)) => from = Some(value),
            Some(("to", value)) => to = Some(value),
            Some(("by", value)) => by = Some(value),
            Some(_) => return None,
            None => positional.push(arg),
        }
    }
    let mut positional = positional.into_iter();
    for slot in [&mut from, &mut to, &mut by] {
        if slot.is_none() {
            *slot = positional.next();
        }
    }
    if positional.next().is_some() {
        return None;
    }

    match (from, to, by) {
        (Some(n), None, None) => Some(format!("range(1, {})", inclusive_end(n, false))),
        (Some(from), Some(to), None) => Some(render_range(from, to)),
        (Some(from), Some(to), Some(by)) => {
            let descending = by.trim_start().starts_with('-');
            Some(format!(
                "range({}, {}, {})",
                from.trim(),
                inclusive_end(to, descending),
                by.trim()
            ))
        }
        _ => None,
    }
}

fn rewrite_colon_ranges(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 16);
    let mut cursor = 0;

    for (idx, &b) in bytes.iter().enumerate() {
        if b != b':' || idx < cursor {
            continue;
        }
        let prev = idx.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(idx + 1).copied();
        if prev == Some(b':') || matches!(next, Some(b':' | b'=')) {
            continue;
        }

        let start = extend_unary_minus(text, operand_start(text, idx));
        let end = operand_end(text, idx + 1);
        let (left, right) = (text[start..idx].trim(), text[idx + 1..end].trim());
        if start < cursor || left.is_empty() || right.is_empty() || right == "-" {
            continue;
        }

        let lead = &text[start..idx];
        let lead_ws = &lead[..lead.len() - lead.trim_start().len()];
        out.push_str(&text[cursor..start]);
        out.push_str(lead_ws);
        out.push_str(&render_range(left, right));
        cursor = end;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Pull a prefix `-` into a left operand when it is unary
fn extend_unary_minus(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut idx = start;
    while idx > 0 && bytes[idx - 1] == b' ' {
        idx -= 1;
    }
    if idx == 0 || bytes[idx - 1] != b'-' {
        return start;
    }
    let binary = prev_non_space(text, idx - 1).is_some_and(|b| {
        is_ident_byte(b) || matches!(b, b')' | b']' | b'"') || b == PLACEHOLDER_MARK as u8
    });
    if binary { start } else { idx - 1 }
}

//! `subset(...)` calls and comparison guarding for boolean masks

use super::{RewriteContext, RewriteRule};
use crate::{
    diagnostics::DiagnosticKind,
    identifier::{is_reserved, normalize_identifier},
    literal_shield::{PLACEHOLDER_MARK, parse_placeholder},
    scanner::{
        as_receiver, find_call, identifiers, is_identifier, keyword_arg, matching_close,
        next_non_space, replace_calls, split_args,
    },
    types::FxIndexSet,
};

/// Module prefixes produced by earlier rules that are never column names
const MODULE_PREFIXES: &[&str] = &["np.", "pd."];

/// `subset(df, cond, select = c(...))` becomes boolean-mask indexing
///
/// Precondition: `column-access` has run, so qualified columns already read
/// `df["col"]` and their names are skipped when bare names in the condition
/// are qualified against the frame.
#[derive(Debug, Clone, Copy)]
pub struct Subset;

impl RewriteRule for Subset {
    fn name(&self) -> &'static str {
        "subset"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        find_call(text, "subset", 0)?;
        Some(replace_calls(text, "subset", &mut |args| render_subset(args, ctx)))
    }
}

#[derive(Debug, Default)]
struct SubsetCall<'a> {
    frame: &'a str,
    condition: Option<&'a str>,
    select: Option<&'a str>,
}

fn parse_subset(args: &str) -> Option<SubsetCall<'_>> {
    let parts = split_args(args)?;
    let (&frame, rest) = parts.split_first()?;
    if keyword_arg(frame).is_some() || frame.is_empty() {
        return None;
    }
    let mut call = SubsetCall {
        frame,
        ..SubsetCall::default()
    };
    for &part in rest {
        match keyword_arg(part) {
            Some(("subset", value)) => call.condition = Some(value),
            Some(("select", value)) => call.select = Some(value),
            Some(_) => return None,
            None if call.condition.is_none() => call.condition = Some(part),
            None if call.select.is_none() => call.select = Some(part),
            None => return None,
        }
    }
    Some(call)
}

fn render_subset(args: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
    let Some(call) = parse_subset(args) else {
        ctx.diagnostics.warn(
            ctx.line,
            DiagnosticKind::UnrecognizedConstruct,
            format!("subset({args}) has unsupported arguments; passed through"),
        );
        return None;
    };
    let frame = as_receiver(call.frame);

    let selection = match call.select {
        Some(select) => match parse_selection(select, ctx) {
            Some(selection) => Some(selection),
            None => {
                ctx.diagnostics.warn(
                    ctx.line,
                    DiagnosticKind::UnrecognizedConstruct,
                    format!("column selection {select} not translated; subset passed through"),
                );
                return None;
            }
        },
        None => None,
    };
    let condition = call.condition.map(|cond| {
        let (qualified, names) = qualify_columns(cond, &frame);
        report_assigned_names(&names, &frame, ctx);
        guard_comparisons(&qualified)
    });

    let rendered = match (condition, selection) {
        (None, None) => frame,
        (Some(cond), None) => format!("{frame}[{cond}]"),
        (Some(cond), Some(Selection::Keep(cols))) => format!("{frame}.loc[{cond}, [{cols}]]"),
        (Some(cond), Some(Selection::Drop(cols))) => {
            format!("{frame}[{cond}].drop(columns=[{cols}])")
        }
        (None, Some(Selection::Keep(cols))) => format!("{frame}[[{cols}]]"),
        (None, Some(Selection::Drop(cols))) => format!("{frame}.drop(columns=[{cols}])"),
    };
    Some(rendered)
}

/// Rendered column list of a `select =` argument
enum Selection {
    Keep(String),
    Drop(String),
}

fn parse_selection(select: &str, ctx: &mut RewriteContext<'_>) -> Option<Selection> {
    let select = select.trim();
    let (negated, body) = match select.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, select),
    };
    let items = match find_call(body, "c", 0) {
        Some(site) if site.start == 0 && site.close == Some(body.len() - 1) => {
            split_args(&body[site.open + 1..body.len() - 1])?
        }
        _ => vec![body],
    };

    let mut columns = Vec::with_capacity(items.len());
    for item in items {
        if is_identifier(item) && !is_reserved(item) {
            columns.push(format!("\"{}\"", normalize_identifier(item)));
        } else if let Some(index) = parse_placeholder(item) {
            if ctx.config.normalize_literal_column_strings {
                ctx.shield.normalize_column_literal(index);
            }
            columns.push(item.to_owned());
        } else {
            return None;
        }
    }
    let columns = columns.join(", ");
    Some(if negated {
        Selection::Drop(columns)
    } else {
        Selection::Keep(columns)
    })
}

/// Qualify the bare names of a subset condition as columns of `frame`
///
/// Also returns the names that were qualified, in order.
fn qualify_columns<'c>(cond: &'c str, frame: &str) -> (String, Vec<&'c str>) {
    let bytes = cond.as_bytes();
    let mut out = String::with_capacity(cond.len() + 16);
    let mut cursor = 0;
    let mut qualified = Vec::new();

    for token in identifiers(cond) {
        let word = &cond[token.start..token.end];
        if is_reserved(word)
            || MODULE_PREFIXES.iter().any(|prefix| word.starts_with(prefix))
            || inside_quotes(cond, token.start)
        {
            continue;
        }
        let prev = token.start.checked_sub(1).map(|p| bytes[p]);
        if prev.is_some_and(|b| {
            matches!(b, b'"' | b'$' | b'%' | b']' | b')' | b':') || b == PLACEHOLDER_MARK as u8
        }) {
            continue;
        }
        match next_non_space(cond, token.end) {
            Some(b'(' | b'[') => continue,
            Some(b'=') if cond[token.end..].trim_start().as_bytes().get(1) != Some(&b'=') => {
                continue;
            }
            _ => {}
        }
        out.push_str(&cond[cursor..token.start]);
        out.push_str(&format!("{frame}[\"{}\"]", normalize_identifier(word)));
        qualified.push(word);
        cursor = token.end;
    }

    out.push_str(&cond[cursor..]);
    (out, qualified)
}

/// Warn for qualified names that earlier lines assigned as variables
fn report_assigned_names(names: &[&str], frame: &str, ctx: &mut RewriteContext<'_>) {
    let mut reported = FxIndexSet::default();
    for &name in names {
        let column = normalize_identifier(name);
        if !ctx.assigned.contains(&column) || !reported.insert(name) {
            continue;
        }
        ctx.diagnostics.warn(
            ctx.line,
            DiagnosticKind::AmbiguousColumn,
            format!("`{name}` is assigned earlier but was read as column {frame}[\"{column}\"]"),
        );
    }
}

/// Whether `pos` lies inside a `"..."` column label written by an earlier rule
fn inside_quotes(text: &str, pos: usize) -> bool {
    text.as_bytes()[..pos].iter().filter(|&&b| b == b'"').count() % 2 == 1
}

/// Parenthesize comparisons that are operands of a top-level `&` or `|`
///
/// pandas gives `&` and `|` higher precedence than comparisons, so
/// `a > 1 & b < 2` must read `(a > 1) & (b < 2)`. Parenthesized groups are
/// processed recursively; whitespace is preserved.
pub fn guard_comparisons(cond: &str) -> String {
    let Some((pieces, separators)) = split_logical(cond) else {
        return cond.to_owned();
    };
    let wrap = pieces.len() > 1;

    let mut out = String::with_capacity(cond.len() + 8);
    for (idx, piece) in pieces.iter().enumerate() {
        out.push_str(&guard_piece(piece, wrap));
        if let Some(separator) = separators.get(idx) {
            out.push_str(separator);
        }
    }
    out
}

fn guard_piece(piece: &str, wrap: bool) -> String {
    let trimmed = piece.trim();
    if trimmed.is_empty() {
        return piece.to_owned();
    }
    let lead = &piece[..piece.len() - piece.trim_start().len()];
    let trail = &piece[piece.trim_end().len()..];

    if trimmed.starts_with('(') && matching_close(trimmed, 0) == Some(trimmed.len() - 1) {
        let inner = guard_comparisons(&trimmed[1..trimmed.len() - 1]);
        return format!("{lead}({inner}){trail}");
    }
    if wrap && has_top_level_comparison(trimmed) {
        return format!("{lead}({trimmed}){trail}");
    }
    piece.to_owned()
}

/// Split at top-level `&`, `&&`, `|` and `||`
fn split_logical(text: &str) -> Option<(Vec<&str>, Vec<&str>)> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut separators = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        match bytes[idx] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.checked_sub(1)?,
            op @ (b'&' | b'|') if depth == 0 => {
                let end = if bytes.get(idx + 1) == Some(&op) { idx + 2 } else { idx + 1 };
                pieces.push(&text[start..idx]);
                separators.push(&text[idx..end]);
                start = end;
                idx = end;
                continue;
            }
            _ => {}
        }
        idx += 1;
    }
    pieces.push(&text[start..]);
    Some((pieces, separators))
}

fn has_top_level_comparison(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (idx, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'<' | b'>' if depth == 0 => return true,
            b'=' | b'!' if depth == 0 && bytes.get(idx + 1) == Some(&b'=') => return true,
            _ => {}
        }
    }
    false
}

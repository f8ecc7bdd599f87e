//! Column access and column-name rules

use once_cell::sync::Lazy;
use regex::Regex;

use super::{RewriteContext, RewriteRule};
use crate::{
    identifier::normalize_identifier,
    literal_shield::{parse_placeholder, placeholder_indices},
    scanner::{
        as_receiver, is_ident_byte, is_ident_start, keyword_arg, matching_close, replace_calls,
        split_args,
    },
};

static NAMES_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)(?:names|colnames)\s*\(\s*([A-Za-z_.][\w.]*)\s*\)\s*=([^=].*)$")
        .expect("names assignment regex")
});

/// `df$col.name` becomes `df["col_name"]` and `df[["x"]]` becomes `df["x"]`
///
/// Precondition: runs before every rule that recognises vectorized operands.
/// Backquoted names are kept verbatim.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAccess;

impl RewriteRule for ColumnAccess {
    fn name(&self) -> &'static str {
        "column-access"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        if !text.contains('$') && !text.contains("[[") {
            return None;
        }
        let rewritten = rewrite_dollar_access(text);
        Some(rewrite_double_brackets(&rewritten, ctx))
    }
}

fn rewrite_dollar_access(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut cursor = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] != b'$' {
            idx += 1;
            continue;
        }
        let attached = idx
            .checked_sub(1)
            .is_some_and(|p| is_ident_byte(bytes[p]) || matches!(bytes[p], b']' | b')'));
        let Some((column, end)) = attached.then(|| column_after(text, idx + 1)).flatten() else {
            idx += 1;
            continue;
        };
        out.push_str(&text[cursor..idx]);
        out.push_str(&format!("[\"{column}\"]"));
        cursor = end;
        idx = end;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Column name following a `$` at `start`, with the index just past it
fn column_after(text: &str, start: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    match *bytes.get(start)? {
        b'`' => {
            let close = start + 1 + text[start + 1..].find('`')?;
            Some((text[start + 1..close].to_owned(), close + 1))
        }
        b if is_ident_start(b) => {
            let end = bytes[start..]
                .iter()
                .position(|&b| !is_ident_byte(b))
                .map_or(bytes.len(), |len| start + len);
            Some((normalize_identifier(&text[start..end]), end))
        }
        _ => None,
    }
}

fn rewrite_double_brackets(text: &str, ctx: &mut RewriteContext<'_>) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut search = 0;

    while let Some(rel) = text[search..].find("[[") {
        let open = search + rel;
        search = open + 1;
        if open < cursor {
            continue;
        }
        let attached = open
            .checked_sub(1)
            .is_some_and(|p| is_ident_byte(bytes[p]) || matches!(bytes[p], b']' | b')'));
        if !attached {
            continue;
        }
        let (Some(close), Some(inner_close)) =
            (matching_close(text, open), matching_close(text, open + 1))
        else {
            continue;
        };
        if inner_close + 1 != close {
            continue;
        }

        let inner = rewrite_double_brackets(&text[open + 2..inner_close], ctx);
        if ctx.config.normalize_literal_column_strings {
            if let Some(index) = parse_placeholder(inner.trim()) {
                ctx.shield.normalize_column_literal(index);
            }
        }
        out.push_str(&text[cursor..open]);
        out.push('[');
        out.push_str(&inner);
        out.push(']');
        cursor = close + 1;
        search = cursor;
    }

    out.push_str(&text[cursor..]);
    out
}

/// `names(x) = rhs` becomes `x.columns = rhs`
///
/// Precondition: `assignment` has turned `<-` into `=`. The target name is
/// normalized.
#[derive(Debug, Clone, Copy)]
pub struct NamesAssignment;

impl RewriteRule for NamesAssignment {
    fn name(&self) -> &'static str {
        "names-assignment"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        let caps = NAMES_ASSIGNMENT.captures(text)?;
        let indent = &caps[1];
        let target = normalize_identifier(&caps[2]);
        let rhs = caps[3].trim();

        if ctx.config.normalize_literal_column_strings {
            for index in placeholder_indices(rhs) {
                ctx.shield.normalize_column_literal(index);
            }
        }
        Some(format!("{indent}{target}.columns = {rhs}"))
    }
}

/// Remaining `names(x)` and `colnames(x)` reads become `list(x.columns)`
///
/// Precondition: `names-assignment` and `vector-literal` have consumed the
/// forms they own.
#[derive(Debug, Clone, Copy)]
pub struct ColumnNames;

impl RewriteRule for ColumnNames {
    fn name(&self) -> &'static str {
        "column-names"
    }

    fn apply(&self, text: &str, _ctx: &mut RewriteContext<'_>) -> Option<String> {
        if !text.contains("names") {
            return None;
        }
        let mut render = |args: &str| {
            let args = split_args(args)?;
            match args.as_slice() {
                [frame] if keyword_arg(frame).is_none() => {
                    Some(format!("list({}.columns)", as_receiver(frame)))
                }
                _ => None,
            }
        };
        let text = replace_calls(text, "colnames", &mut render);
        Some(replace_calls(&text, "names", &mut render))
    }
}

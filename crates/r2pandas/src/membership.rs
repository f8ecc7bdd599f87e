//! Membership disambiguation
//!
//! R's `%in%` is element-wise on vectors but reads as a plain containment
//! test on scalars. The left operand's [`OperandShape`] picks the rendering:
//! `x.isin(y)` for element-wise operands and `x in y` otherwise. Operands of
//! unknown shape get the scalar form and a diagnostic.

use crate::{
    diagnostics::DiagnosticKind,
    operand::{OperandShape, classify_operand},
    rewrite::{RewriteContext, RewriteRule},
    scanner::{
        as_receiver, is_ident_byte, next_non_space, operand_end, operand_start, prev_non_space,
    },
};

/// Membership operators and whether they are negated
const OPERATORS: &[(&str, bool)] = &[("%in%", false), ("%notin%", true), ("%!in%", true)];

/// A located membership test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MembershipSite {
    /// Start of the rewritten span, including a leading `!`
    start: usize,
    /// Start of the left operand
    left: usize,
    op_start: usize,
    op_end: usize,
    /// End (exclusive) of the right operand
    end: usize,
    negated: bool,
}

/// `x %in% y`, `x %notin% y`, `x %!in% y` and `!x %in% y`
///
/// Precondition: operands are fully rewritten, so vectorized operands read
/// `df["col"]` and vector literals read `[...]`.
#[derive(Debug, Clone, Copy)]
pub struct Membership;

impl RewriteRule for Membership {
    fn name(&self) -> &'static str {
        "membership"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        if !OPERATORS.iter().any(|(op, _)| text.contains(op)) {
            return None;
        }

        let mut text = text.to_owned();
        let mut search = 0;
        while let Some(site) = find_site(&text, search) {
            let left = text[site.left..site.op_start].trim();
            let right = text[site.op_end..site.end].trim();

            let shape = classify_operand(left, ctx.shield);
            if shape == OperandShape::Unknown {
                ctx.diagnostics.warn(
                    ctx.line,
                    DiagnosticKind::AmbiguousMembership,
                    format!("cannot tell whether `{left}` is a column; rendered as a scalar test"),
                );
            }
            let rendered = match (shape, site.negated) {
                (OperandShape::Vectorized, false) => format!("{}.isin({right})", as_receiver(left)),
                (OperandShape::Vectorized, true) => format!("~{}.isin({right})", as_receiver(left)),
                (_, negated) => {
                    let op = if negated { "not in" } else { "in" };
                    let test = format!("{left} {op} {right}");
                    if needs_parens(&text, site.start, site.end) {
                        format!("({test})")
                    } else {
                        test
                    }
                }
            };

            let lead = &text[site.start..site.left];
            let lead = if lead.starts_with('!') { "" } else { lead };
            let mut replaced = String::with_capacity(text.len() + rendered.len());
            replaced.push_str(&text[..site.start]);
            replaced.push_str(lead);
            replaced.push_str(&rendered);
            search = replaced.len();
            replaced.push_str(&text[site.end..]);
            text = replaced;
        }
        Some(text)
    }
}

/// Find the next membership test whose operator starts at or after `from`
fn find_site(text: &str, from: usize) -> Option<MembershipSite> {
    let bytes = text.as_bytes();
    let mut search = from;
    loop {
        let (op_start, op, negated_op) = OPERATORS
            .iter()
            .filter_map(|&(op, negated)| {
                text.get(search..)?
                    .find(op)
                    .map(|rel| (search + rel, op, negated))
            })
            .min_by_key(|(pos, _, _)| *pos)?;
        let op_end = op_start + op.len();

        let left = operand_start(text, op_start);
        let end = operand_end(text, op_end);
        let missing_operand = left == op_start
            || text[left..op_start].trim().is_empty()
            || text[op_end..end].trim().is_empty();
        if missing_operand {
            search = op_end;
            continue;
        }

        let mut start = left;
        let mut negated = negated_op;
        let mut bang = left;
        while bang > 0 && bytes[bang - 1] == b' ' {
            bang -= 1;
        }
        if bang > 0 && bytes[bang - 1] == b'!' {
            start = bang - 1;
            negated = !negated;
        }

        return Some(MembershipSite {
            start,
            left,
            op_start,
            op_end,
            end,
            negated,
        });
    }
}

/// Whether a scalar `in` test at `start..end` binds looser than its neighbours
fn needs_parens(text: &str, start: usize, end: usize) -> bool {
    let before = prev_non_space(text, start);
    let after = next_non_space(text, end);
    let open_before = before.is_none_or(|b| matches!(b, b'(' | b'[' | b',' | b'=' | b':'));
    let close_after = after.is_none_or(|b| matches!(b, b')' | b']' | b',' | b':'));
    let keyword_before = before.is_some_and(is_ident_byte);
    !(open_before && close_after) && !(keyword_before && close_after)
}

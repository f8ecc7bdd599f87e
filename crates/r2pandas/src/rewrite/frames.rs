//! Frame- and series-level calls whose translation depends on operand shape

use super::{RewriteContext, RewriteRule};
use crate::{
    diagnostics::DiagnosticKind,
    operand::{OperandShape, classify_operand},
    scanner::{as_receiver, find_call, keyword_arg, replace_calls, split_args},
};

/// `is.na(x)` and `!is.na(x)` become `isna`/`notna` tests
///
/// Precondition: `column-access` has run so column operands classify as
/// vectorized. Runs before `logical-operators`, which would otherwise turn
/// the `!` into `not`.
#[derive(Debug, Clone, Copy)]
pub struct Missingness;

impl RewriteRule for Missingness {
    fn name(&self) -> &'static str {
        "missingness"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        find_call(text, "is.na", 0)?;
        Some(rewrite_missingness(text, ctx))
    }
}

fn rewrite_missingness(text: &str, ctx: &RewriteContext<'_>) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut cursor = 0;

    while let Some(site) = find_call(text, "is.na", cursor) {
        let Some(close) = site.close else {
            break;
        };
        let operand = rewrite_missingness(&text[site.open + 1..close], ctx);
        let operand = operand.trim();

        let mut bang = site.start;
        while bang > cursor && bytes[bang - 1] == b' ' {
            bang -= 1;
        }
        let negated = bang > cursor && bytes[bang - 1] == b'!';
        let start = if negated { bang - 1 } else { site.start };

        out.push_str(&text[cursor..start]);
        let vectorized = classify_operand(operand, ctx.shield) == OperandShape::Vectorized;
        out.push_str(&match (vectorized, negated) {
            (true, false) => format!("{}.isna()", as_receiver(operand)),
            (true, true) => format!("{}.notna()", as_receiver(operand)),
            (false, false) => format!("pd.isna({operand})"),
            (false, true) => format!("pd.notna({operand})"),
        });
        cursor = close + 1;
    }

    out.push_str(&text[cursor..]);
    out
}

/// `rbind(...)`/`cbind(...)` become `pd.concat([...], axis=0|1)`
///
/// Precondition: `vector-literal` has run. `do.call(rbind, frames)` is
/// rewritten as a concatenation of the list `frames`. Keyword arguments have
/// no `pd.concat` counterpart and are dropped with a warning.
#[derive(Debug, Clone, Copy)]
pub struct Concatenation;

impl RewriteRule for Concatenation {
    fn name(&self) -> &'static str {
        "concatenation"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        if !text.contains("bind") {
            return None;
        }
        let line = ctx.line;
        let text = replace_calls(text, "do.call", &mut |args| {
            let args = split_args(args)?;
            match args.as_slice() {
                [callee, frames] => {
                    let axis = bind_axis(callee.trim())?;
                    Some(format!("pd.concat({frames}, axis={axis})"))
                }
                _ => None,
            }
        });

        let mut text = text;
        for (name, axis) in [("rbind", 0), ("cbind", 1)] {
            text = replace_calls(&text, name, &mut |args| {
                let args = split_args(args)?;
                let mut frames = Vec::with_capacity(args.len());
                for arg in args {
                    match keyword_arg(arg) {
                        Some((key, _)) => ctx.diagnostics.warn(
                            line,
                            DiagnosticKind::UnrecognizedConstruct,
                            format!("{name} argument `{key}` dropped"),
                        ),
                        None => frames.push(arg),
                    }
                }
                Some(format!("pd.concat([{}], axis={axis})", frames.join(", ")))
            });
        }
        Some(text)
    }
}

fn bind_axis(callee: &str) -> Option<u8> {
    match callee {
        "rbind" => Some(0),
        "cbind" => Some(1),
        _ => None,
    }
}

/// `unique(x)` becomes `x.unique()` for element-wise operands and
/// `pd.Series(x).unique()` otherwise
///
/// Precondition: `column-access` and `vector-literal` have run.
#[derive(Debug, Clone, Copy)]
pub struct Unique;

impl RewriteRule for Unique {
    fn name(&self) -> &'static str {
        "unique"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        find_call(text, "unique", 0)?;
        Some(replace_calls(text, "unique", &mut |args| {
            let args = split_args(args)?;
            let [operand] = args.as_slice() else {
                return None;
            };
            if keyword_arg(operand).is_some() {
                return None;
            }
            Some(match classify_operand(operand, ctx.shield) {
                OperandShape::Vectorized => format!("{}.unique()", as_receiver(operand)),
                OperandShape::Scalar | OperandShape::Unknown => {
                    format!("pd.Series({operand}).unique()")
                }
            })
        }))
    }
}

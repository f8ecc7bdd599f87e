use super::{RewriteContext, RewriteRule};
use crate::{
    diagnostics::DiagnosticKind,
    join::parse_join_call,
    literal_shield::placeholder_indices,
    scanner::{find_call, replace_calls},
};

/// `merge(x, y, ...)` becomes `pd.merge(...)`
///
/// Precondition: `keyword-literals` and `vector-literal` have run, so flags
/// read `True`/`False` and multi-column keys are Python lists. Calls that
/// cannot be parsed are left untouched and reported.
#[derive(Debug, Clone, Copy)]
pub struct MergeCall;

impl RewriteRule for MergeCall {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        let site = find_call(text, "merge", 0)?;
        if site.close.is_none() {
            ctx.diagnostics.warn(
                ctx.line,
                DiagnosticKind::JoinParse,
                "unbalanced merge(...) call left untouched",
            );
            return None;
        }

        let line = ctx.line;
        Some(replace_calls(text, "merge", &mut |args| {
            let spec = match parse_join_call(args) {
                Ok(spec) => spec,
                Err(err) => {
                    ctx.diagnostics.warn(
                        line,
                        DiagnosticKind::JoinParse,
                        format!("{err}; merge call left untouched"),
                    );
                    return None;
                }
            };

            if spec.keys.has_conflict() {
                ctx.diagnostics.warn(
                    line,
                    DiagnosticKind::JoinParse,
                    "both `by` and `by.x`/`by.y` given; using `by.x`/`by.y`",
                );
            }
            if spec.keys.is_one_sided() {
                ctx.diagnostics.warn(
                    line,
                    DiagnosticKind::JoinParse,
                    "only one of `by.x`/`by.y` given; emitted as written",
                );
            }
            for key in spec.unrecognized_keys() {
                ctx.diagnostics.warn(
                    line,
                    DiagnosticKind::UnrecognizedJoinKey,
                    format!("merge argument `{key}` passed through unchanged"),
                );
            }

            if ctx.config.normalize_literal_column_strings {
                let key_values = [&spec.keys.by, &spec.keys.by_left, &spec.keys.by_right];
                for value in key_values.into_iter().flatten() {
                    for index in placeholder_indices(value) {
                        ctx.shield.normalize_column_literal(index);
                    }
                }
            }
            Some(spec.render())
        }))
    }
}

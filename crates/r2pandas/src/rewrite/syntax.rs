//! Token-level syntax rules: assignment arrows, keyword literals, logical
//! operators, and the final residual-construct report.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{RewriteContext, RewriteRule};
use crate::{
    diagnostics::DiagnosticKind,
    operand::{OperandShape, classify_operand},
    scanner::{is_ident_byte, operand_end, prev_non_space},
};

static KEYWORD_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(NA_integer_|NA_real_|NA_character_|TRUE|FALSE|NULL|NA|Inf|NaN)\b")
        .expect("keyword literal regex")
});
static AND_AND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*&&\s*").expect("&& regex"));
static OR_OR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\|\|\s*").expect("|| regex"));
static PIPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"%>%|\|>").expect("pipe regex"));
static INFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[^%\s]*%").expect("infix regex"));
static FUNCTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfunction\s*\(").expect("function regex"));
static NAMED_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[A-Za-z_.][\w.]*\s*=\s*function\s*\(").expect("named function regex")
});
static APPLY_FAMILY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(lapply|sapply|vapply|mapply|tapply|apply|tryCatch)\s*\(").expect("apply regex")
});

/// `<-` and `<<-` become `=`
///
/// Precondition: none.
#[derive(Debug, Clone, Copy)]
pub struct Assignment;

impl RewriteRule for Assignment {
    fn name(&self) -> &'static str {
        "assignment"
    }

    fn apply(&self, text: &str, _ctx: &mut RewriteContext<'_>) -> Option<String> {
        if !text.contains("<-") {
            return None;
        }
        Some(text.replace("<<-", "=").replace("<-", "="))
    }
}

/// R keyword constants become their Python spellings
///
/// Precondition: none. Names reached through `.` or `$` are left alone.
#[derive(Debug, Clone, Copy)]
pub struct KeywordLiterals;

impl RewriteRule for KeywordLiterals {
    fn name(&self) -> &'static str {
        "keyword-literals"
    }

    fn apply(&self, text: &str, _ctx: &mut RewriteContext<'_>) -> Option<String> {
        let bytes = text.as_bytes();
        let rewritten = KEYWORD_LITERAL.replace_all(text, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let start = caps.get(0).map_or(0, |m| m.start());
            let end = caps.get(0).map_or(0, |m| m.end());
            let attached = start.checked_sub(1).is_some_and(|p| matches!(bytes[p], b'.' | b'$'))
                || bytes.get(end) == Some(&b'.');
            if attached {
                return whole.to_owned();
            }
            match whole {
                "TRUE" => "True",
                "FALSE" => "False",
                "Inf" => "np.inf",
                "NaN" => "np.nan",
                _ => "None",
            }
            .to_owned()
        });
        Some(rewritten.into_owned())
    }
}

/// `&&`/`||` become `and`/`or`; `!` becomes `~` before an element-wise
/// operand and `not` otherwise
///
/// Precondition: `missingness` and `membership` have consumed the `!` forms
/// they own, and column access is already in `df["col"]` form.
#[derive(Debug, Clone, Copy)]
pub struct LogicalOperators;

impl RewriteRule for LogicalOperators {
    fn name(&self) -> &'static str {
        "logical-operators"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        let text = AND_AND.replace_all(text, " and ");
        let text = OR_OR.replace_all(&text, " or ");

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len() + 8);
        let mut cursor = 0;
        for (idx, &b) in bytes.iter().enumerate() {
            if b != b'!' || idx < cursor || bytes.get(idx + 1) == Some(&b'=') {
                continue;
            }
            let mut operand_start = idx + 1;
            while bytes.get(operand_start) == Some(&b' ') {
                operand_start += 1;
            }
            let end = operand_end(&text, operand_start);
            let shape = classify_operand(&text[operand_start..end], ctx.shield);
            out.push_str(&text[cursor..idx]);
            if shape == OperandShape::Vectorized {
                out.push('~');
            } else {
                out.push_str("not ");
            }
            cursor = operand_start;
        }
        out.push_str(&text[cursor..]);
        Some(out)
    }
}

/// Reports constructs that have no translation; never rewrites
///
/// Precondition: every translating rule has run.
#[derive(Debug, Clone, Copy)]
pub struct ResidualConstructs;

impl RewriteRule for ResidualConstructs {
    fn name(&self) -> &'static str {
        "residual-constructs"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        let mut report = |message: &str| {
            ctx.diagnostics
                .warn(ctx.line, DiagnosticKind::UnrecognizedConstruct, message);
        };

        if PIPE.is_match(text) {
            report("piped verb chain passed through untranslated");
        } else if let Some(op) = INFIX.find(text) {
            report(&format!("infix operator {} passed through untranslated", op.as_str()));
        }
        if text.contains('$') {
            report("unresolved `$` access passed through untranslated");
        }
        if FUNCTION.is_match(text) && !NAMED_FUNCTION.is_match(text) {
            report("anonymous function passed through untranslated");
        }
        if let Some(caps) = APPLY_FAMILY.captures(text) {
            report(&format!("`{}` call passed through untranslated", &caps[1]));
        }
        if let Some(pos) = text.find('~') {
            let binary = prev_non_space(text, pos)
                .is_some_and(|b| is_ident_byte(b) || matches!(b, b')' | b']'));
            if binary {
                report("model formula passed through untranslated");
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{diagnostics::DiagnosticKind, rewrite::test_support::run_rule};

    #[test]
    fn test_assignment_arrows() {
        assert_eq!(run_rule(&Assignment, "x <- 1").0, "x = 1");
        assert_eq!(run_rule(&Assignment, "total <<- total + 1").0, "total = total + 1");
        assert_eq!(run_rule(&Assignment, r#"s <- "a <- b""#).0, r#"s = "a <- b""#);
    }

    #[test]
    fn test_keyword_literals() {
        assert_eq!(
            run_rule(&KeywordLiterals, "flags = c(TRUE, FALSE, NA, NULL)").0,
            "flags = c(True, False, None, None)"
        );
        assert_eq!(run_rule(&KeywordLiterals, "x = -Inf").0, "x = -np.inf");
        assert_eq!(run_rule(&KeywordLiterals, "y = NA_real_").0, "y = None");
        assert_eq!(run_rule(&KeywordLiterals, "df$NA").0, "df$NA");
        assert_eq!(run_rule(&KeywordLiterals, "TRUEISH = 1").0, "TRUEISH = 1");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(run_rule(&LogicalOperators, "if (a && !b) x").0, "if (a and not b) x");
        assert_eq!(run_rule(&LogicalOperators, "a||b").0, "a or b");
        assert_eq!(run_rule(&LogicalOperators, r#"df[!df["keep"]]"#).0, r#"df[~df["keep"]]"#);
        assert_eq!(run_rule(&LogicalOperators, "x != y").0, "x != y");
    }

    #[test]
    fn test_residual_constructs_are_reported() {
        let (out, diagnostics) = run_rule(&ResidualConstructs, "df %>% filter(x > 1)");
        assert_eq!(out, "df %>% filter(x > 1)");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnrecognizedConstruct);

        let (_, diagnostics) = run_rule(&ResidualConstructs, "fit = lm(y ~ x, data = d)");
        assert_eq!(diagnostics.len(), 1);

        let (_, diagnostics) = run_rule(&ResidualConstructs, "f = function(x) {");
        assert!(diagnostics.is_empty());

        let (_, diagnostics) = run_rule(&ResidualConstructs, r#"msg = "100% done $5""#);
        assert!(diagnostics.is_empty());
    }
}

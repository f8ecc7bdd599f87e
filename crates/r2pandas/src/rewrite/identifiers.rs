use super::{RewriteContext, RewriteRule};
use crate::{
    identifier::{is_reserved, normalize_identifier},
    scanner::{identifiers, next_non_space},
};

/// Normalizes every bare identifier on the line
///
/// Only installed when `aggressive_identifier_normalization` is on.
/// Precondition: runs first, on raw shielded R text. Callees, keyword
/// argument names, reserved words, `%op%` names and `pkg::name` parts are
/// left alone so later rules still recognise them.
#[derive(Debug, Clone, Copy)]
pub struct AggressiveIdentifiers;

impl RewriteRule for AggressiveIdentifiers {
    fn name(&self) -> &'static str {
        "aggressive-identifiers"
    }

    fn apply(&self, text: &str, _ctx: &mut RewriteContext<'_>) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut changed = false;

        for token in identifiers(text) {
            let word = &text[token.start..token.end];
            if is_reserved(word) || !should_normalize(text, token.start, token.end) {
                continue;
            }
            let normalized = normalize_identifier(word);
            if normalized == word {
                continue;
            }
            out.push_str(&text[cursor..token.start]);
            out.push_str(&normalized);
            cursor = token.end;
            changed = true;
        }

        if !changed {
            return None;
        }
        out.push_str(&text[cursor..]);
        Some(out)
    }
}

fn should_normalize(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let prev = start.checked_sub(1).map(|p| bytes[p]);
    if matches!(prev, Some(b'%' | b':')) || text[end..].starts_with(['%', ':']) {
        return false;
    }
    match next_non_space(text, end) {
        Some(b'(') => false,
        Some(b'=') => {
            let depth = bytes[..start]
                .iter()
                .fold(0i32, |depth, b| match b {
                    b'(' => depth + 1,
                    b')' => depth - 1,
                    _ => depth,
                });
            let after_eq = text[end..].trim_start().as_bytes().get(1).copied();
            depth <= 0 || after_eq == Some(b'=')
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rewrite::test_support::run_rule;

    #[test]
    fn test_bare_identifiers_are_normalized() {
        assert_eq!(
            run_rule(&AggressiveIdentifiers, "myData <- read.csv(inputPath)").0,
            "my_data <- read.csv(input_path)"
        );
    }

    #[test]
    fn test_calls_keywords_and_literals_are_kept() {
        assert_eq!(
            run_rule(&AggressiveIdentifiers, r#"meanVal <- mean(x, na.rm = TRUE) # keepThis"#).0,
            "mean_val <- mean(x, na.rm = TRUE) # keepThis"
        );
        assert_eq!(
            run_rule(&AggressiveIdentifiers, "ok <- a %in% b; dplyr::filter(d)").0,
            "ok <- a %in% b; dplyr::filter(d)"
        );
    }

    #[test]
    fn test_column_names_after_dollar_are_normalized() {
        assert_eq!(run_rule(&AggressiveIdentifiers, "x <- myDF$colA").0, "x <- my_df$col_a");
    }
}

//! Join call parsing
//!
//! `merge(x, y, ...)` is parsed into a [`JoinCallSpec`] and rendered as a
//! `pd.merge(...)` call. Arguments are split at top-level commas, so operands
//! may themselves contain calls and indexing.

use std::fmt;

use crate::scanner::{keyword_arg, split_args};

/// Keyword arguments that `pd.merge` accepts under the same name
pub const SILENT_PASS_THROUGH: &[&str] = &["suffixes", "sort"];

/// Kind of join derived from the `all*` flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    /// The `how=` value for `pd.merge`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key and inclusion arguments of a join call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinKeys {
    /// `by`
    pub by: Option<String>,
    /// `by.x`
    pub by_left: Option<String>,
    /// `by.y`
    pub by_right: Option<String>,
    /// `all.x`
    pub include_left_unmatched: Option<bool>,
    /// `all.y`
    pub include_right_unmatched: Option<bool>,
    /// `all`
    pub include_all: Option<bool>,
}

impl JoinKeys {
    /// Derive the join kind; the first matching rule wins
    pub fn kind(&self) -> JoinKind {
        if self.include_all == Some(true) {
            return JoinKind::Outer;
        }
        match (
            self.include_left_unmatched == Some(true),
            self.include_right_unmatched == Some(true),
        ) {
            (true, false) => JoinKind::Left,
            (false, true) => JoinKind::Right,
            (true, true) => JoinKind::Outer,
            (false, false) => JoinKind::Inner,
        }
    }

    /// Both `by` and one of `by.x`/`by.y` were given
    pub fn has_conflict(&self) -> bool {
        self.by.is_some() && (self.by_left.is_some() || self.by_right.is_some())
    }

    /// Exactly one of `by.x`/`by.y` was given
    pub fn is_one_sided(&self) -> bool {
        self.by_left.is_some() != self.by_right.is_some()
    }

    /// Key columns as `pd.merge` keyword arguments, in emission order
    ///
    /// The dual-key form wins over `by` when both are present.
    pub fn key_arguments(&self) -> Vec<(&'static str, &str)> {
        if self.by_left.is_some() || self.by_right.is_some() {
            let mut args = Vec::with_capacity(2);
            if let Some(left) = &self.by_left {
                args.push(("left_on", left.as_str()));
            }
            if let Some(right) = &self.by_right {
                args.push(("right_on", right.as_str()));
            }
            args
        } else {
            self.by
                .as_deref()
                .map(|by| vec![("on", by)])
                .unwrap_or_default()
        }
    }
}

/// A parsed `merge(...)` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCallSpec {
    pub left: String,
    pub right: String,
    pub keys: JoinKeys,
    /// Keyword arguments passed through unchanged, in source order
    pub extra: Vec<(String, String)>,
}

impl JoinCallSpec {
    /// Render as a `pd.merge(...)` call
    pub fn render(&self) -> String {
        let mut args = vec![self.left.clone(), self.right.clone()];
        args.extend(
            self.keys
                .key_arguments()
                .into_iter()
                .map(|(key, value)| format!("{key}={value}")),
        );
        args.push(format!("how=\"{}\"", self.keys.kind()));
        args.extend(self.extra.iter().map(|(key, value)| format!("{key}={value}")));
        format!("pd.merge({})", args.join(", "))
    }

    /// Pass-through keywords that `pd.merge` does not know
    pub fn unrecognized_keys(&self) -> impl Iterator<Item = &str> {
        self.extra
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| !SILENT_PASS_THROUGH.contains(key))
    }
}

/// Why a join call could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinParseError {
    /// Brackets in the argument list do not balance
    Unbalanced,
    /// Fewer than two operands
    MissingOperand,
    /// A positional argument after `x`, `y` and `by`
    ExtraPositional(String),
    /// An `all*` flag whose value is not a boolean literal
    InvalidFlag { key: String, value: String },
}

impl fmt::Display for JoinParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbalanced => write!(f, "unbalanced brackets in merge arguments"),
            Self::MissingOperand => write!(f, "merge needs two frames"),
            Self::ExtraPositional(arg) => write!(f, "unexpected positional argument `{arg}`"),
            Self::InvalidFlag { key, value } => {
                write!(f, "`{key}` expects TRUE or FALSE, found `{value}`")
            }
        }
    }
}

impl std::error::Error for JoinParseError {}

fn parse_flag(key: &str, value: &str) -> Result<bool, JoinParseError> {
    match value.trim() {
        "True" | "TRUE" | "T" => Ok(true),
        "False" | "FALSE" | "F" => Ok(false),
        other => Err(JoinParseError::InvalidFlag {
            key: key.to_owned(),
            value: other.to_owned(),
        }),
    }
}

/// Parse the argument text of a `merge(...)` call
pub fn parse_join_call(args: &str) -> Result<JoinCallSpec, JoinParseError> {
    let args = split_args(args).ok_or(JoinParseError::Unbalanced)?;

    let mut left = None;
    let mut right = None;
    let mut keys = JoinKeys::default();
    let mut extra = Vec::new();
    let mut positional = Vec::new();

    for arg in args {
        let Some((key, value)) = keyword_arg(arg) else {
            positional.push(arg);
            continue;
        };
        let value_owned = value.to_owned();
        match key {
            "x" => left = Some(value_owned),
            "y" => right = Some(value_owned),
            "by" => keys.by = Some(value_owned),
            "by.x" => keys.by_left = Some(value_owned),
            "by.y" => keys.by_right = Some(value_owned),
            "all" => keys.include_all = Some(parse_flag(key, value)?),
            "all.x" => keys.include_left_unmatched = Some(parse_flag(key, value)?),
            "all.y" => keys.include_right_unmatched = Some(parse_flag(key, value)?),
            _ => extra.push((key.to_owned(), value_owned)),
        }
    }

    for arg in positional {
        if left.is_none() {
            left = Some(arg.to_owned());
        } else if right.is_none() {
            right = Some(arg.to_owned());
        } else if keys.by.is_none() {
            keys.by = Some(arg.to_owned());
        } else {
            return Err(JoinParseError::ExtraPositional(arg.to_owned()));
        }
    }

    match (left, right) {
        (Some(left), Some(right)) => Ok(JoinCallSpec {
            left,
            right,
            keys,
            extra,
        }),
        _ => Err(JoinParseError::MissingOperand),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn render(args: &str) -> String {
        parse_join_call(args).map(|spec| spec.render()).unwrap()
    }

    #[test]
    fn test_join_kind_precedence() {
        let kind = |all: Option<bool>, x: Option<bool>, y: Option<bool>| {
            JoinKeys {
                include_all: all,
                include_left_unmatched: x,
                include_right_unmatched: y,
                ..JoinKeys::default()
            }
            .kind()
        };
        assert_eq!(kind(Some(true), Some(false), Some(false)), JoinKind::Outer);
        assert_eq!(kind(None, Some(true), None), JoinKind::Left);
        assert_eq!(kind(None, None, Some(true)), JoinKind::Right);
        assert_eq!(kind(Some(false), Some(true), Some(true)), JoinKind::Outer);
        assert_eq!(kind(None, Some(false), None), JoinKind::Inner);
        assert_eq!(kind(None, None, None), JoinKind::Inner);
    }

    #[test]
    fn test_dual_keys_and_outer() {
        assert_eq!(
            render(r#"x, y, by.x="a", by.y="b", all=True"#),
            r#"pd.merge(x, y, left_on="a", right_on="b", how="outer")"#
        );
    }

    #[test]
    fn test_single_key_and_positional_by() {
        assert_eq!(
            render(r#"orders, customers, by = "id", all.x = TRUE"#),
            r#"pd.merge(orders, customers, on="id", how="left")"#
        );
        assert_eq!(
            render(r#"a, b, "id""#),
            r#"pd.merge(a, b, on="id", how="inner")"#
        );
        assert_eq!(
            render(r#"y = b[b["k"] > 1, ], x = a, by = ["k", "j"]"#),
            r#"pd.merge(a, b[b["k"] > 1, ], on=["k", "j"], how="inner")"#
        );
    }

    #[test]
    fn test_conflicting_keys_prefer_dual_form() {
        let spec = parse_join_call(r#"x, y, by = "id", by.x = "a", by.y = "b""#).unwrap();
        assert!(spec.keys.has_conflict());
        assert_eq!(
            spec.render(),
            r#"pd.merge(x, y, left_on="a", right_on="b", how="inner")"#
        );
    }

    #[test]
    fn test_pass_through_keywords() {
        let spec = parse_join_call(r#"x, y, by = "k", suffixes = ["_l", "_r"], incomparables = None"#)
            .unwrap();
        assert_eq!(
            spec.render(),
            r#"pd.merge(x, y, on="k", how="inner", suffixes=["_l", "_r"], incomparables=None)"#
        );
        assert_eq!(spec.unrecognized_keys().collect::<Vec<_>>(), vec!["incomparables"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_join_call("x"), Err(JoinParseError::MissingOperand));
        assert_eq!(
            parse_join_call(r#"x, y, "k", extra"#),
            Err(JoinParseError::ExtraPositional("extra".to_owned()))
        );
        assert!(matches!(
            parse_join_call("x, y, all = flag"),
            Err(JoinParseError::InvalidFlag { .. })
        ));
        assert_eq!(parse_join_call("x, (y"), Err(JoinParseError::Unbalanced));
    }

    #[test]
    fn test_one_sided_key_is_kept() {
        let spec = parse_join_call(r#"x, y, by.x = "a""#).unwrap();
        assert!(spec.keys.is_one_sided());
        assert_eq!(spec.render(), r#"pd.merge(x, y, left_on="a", how="inner")"#);
    }
}

//! Base-R helpers with direct Python counterparts

use super::{RewriteContext, RewriteRule};
use crate::{
    operand::{OperandShape, classify_operand},
    scanner::{as_receiver, find_call, keyword_arg, replace_calls, split_args},
};

/// Callee names handled by [`Builtins`], in application order
const BUILTINS: &[&str] = &[
    "length",
    "nrow",
    "ncol",
    "nchar",
    "grepl",
    "grep",
    "list.files",
    "Sys.Date",
    "Sys.time",
    "paste0",
    "paste",
    "head",
    "tail",
    "return",
];

/// Base-R builtins with a fixed Python rendering
///
/// Precondition: `keyword-literals` has run so flags read `True`, and
/// `vector-literal` has run so arguments are already Python lists.
#[derive(Debug, Clone, Copy)]
pub struct Builtins;

impl RewriteRule for Builtins {
    fn name(&self) -> &'static str {
        "builtins"
    }

    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String> {
        if !BUILTINS.iter().any(|name| find_call(text, name, 0).is_some()) {
            return None;
        }
        let mut text = text.to_owned();
        for &name in BUILTINS {
            text = replace_calls(&text, name, &mut |args| {
                let args = split_args(args)?;
                render_builtin(name, &args, ctx)
            });
        }
        Some(text)
    }
}

fn render_builtin(name: &str, args: &[&str], ctx: &RewriteContext<'_>) -> Option<String> {
    match (name, args) {
        ("length" | "nrow" | "nchar", [x]) => Some(format!("len({x})")),
        ("ncol", [x]) => Some(format!("len({}.columns)", as_receiver(x))),
        ("grep", [pattern, values, flags @ ..]) => render_grep(pattern, values, flags),
        ("grepl", [pattern, values]) => {
            if classify_operand(values, ctx.shield) == OperandShape::Vectorized {
                Some(format!("{}.str.contains({pattern})", as_receiver(values)))
            } else {
                Some(format!("bool(re.search({pattern}, {values}))"))
            }
        }
        ("list.files", _) => render_list_files(args),
        ("Sys.Date", []) => Some("datetime.today().date()".to_owned()),
        ("Sys.time", []) => Some("datetime.now()".to_owned()),
        ("paste0", [_, ..]) => render_paste(args, Some("\"\"")),
        ("paste", [_, ..]) => render_paste(args, None),
        ("head" | "tail", [x]) => Some(format!("{}.{name}()", as_receiver(x))),
        ("head" | "tail", [x, n]) => {
            let n = keyword_arg(n).map_or(*n, |(_, value)| value);
            Some(format!("{}.{name}({n})", as_receiver(x)))
        }
        ("return", []) => Some("return".to_owned()),
        ("return", [x]) => Some(format!("return {x}")),
        _ => None,
    }
}

fn is_true(value: &str) -> bool {
    matches!(value.trim(), "True" | "TRUE" | "T")
}

fn render_grep(pattern: &str, values: &str, flags: &[&str]) -> Option<String> {
    let mut value = false;
    let mut ignore_case = false;
    for flag in flags {
        match keyword_arg(flag)? {
            ("value", v) => value = is_true(v),
            ("ignore.case", v) => ignore_case = is_true(v),
            _ => return None,
        }
    }
    let flags = if ignore_case { ", flags=re.IGNORECASE" } else { "" };
    let test = format!("re.search({pattern}, s{flags})");
    Some(if value {
        format!("[s for s in {values} if {test}]")
    } else {
        format!("[i for i, s in enumerate({values}) if {test}]")
    })
}

fn render_list_files(args: &[&str]) -> Option<String> {
    let mut path = None;
    let mut pattern = None;
    for &arg in args {
        match keyword_arg(arg) {
            Some(("path", value)) => path = Some(value),
            Some(("pattern", value)) => pattern = Some(value),
            Some(_) => return None,
            None if path.is_none() => path = Some(arg),
            None if pattern.is_none() => pattern = Some(arg),
            None => return None,
        }
    }
    let listing = format!("os.listdir({})", path.unwrap_or("\".\""));
    Some(match pattern {
        Some(pattern) => format!("[f for f in {listing} if re.search({pattern}, f)]"),
        None => listing,
    })
}

/// `paste0(...)` and `paste(..., sep = s)` become a string join
fn render_paste(args: &[&str], fixed_sep: Option<&str>) -> Option<String> {
    let mut sep = fixed_sep.unwrap_or("\" \"");
    let mut items = Vec::with_capacity(args.len());
    for &arg in args {
        match keyword_arg(arg) {
            Some(("sep", value)) if fixed_sep.is_none() => sep = value,
            Some(_) => return None,
            None => items.push(arg),
        }
    }
    Some(format!("{sep}.join(map(str, [{}]))", items.join(", ")))
}

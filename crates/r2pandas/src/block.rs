//! Block reconstruction
//!
//! Turns brace-delimited R blocks into indentation-delimited Python blocks.
//! The only state is the current depth, threaded linearly through the file:
//! leading closing braces lower it before a line is emitted and unmatched
//! opening braces raise it afterwards. Control headers (`if`, `for`, ...)
//! are rewritten into their `:`-terminated Python forms on the way.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    diagnostics::{DiagnosticKind, Diagnostics},
    identifier::normalize_identifier,
    literal_shield::parse_placeholder,
    scanner::{keyword_arg, matching_close, replace_calls, split_args},
    types::SourceLine,
};

static ELSE_IF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^else\s+if\s*\(").expect("else if regex"));
static ELSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^else\b").expect("else regex"));
static IF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^if\s*\(").expect("if regex"));
static FOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^for\s*\(").expect("for regex"));
static WHILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^while\s*\(").expect("while regex"));
static REPEAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^repeat\b").expect("repeat regex"));
static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_.][\w.]*)\s*=\s*function\s*\(").expect("function definition regex")
});
static FOR_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_.][\w.]*)\s+in\s+(.+?)\s*$").expect("for clause regex")
});
static NEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new("^next\\s*(\u{1A}\\d+\u{1A})?$").expect("next regex"));
static BRACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[{}]\s*").expect("brace regex"));

/// Current block depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndentState {
    pub depth: usize,
}

/// Brace balance of one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BraceCounts {
    /// `}` before any other token
    leading_closers: usize,
    /// Unmatched `}` after the first other token
    trailing_closers: usize,
    /// Unmatched `{`
    openers: usize,
}

fn count_braces(text: &str) -> BraceCounts {
    let mut counts = BraceCounts::default();
    let mut rest = text.trim_start();
    while let Some(after) = rest.strip_prefix('}') {
        counts.leading_closers += 1;
        rest = after.trim_start();
    }
    for b in rest.bytes() {
        match b {
            b'{' => counts.openers += 1,
            b'}' if counts.openers > 0 => counts.openers -= 1,
            b'}' => counts.trailing_closers += 1,
            _ => {}
        }
    }
    counts
}

/// A statement after control-header rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    /// A `:`-terminated header and whatever followed it on the line
    Header {
        header: String,
        rest: String,
        is_def: bool,
    },
    Plain(String),
}

/// Brace-to-indentation state machine for one file
#[derive(Debug)]
pub struct BlockReconstructor {
    state: IndentState,
    indent_width: usize,
    /// A braceless header was emitted; its body is the next statement
    single_statement: bool,
    /// Depth of a block opened with no statement in it yet
    awaiting_body: Option<usize>,
}

impl BlockReconstructor {
    pub fn new(indent_width: usize) -> Self {
        Self {
            state: IndentState::default(),
            indent_width,
            single_statement: false,
            awaiting_body: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.state.depth
    }

    /// Reconstruct one shielded line into zero or more indented lines
    pub fn reconstruct(
        &mut self,
        line: &SourceLine,
        diagnostics: &mut Diagnostics,
    ) -> Vec<SourceLine> {
        let text = line.text.trim();
        if text.is_empty() {
            return vec![line.with_text("")];
        }

        let mut emitted = Vec::with_capacity(2);
        for segment in split_before_else(text) {
            self.reconstruct_segment(line, segment.trim(), diagnostics, &mut emitted);
        }
        emitted
    }

    fn reconstruct_segment(
        &mut self,
        line: &SourceLine,
        text: &str,
        diagnostics: &mut Diagnostics,
        emitted: &mut Vec<SourceLine>,
    ) {
        let braces = count_braces(text);
        self.close(braces.leading_closers, line, diagnostics, emitted);

        let body = text.trim_start_matches(|c: char| c == '}' || c.is_whitespace());
        // A comment between a braceless header and its statement is not the body
        let braceless_body = if parse_placeholder(body).is_some() {
            self.single_statement
        } else {
            std::mem::take(&mut self.single_statement)
        };
        let depth = self.state.depth + usize::from(braceless_body);

        match render_statement(body, line.number, diagnostics) {
            Statement::Header { header, rest, is_def } => {
                self.awaiting_body = None;
                let inline_comment = parse_placeholder(&rest).is_some();
                if rest.is_empty() || inline_comment {
                    let empty_braces = braces.openers == 0 && body.contains('{');
                    let mut rendered = header;
                    if empty_braces {
                        rendered.push_str(" pass");
                    }
                    if inline_comment {
                        rendered.push(' ');
                        rendered.push_str(&rest);
                    }
                    emitted.push(self.indented(line, depth, &rendered));
                    if braces.openers > 0 {
                        self.awaiting_body = Some(depth + 1);
                    } else if !empty_braces {
                        self.single_statement = true;
                    }
                } else if braces.openers > 0 {
                    emitted.push(self.indented(line, depth, &header));
                    emitted.push(self.indented(line, depth + 1, &rest));
                } else if is_def && !rest.starts_with("return") {
                    emitted.push(self.indented(line, depth, &format!("{header} return {rest}")));
                } else {
                    emitted.push(self.indented(line, depth, &format!("{header} {rest}")));
                }
            }
            Statement::Plain(statement) => {
                let comment_only = parse_placeholder(&statement).is_some();
                if braces.openers > 0 {
                    if braceless_body && (statement.is_empty() || comment_only) {
                        // `{` on its own line under the header it opens
                        self.awaiting_body = Some(self.state.depth + 1);
                    } else {
                        diagnostics.warn(
                            line.number,
                            DiagnosticKind::UnrecognizedConstruct,
                            "opening brace without a block header; indented as a block",
                        );
                    }
                }
                if !statement.is_empty() {
                    if !comment_only {
                        self.awaiting_body = None;
                    }
                    emitted.push(self.indented(line, depth, &statement));
                }
            }
        }

        self.state.depth += braces.openers;
        self.close(braces.trailing_closers, line, diagnostics, emitted);
    }

    /// Report blocks still open at end of input
    pub fn finish(&self, diagnostics: &mut Diagnostics) {
        if self.state.depth != 0 {
            diagnostics.error(
                0,
                DiagnosticKind::BlockBalance,
                format!("{} block(s) still open at end of input", self.state.depth),
            );
        }
    }

    /// Lower the depth; a block closed before any statement gets a `pass`
    fn close(
        &mut self,
        count: usize,
        line: &SourceLine,
        diagnostics: &mut Diagnostics,
        emitted: &mut Vec<SourceLine>,
    ) {
        if count == 0 {
            return;
        }
        if count > self.state.depth {
            diagnostics.warn(
                line.number,
                DiagnosticKind::BlockBalance,
                format!(
                    "{} closing brace(s) without an open block",
                    count - self.state.depth
                ),
            );
        }
        self.state.depth = self.state.depth.saturating_sub(count);
        debug!("line {}: depth {}", line.number, self.state.depth);

        let depth = self.state.depth;
        if let Some(body_depth) = self.awaiting_body.take_if(|body| *body > depth) {
            emitted.push(self.indented(line, body_depth, "pass"));
        }
    }

    fn indented(&self, line: &SourceLine, depth: usize, text: &str) -> SourceLine {
        let indent = " ".repeat(depth * self.indent_width);
        line.with_text(format!("{indent}{text}"))
    }
}

/// Split a line before every `}` that closes a block ahead of an `else`
///
/// `if (a) { x } else { y }` becomes `if (a) { x ` and `} else { y }`, so
/// each branch is rebuilt as its own header.
fn split_before_else(text: &str) -> Vec<&str> {
    let mut segments = Vec::with_capacity(1);
    let mut start = 0;
    let mut nesting = 0usize;
    for (idx, b) in text.bytes().enumerate() {
        match b {
            b'(' | b'[' => nesting += 1,
            b')' | b']' => nesting = nesting.saturating_sub(1),
            b'}' if nesting == 0 => {
                let before = text[start..idx].trim_matches(|c: char| c == '}' || c.is_whitespace());
                if !before.is_empty() && ELSE.is_match(text[idx + 1..].trim_start()) {
                    segments.push(&text[start..idx]);
                    start = idx;
                }
            }
            _ => {}
        }
    }
    segments.push(&text[start..]);
    segments
}

fn strip_braces(text: &str) -> String {
    BRACE.replace_all(text, " ").trim().to_owned()
}

fn rewrite_simple_statement(text: &str) -> String {
    let text = strip_braces(text);
    match NEXT.captures(&text) {
        Some(caps) => match caps.get(1) {
            Some(comment) => format!("continue {}", comment.as_str()),
            None => "continue".to_owned(),
        },
        None => text,
    }
}

/// Text of the parenthesized group opening at `open`, and the remainder
fn paren_group(body: &str, open: usize) -> Option<(&str, &str)> {
    let close = matching_close(body, open)?;
    Some((body[open + 1..close].trim(), &body[close + 1..]))
}

fn render_statement(body: &str, line: usize, diagnostics: &mut Diagnostics) -> Statement {
    let body = replace_calls(body, "stop", &mut |args| {
        let args = split_args(args)?;
        let message: Vec<&str> = args
            .into_iter()
            .filter(|arg| keyword_arg(arg).is_none())
            .collect();
        Some(format!("raise Exception({})", message.join(", ")))
    });

    let header = |header: String, rest: &str| Statement::Header {
        header,
        rest: rewrite_simple_statement(rest),
        is_def: false,
    };
    let unbalanced = |diagnostics: &mut Diagnostics, what: &str| {
        diagnostics.warn(
            line,
            DiagnosticKind::UnrecognizedConstruct,
            format!("{what} header does not close on its line; left as written"),
        );
        Statement::Plain(strip_braces(&body))
    };

    if let Some(m) = ELSE_IF.find(&body) {
        return match paren_group(&body, m.end() - 1) {
            Some((cond, rest)) => header(format!("elif {cond}:"), rest),
            None => unbalanced(diagnostics, "else if"),
        };
    }
    if let Some(m) = ELSE.find(&body) {
        return header("else:".to_owned(), &body[m.end()..]);
    }
    if let Some(m) = IF.find(&body) {
        return match paren_group(&body, m.end() - 1) {
            Some((cond, rest)) => header(format!("if {cond}:"), rest),
            None => unbalanced(diagnostics, "if"),
        };
    }
    if let Some(m) = FOR.find(&body) {
        let Some((clause, rest)) = paren_group(&body, m.end() - 1) else {
            return unbalanced(diagnostics, "for");
        };
        return match FOR_CLAUSE.captures(clause) {
            Some(caps) => header(format!("for {} in {}:", &caps[1], &caps[2]), rest),
            None => unbalanced(diagnostics, "for"),
        };
    }
    if let Some(m) = WHILE.find(&body) {
        return match paren_group(&body, m.end() - 1) {
            Some((cond, rest)) => header(format!("while {cond}:"), rest),
            None => unbalanced(diagnostics, "while"),
        };
    }
    if let Some(m) = REPEAT.find(&body) {
        return header("while True:".to_owned(), &body[m.end()..]);
    }
    if let Some(caps) = FUNCTION_DEF.captures(&body) {
        let name = normalize_identifier(&caps[1]);
        let open = caps.get(0).map_or(0, |m| m.end() - 1);
        let Some((params, rest)) = paren_group(&body, open) else {
            return unbalanced(diagnostics, "function");
        };
        let Some(params) = render_params(params) else {
            return unbalanced(diagnostics, "function");
        };
        return Statement::Header {
            header: format!("def {name}({params}):"),
            rest: rewrite_simple_statement(rest),
            is_def: true,
        };
    }

    Statement::Plain(rewrite_simple_statement(&body))
}

/// Render R formals as Python parameters
fn render_params(params: &str) -> Option<String> {
    let rendered: Vec<String> = split_args(params)?
        .into_iter()
        .map(|param| match keyword_arg(param) {
            Some((name, default)) => format!("{name}={default}"),
            None if param == "..." => "*args".to_owned(),
            None => param.to_owned(),
        })
        .collect();
    Some(rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::literal_shield::placeholder;

    fn rebuild(lines: &[&str]) -> (Vec<String>, Diagnostics) {
        let mut blocks = BlockReconstructor::new(4);
        let mut diagnostics = Diagnostics::new();
        let mut out = Vec::new();
        for (idx, text) in lines.iter().enumerate() {
            let line = SourceLine::new(idx + 1, *text);
            out.extend(
                blocks
                    .reconstruct(&line, &mut diagnostics)
                    .into_iter()
                    .map(|line| line.text),
            );
        }
        blocks.finish(&mut diagnostics);
        (out, diagnostics)
    }

    #[test]
    fn test_if_else_chain() {
        let (out, diagnostics) = rebuild(&[
            "if (x > 1) {",
            "y = 1",
            "} else if (x < 0) {",
            "y = -1",
            "} else {",
            "y = 0",
            "}",
        ]);
        assert_eq!(
            out,
            vec![
                "if x > 1:",
                "    y = 1",
                "elif x < 0:",
                "    y = -1",
                "else:",
                "    y = 0",
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_loops_and_functions() {
        let (out, diagnostics) = rebuild(&[
            "clean = function(df, n = 2) {",
            "  for (i in range(1, n + 1)) {",
            "    if (i == 2) next",
            "    while (not done) {",
            "      repeat {",
            "        break",
            "      }",
            "    }",
            "  }",
            "  return df",
            "}",
        ]);
        assert_eq!(
            out,
            vec![
                "def clean(df, n=2):",
                "    for i in range(1, n + 1):",
                "        if i == 2: continue",
                "        while not done:",
                "            while True:",
                "                break",
                "    return df",
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_stop_becomes_raise() {
        let (out, _) = rebuild(&["if (bad) {", "stop(msg, call. = False)", "}"]);
        assert_eq!(out, vec!["if bad:", "    raise Exception(msg)"]);
    }

    #[test]
    fn test_inline_bodies() {
        let (out, _) = rebuild(&["if (ok) { n = n + 1 }", "sq = function(x) x * x"]);
        assert_eq!(out, vec!["if ok: n = n + 1", "def sq(x): return x * x"]);

        let (out, _) = rebuild(&["for (f in files) { total = 0", "total = 1", "}"]);
        assert_eq!(out, vec!["for f in files:", "    total = 0", "    total = 1"]);
    }

    #[test]
    fn test_braceless_header_indents_next_statement() {
        let (out, _) = rebuild(&["if (x)", "y = 1", "z = 2"]);
        assert_eq!(out, vec!["if x:", "    y = 1", "z = 2"]);
    }

    #[test]
    fn test_comment_under_braceless_header_keeps_body_pending() {
        let comment = placeholder(0);
        let (out, diagnostics) = rebuild(&["if (x)", comment.as_str(), "y = 1", "z = 2"]);
        assert_eq!(
            out,
            vec![
                "if x:".to_owned(),
                format!("    {comment}"),
                "    y = 1".to_owned(),
                "z = 2".to_owned(),
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_inline_else_branches_are_split() {
        let (out, diagnostics) = rebuild(&["if (a) { x = 1 } else { y = 2 }", "z = 3"]);
        assert_eq!(out, vec!["if a:", "    x = 1", "else: y = 2", "z = 3"]);
        assert!(diagnostics.is_empty());

        let (out, diagnostics) = rebuild(&["if (a) { x = 1 } else if (b) {", "y = 2", "}"]);
        assert_eq!(out, vec!["if a:", "    x = 1", "elif b:", "    y = 2"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_braces_inside_calls_do_not_split() {
        assert_eq!(
            split_before_else("f(function() { 1 }, else_value)"),
            vec!["f(function() { 1 }, else_value)"]
        );
        assert_eq!(split_before_else("} else {"), vec!["} else {"]);
    }

    #[test]
    fn test_empty_blocks_get_pass() {
        let comment = placeholder(0);
        let (out, diagnostics) = rebuild(&[
            "if (a) {",
            "}",
            "f = function() {}",
            "while (x) {",
            comment.as_str(),
            "}",
            "y = 1",
        ]);
        assert_eq!(
            out,
            vec![
                "if a:".to_owned(),
                "    pass".to_owned(),
                "def f(): pass".to_owned(),
                "while x:".to_owned(),
                format!("    {comment}"),
                "    pass".to_owned(),
                "y = 1".to_owned(),
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_empty_if_branch_before_else() {
        let (out, _) = rebuild(&["if (a) {", "} else {", "x = 1", "}"]);
        assert_eq!(out, vec!["if a:", "    pass", "else:", "    x = 1"]);
    }

    #[test]
    fn test_opening_brace_on_its_own_line() {
        let (out, diagnostics) = rebuild(&["f = function(x)", "{", "x + 1", "}", "y = 2"]);
        assert_eq!(out, vec!["def f(x):", "    x + 1", "y = 2"]);
        assert!(diagnostics.is_empty());

        let (out, diagnostics) = rebuild(&["if (a)", "{", "}"]);
        assert_eq!(out, vec!["if a:", "    pass"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_trailing_closer_applies_after_emission() {
        let (out, diagnostics) = rebuild(&["if (a) {", "x = 1 }", "y = 2"]);
        assert_eq!(out, vec!["if a:", "    x = 1", "y = 2"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_depth_invariant() {
        let lines = [
            "f = function() {",
            "if (a) {",
            "} else {",
            "x = 1",
            "}",
            "}",
        ];
        let mut blocks = BlockReconstructor::new(2);
        let mut diagnostics = Diagnostics::new();
        let mut depths = Vec::new();
        for (idx, text) in lines.iter().enumerate() {
            blocks.reconstruct(&SourceLine::new(idx + 1, *text), &mut diagnostics);
            depths.push(blocks.depth());
        }
        assert_eq!(depths, vec![1, 2, 2, 2, 1, 0]);
    }

    #[test]
    fn test_unmatched_closer_clamps() {
        let (out, diagnostics) = rebuild(&["}", "x = 1"]);
        assert_eq!(out, vec!["x = 1"]);
        let kinds: Vec<_> = diagnostics.iter().map(|d| (d.kind, d.is_error())).collect();
        assert_eq!(kinds, vec![(DiagnosticKind::BlockBalance, false)]);
    }

    #[test]
    fn test_unclosed_block_is_fatal() {
        let (_, diagnostics) = rebuild(&["if (x) {", "y = 1"]);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_bare_opener_is_reported() {
        let (out, diagnostics) = rebuild(&["res = tryCatch({", "f()", "})"]);
        assert_eq!(out, vec!["res = tryCatch(", "    f()", ")"]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let (out, _) = rebuild(&["x = 1", "", "   ", "y = 2"]);
        assert_eq!(out, vec!["x = 1", "", "", "y = 2"]);
    }
}

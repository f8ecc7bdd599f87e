//! Diagnostics collected while translating a file
//!
//! Every pass reports problems through [`Diagnostics`] instead of failing.
//! Only an unbalanced block depth at end of input is fatal; everything else
//! is recovered locally and translation continues with a best-effort line.

use std::fmt;

use log::debug;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Classification of a detected issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A quote was opened but never closed on its line
    UnterminatedLiteral,
    /// A closing brace without an opener, or unbalanced blocks at end of input
    BlockBalance,
    /// A join call whose arguments could not be parsed or conflict
    JoinParse,
    /// A join keyword argument that has no known translation
    UnrecognizedJoinKey,
    /// A membership test whose left operand shape could not be classified
    AmbiguousMembership,
    /// A subset condition name qualified as a column that was also assigned as a variable
    AmbiguousColumn,
    /// A construct with no translation that was passed through unchanged
    UnrecognizedConstruct,
    /// A chained null assignment that could not be collapsed
    ChainFlush,
    /// Input contains the character reserved for literal placeholders
    ReservedCharacter,
}

impl DiagnosticKind {
    /// Short stable identifier used in CLI output
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnterminatedLiteral => "unterminated-literal",
            Self::BlockBalance => "block-balance",
            Self::JoinParse => "join-parse",
            Self::UnrecognizedJoinKey => "unrecognized-join-key",
            Self::AmbiguousMembership => "ambiguous-membership",
            Self::AmbiguousColumn => "ambiguous-column",
            Self::UnrecognizedConstruct => "unrecognized-construct",
            Self::ChainFlush => "chain-flush",
            Self::ReservedCharacter => "reserved-character",
        }
    }
}

/// A single diagnostic record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line the issue was detected on (0 for end of input)
    pub line: usize,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}]: {}",
            self.line,
            self.severity,
            self.kind.code(),
            self.message
        )
    }
}

/// Ordered collector of diagnostics for one file
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(line, Severity::Warning, kind, message.into());
    }

    pub fn error(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(line, Severity::Error, kind, message.into());
    }

    fn push(&mut self, line: usize, severity: Severity, kind: DiagnosticKind, message: String) {
        debug!("line {line}: {severity} [{}]: {message}", kind.code());
        self.records.push(Diagnostic {
            line,
            severity,
            kind,
            message,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

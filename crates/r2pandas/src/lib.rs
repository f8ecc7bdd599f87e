//! r2pandas: a line-oriented transpiler from R data-wrangling scripts to
//! Python/pandas.
//!
//! [`translate`] runs one file through the whole pipeline and returns the
//! translated text with the diagnostics raised along the way.

pub mod block;
pub mod config;
pub mod diagnostics;
pub mod dirs;
pub mod drop_collapser;
pub mod header;
pub mod identifier;
pub mod join;
pub mod literal_shield;
pub mod membership;
pub mod operand;
pub mod pipeline;
pub mod rewrite;
pub mod scanner;
pub mod types;

pub use crate::{
    config::Config,
    diagnostics::{Diagnostic, DiagnosticKind, Severity},
    header::{IMPORT_HEADER, with_header},
    identifier::normalize_identifier,
    pipeline::{Translation, TranslationFailure, translate},
};

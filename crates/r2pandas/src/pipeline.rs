//! Translation pipeline
//!
//! Drives one file through every pass, line by line:
//! shield -> rewrite rules -> drop collapser -> block reconstructor -> restore.
//! All line-spanning state (literal table, pending drop chain, block depth)
//! is owned by a single [`Pipeline`] value.

use std::fmt;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    block::BlockReconstructor,
    config::Config,
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    drop_collapser::{DropCollapser, assigns_null},
    identifier::normalize_identifier,
    literal_shield::{LiteralShield, PLACEHOLDER_MARK},
    rewrite::{RewriteContext, RuleSet},
    types::{FxIndexSet, SourceLine, source_lines},
};

static ASSIGNED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_.][\w.]*)\s*(?:<<?-|=[^=])").expect("assigned name regex")
});
static LOOP_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s}]*for\s*\(\s*([A-Za-z_.][\w.]*)\s+in\b").expect("loop variable regex")
});

/// Variable bound by a shielded R line, if any
fn bound_name(text: &str) -> Option<&str> {
    ASSIGNED_NAME
        .captures(text)
        .or_else(|| LOOP_VARIABLE.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A successfully translated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Python source, without the import header
    pub text: String,
    /// Non-fatal diagnostics in the order they were raised
    pub diagnostics: Vec<Diagnostic>,
}

/// Translation stopped by a fatal diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationFailure {
    /// Every diagnostic raised, fatal ones included
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationFailure {
    /// The fatal diagnostics only
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

impl fmt::Display for TranslationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<String> = self.errors().map(ToString::to_string).collect();
        write!(f, "translation failed: {}", errors.join("; "))
    }
}

impl std::error::Error for TranslationFailure {}

/// Per-file translation state
#[derive(Debug)]
pub struct Pipeline<'a> {
    config: &'a Config,
    rules: RuleSet,
    shield: LiteralShield,
    collapser: DropCollapser,
    blocks: BlockReconstructor,
    diagnostics: Diagnostics,
    /// Names bound by earlier lines, normalized
    assigned: FxIndexSet<String>,
    output: Vec<String>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            rules: RuleSet::new(config),
            shield: LiteralShield::new(),
            collapser: DropCollapser::new(),
            blocks: BlockReconstructor::new(config.indent_width),
            diagnostics: Diagnostics::new(),
            assigned: FxIndexSet::default(),
            output: Vec::new(),
        }
    }

    /// Translate one source line; output may lag behind while a drop chain is pending
    pub fn push_line(&mut self, line: &SourceLine) {
        let shielded = self.shield.shield(line, &mut self.diagnostics);
        let rewritten = {
            let mut ctx = RewriteContext {
                line: line.number,
                config: self.config,
                shield: &mut self.shield,
                diagnostics: &mut self.diagnostics,
                assigned: &self.assigned,
            };
            self.rules.apply(&shielded, &mut ctx)
        };
        if let Some(name) = bound_name(&shielded.text) {
            self.assigned.insert(normalize_identifier(name));
        }
        let ready = if assigns_null(&shielded.text) {
            self.collapser.push(rewritten, &mut self.diagnostics)
        } else {
            self.collapser.pass(rewritten)
        };
        for ready in ready {
            self.emit(&ready);
        }
    }

    fn emit(&mut self, line: &SourceLine) {
        for rebuilt in self.blocks.reconstruct(line, &mut self.diagnostics) {
            let restored = self.shield.restore(&rebuilt.text);
            self.output.push(restored);
        }
    }

    /// Flush pending state and check the end-of-input invariants
    pub fn finish(mut self) -> Result<Translation, TranslationFailure> {
        if let Some(flushed) = self.collapser.flush() {
            self.emit(&flushed);
        }
        self.blocks.finish(&mut self.diagnostics);

        let unrestored = self.shield.unrestored();
        if !unrestored.is_empty() {
            warn!("{} literal span(s) were dropped by a rewrite", unrestored.len());
        }

        if self.diagnostics.has_errors() {
            return Err(TranslationFailure {
                diagnostics: self.diagnostics.into_vec(),
            });
        }

        let mut text = self.output.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        Ok(Translation {
            text,
            diagnostics: self.diagnostics.into_vec(),
        })
    }
}

/// Translate a whole R source file
pub fn translate(source: &str, config: &Config) -> Result<Translation, TranslationFailure> {
    let lines = source_lines(source);
    info!("translating {} line(s)", lines.len());

    if let Some(line) = lines.iter().find(|line| line.text.contains(PLACEHOLDER_MARK)) {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(
            line.number,
            DiagnosticKind::ReservedCharacter,
            "input contains the reserved character U+001A",
        );
        return Err(TranslationFailure {
            diagnostics: diagnostics.into_vec(),
        });
    }

    let mut pipeline = Pipeline::new(config);
    for line in &lines {
        pipeline.push_line(line);
    }
    let result = pipeline.finish();
    match &result {
        Ok(translation) => info!(
            "translation finished with {} diagnostic(s)",
            translation.diagnostics.len()
        ),
        Err(failure) => debug!("translation failed: {failure}"),
    }
    result
}

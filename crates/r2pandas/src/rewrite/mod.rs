//! Expression rewriting
//!
//! The rewriter is an ordered battery of small, independent rules. Each rule
//! is a pure transformation over one shielded line and documents the
//! precondition it relies on, i.e. which earlier rules must already have run.
//! The order below is load-bearing:
//!
//! 1. `aggressive-identifiers` (opt-in) sees raw R names before anything else
//! 2. `assignment` and `keyword-literals` turn R spellings into Python ones
//! 3. `column-access` must precede `subset` and every shape-sensitive rule,
//!    because those recognise vectorized operands by their `df["col"]` form
//! 4. `subset`, `names-assignment`, `vector-literal`, `column-names`
//! 5. `builtins` before `ranges` so `1:nrow(df)` sees `len(df)`
//! 6. `missingness`, `concatenation`, `unique`, `merge`
//! 7. `membership` and `logical-operators` run last, over fully rewritten
//!    operands
//! 8. `residual-constructs` only reports what is left untranslated

mod builtins;
mod columns;
mod frames;
mod identifiers;
mod merge;
mod subset;
mod syntax;
mod vectors;

use std::fmt;

use log::trace;

pub use self::{
    builtins::Builtins,
    columns::{ColumnAccess, ColumnNames, NamesAssignment},
    frames::{Concatenation, Missingness, Unique},
    identifiers::AggressiveIdentifiers,
    merge::MergeCall,
    subset::{Subset, guard_comparisons},
    syntax::{Assignment, KeywordLiterals, LogicalOperators, ResidualConstructs},
    vectors::{Ranges, VectorLiteral},
};
use crate::{
    config::Config,
    diagnostics::Diagnostics,
    literal_shield::LiteralShield,
    membership::Membership,
    types::{FxIndexSet, SourceLine},
};

/// Mutable context handed to every rule application
#[derive(Debug)]
pub struct RewriteContext<'a> {
    /// Line number of the line being rewritten
    pub line: usize,
    pub config: &'a Config,
    pub shield: &'a mut LiteralShield,
    pub diagnostics: &'a mut Diagnostics,
    /// Normalized names assigned on earlier lines of the file
    pub assigned: &'a FxIndexSet<String>,
}

/// A single expression-level rewrite
pub trait RewriteRule: fmt::Debug + Send + Sync {
    /// Stable rule name used in logs
    fn name(&self) -> &'static str;

    /// Rewrite one shielded line; `None` means the rule did not apply
    fn apply(&self, text: &str, ctx: &mut RewriteContext<'_>) -> Option<String>;
}

/// The ordered rule battery for one configuration
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl RuleSet {
    /// Build the standard rule order
    pub fn new(config: &Config) -> Self {
        let mut rules: Vec<Box<dyn RewriteRule>> = Vec::new();
        if config.aggressive_identifier_normalization {
            rules.push(Box::new(AggressiveIdentifiers));
        }
        rules.push(Box::new(Assignment));
        rules.push(Box::new(KeywordLiterals));
        rules.push(Box::new(ColumnAccess));
        rules.push(Box::new(Subset));
        rules.push(Box::new(NamesAssignment));
        rules.push(Box::new(VectorLiteral));
        rules.push(Box::new(ColumnNames));
        rules.push(Box::new(Builtins));
        rules.push(Box::new(Ranges));
        rules.push(Box::new(Missingness));
        rules.push(Box::new(Concatenation));
        rules.push(Box::new(Unique));
        rules.push(Box::new(MergeCall));
        rules.push(Box::new(Membership));
        rules.push(Box::new(LogicalOperators));
        rules.push(Box::new(ResidualConstructs));
        Self { rules }
    }

    /// Rule names in application order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name())
    }

    /// Run every rule over a shielded line in order
    pub fn apply(&self, line: &SourceLine, ctx: &mut RewriteContext<'_>) -> SourceLine {
        let mut text = line.text.clone();
        for rule in &self.rules {
            if let Some(rewritten) = rule.apply(&text, ctx) {
                if rewritten != text {
                    trace!("line {}: {} -> {:?}", line.number, rule.name(), rewritten);
                    text = rewritten;
                }
            }
        }
        line.with_text(text)
    }
}

//! Source rewriting for the idx helper.
//!
//! Replaces every call `idx(base, _ => _.a.b)` of a recognized helper
//! binding with an equivalent chain of null checks,
//!
//! ```text
//! var _ref;
//! (_ref = base) != null ? (_ref = _ref.a) != null ? _ref.b : _ref : _ref;
//! ```
//!
//! and removes the helper's import once nothing else refers to it. The
//! passes run in order:
//! - Scope analysis: bindings, references and helper declarations
//! - Binding validation: malformed imports and redefinitions
//! - Call-site rewriting: guard chains, temporaries, declaration removal

pub mod binding;
pub mod chain;
pub mod error;
pub mod guard;
pub mod options;
pub mod rewrite;
pub mod scope;

#[cfg(test)]
mod eval;

pub use binding::{HelperPlan, RewritePlan};
pub use error::RewriteError;
pub use options::{ChainPolicy, HoistPriority, Options, DEFAULT_IMPORT_NAME};
pub use rewrite::Temporary;
pub use scope::{ScopeAnalysis, UidGenerator};

use idx_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use once_cell::sync::Lazy;
use regex::Regex;
use rewrite::CallSiteRewriter;
use swc_common::comments::Comments;
use swc_common::Span;
use swc_ecma_ast::Program;
use swc_ecma_visit::VisitMutWith;

/// A helper declaration that had to stay.
#[derive(Debug, Clone)]
pub struct RetainedHelper {
    pub name: String,
    pub declared_at: Span,
    /// References other than direct calls
    pub references: Vec<Span>,
}

/// Summary of one program's rewrite.
#[derive(Debug, Clone, Default)]
pub struct RewriteReport {
    /// The source could not mention the helper, so nothing was traversed
    pub skipped: bool,
    pub calls_rewritten: usize,
    /// Temporaries in allocation order
    pub temporaries: Vec<Temporary>,
    /// Helper names whose declaration was removed
    pub removed: Vec<String>,
    pub retained: Vec<RetainedHelper>,
    /// Declarators requiring the helper module that are not recognized
    pub unrecognized_requires: Vec<Span>,
}

impl RewriteReport {
    pub fn changed(&self) -> bool {
        self.calls_rewritten > 0 || !self.removed.is_empty()
    }

    /// Warnings and hints about the rewrite, spans mapped with `convert`.
    pub fn diagnostics(&self, convert: impl Fn(Span) -> Option<idx_diagnostics::Span>) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        for helper in &self.retained {
            for &reference in &helper.references {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::UntransformedReference,
                        format!(
                            "`{}` is used other than as a direct call; its declaration is kept",
                            helper.name
                        ),
                    )
                    .with_span(convert(reference))
                    .with_note(convert(helper.declared_at), "declared here"),
                );
            }
        }

        for &span in &self.unrecognized_requires {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UnrecognizedRequire,
                    "this require of the helper module is not a plain `const idx = require(...)`; its calls are left alone",
                )
                .with_span(convert(span)),
            );
        }

        diagnostics
    }
}

/// Whether the rewriter has to look at `source` at all.
///
/// With the default import name a source without the whole word `idx`
/// cannot import or call the helper. Other names always need a traversal.
pub fn may_reference_helper(source: &str, options: &Options) -> bool {
    static HELPER_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bidx\b").expect("valid regex"));
    options.import_name != DEFAULT_IMPORT_NAME || HELPER_WORD.is_match(source)
}

/// Rewrite all helper calls in `program`.
///
/// `source` is the text `program` was parsed from; it is only used for the
/// fast path. With `comments`, the comments of removed helper declarations
/// are kept on the neighbouring statements. On error the program may be
/// partially rewritten and should be discarded.
pub fn transform_program(
    program: &mut Program,
    source: &str,
    comments: Option<&dyn Comments>,
    options: &Options,
) -> Result<RewriteReport, RewriteError> {
    // Phase 1: skip sources that cannot mention the helper
    if !may_reference_helper(source, options) {
        log::debug!("no `{}` in source, skipping", options.import_name);
        return Ok(RewriteReport {
            skipped: true,
            ..Default::default()
        });
    }

    // Phase 2: scopes, references and helper declarations
    let analysis = ScopeAnalysis::analyze(program, &options.import_name)?;

    // Phase 3: validate helper bindings and collect call sites
    let plan = binding::plan(&analysis)?;
    let mut report = RewriteReport {
        unrecognized_requires: analysis.unrecognized_requires.clone(),
        ..Default::default()
    };
    if plan.helpers.is_empty() {
        return Ok(report);
    }

    // Phase 4: rewrite calls, declare temporaries, drop dead declarations
    let mut rewriter = CallSiteRewriter::new(&plan, options, analysis.uid_generator(), comments);
    program.visit_mut_with(&mut rewriter);
    let outcome = rewriter.finish()?;

    report.calls_rewritten = outcome.calls_rewritten;
    report.temporaries = outcome.temporaries;
    for helper in &plan.helpers {
        if helper.removable() {
            report.removed.push(helper.name.clone());
        } else if !helper.retained.is_empty() {
            report.retained.push(RetainedHelper {
                name: helper.name.clone(),
                declared_at: helper.declared_at,
                references: helper.retained.clone(),
            });
        }
    }

    log::debug!(
        "rewrote {} call(s), {} temporar{}, removed {:?}",
        report.calls_rewritten,
        report.temporaries.len(),
        if report.temporaries.len() == 1 { "y" } else { "ies" },
        report.removed
    );
    Ok(report)
}

//! Helper binding recognition and validation.
//!
//! Decides which declarations introduce the helper, rejects malformed
//! imports, rejects any redefinition of a helper binding, and partitions the
//! remaining references into call sites to rewrite and references that force
//! the declaration to stay.

use crate::error::{self, RewriteError};
use crate::scope::{HelperOrigin, ReferenceKind, ScopeAnalysis};
use std::collections::{HashMap, HashSet};
use swc_common::{Span, Spanned};
use swc_ecma_ast::{
    CallExpr, Callee, Expr, Ident, ImportDecl, ImportSpecifier, Lit, ModuleExportName,
};

/// Whether `decl` imports from the helper module.
pub fn imports_helper(decl: &ImportDecl, import_name: &str) -> bool {
    decl.src.value.as_str().unwrap_or("") == import_name
}

/// Validate an import of the helper module and return the local name.
pub fn check_import(decl: &ImportDecl) -> Result<&Ident, RewriteError> {
    // import 'idx'
    let Some(first) = decl.specifiers.first() else {
        return Err(RewriteError::binding(error::IMPORT_NO_VALUE, decl.span));
    };

    // import a, { b } from 'idx'
    if let Some(second) = decl.specifiers.get(1) {
        return Err(RewriteError::binding(error::IMPORT_NOT_SINGLE, second.span()));
    }

    let (local, specifier_type_only) = match first {
        ImportSpecifier::Default(default) => (&default.local, false),
        ImportSpecifier::Named(named) if is_default_name(named.imported.as_ref()) => {
            (&named.local, named.is_type_only)
        }
        other => {
            return Err(RewriteError::binding(error::IMPORT_NOT_DEFAULT, other.span()));
        }
    };

    if decl.type_only || specifier_type_only {
        return Err(RewriteError::binding(error::IMPORT_NOT_VALUE, decl.span));
    }

    Ok(local)
}

/// `{ default as idx }`
fn is_default_name(imported: Option<&ModuleExportName>) -> bool {
    match imported {
        Some(ModuleExportName::Ident(ident)) => &*ident.sym == "default",
        Some(ModuleExportName::Str(s)) => s.value.as_str() == Some("default"),
        _ => false,
    }
}

/// Whether `init` is `require('<import_name>', ...)`.
pub fn is_helper_require(init: &Expr, import_name: &str) -> bool {
    let Expr::Call(CallExpr {
        callee: Callee::Expr(callee),
        args,
        ..
    }) = init
    else {
        return false;
    };

    if !matches!(&**callee, Expr::Ident(ident) if &*ident.sym == "require") {
        return false;
    }

    match args.first() {
        Some(arg) if arg.spread.is_none() => {
            matches!(&*arg.expr, Expr::Lit(Lit::Str(s)) if s.value.as_str() == Some(import_name))
        }
        _ => false,
    }
}

/// What happens to one helper declaration.
#[derive(Debug, Clone)]
pub struct HelperPlan {
    /// Local name of the helper
    pub name: String,
    pub origin: HelperOrigin,
    /// Span of the declaring identifier
    pub declared_at: Span,
    /// Callee spans of the calls to rewrite
    pub calls: Vec<Span>,
    /// Spans of references that are not direct calls
    pub retained: Vec<Span>,
}

impl HelperPlan {
    /// The declaration goes away only when every reference is a rewritten
    /// call and it is not part of an export.
    pub fn removable(&self) -> bool {
        let exported = matches!(self.origin, HelperOrigin::Require { exported: true, .. });
        !exported && !self.calls.is_empty() && self.retained.is_empty()
    }

    /// Span of the import declaration or the `require` declarator.
    pub fn declaration_span(&self) -> Span {
        match self.origin {
            HelperOrigin::Import { span } | HelperOrigin::Require { span, .. } => span,
        }
    }
}

/// Validated helper bindings of a program.
#[derive(Debug, Default)]
pub struct RewritePlan {
    pub helpers: Vec<HelperPlan>,
    /// Callee span -> index into `helpers`
    targets: HashMap<Span, usize>,
}

impl RewritePlan {
    /// Whether the identifier at `callee` is a helper call to rewrite.
    pub fn is_target(&self, callee: Span) -> bool {
        self.targets.contains_key(&callee)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Declaration spans to delete once every call has been rewritten.
    pub fn removals(&self) -> HashSet<Span> {
        self.helpers
            .iter()
            .filter(|h| h.removable())
            .map(HelperPlan::declaration_span)
            .collect()
    }
}

/// Validate every helper binding and collect its call sites.
///
/// Helpers are handled in declaration order; the first violation wins.
pub fn plan(analysis: &ScopeAnalysis) -> Result<RewritePlan, RewriteError> {
    let mut plan = RewritePlan::default();

    for helper in &analysis.helpers {
        let binding = analysis.binding(helper.binding);

        if let Some(&span) = binding.redeclarations.first() {
            return Err(RewriteError::redefinition(span, binding.span));
        }

        let first_write = analysis
            .references_to(helper.binding)
            .filter(|r| r.kind == ReferenceKind::Write)
            .map(|r| r.span)
            .min_by_key(|span| span.lo);
        if let Some(span) = first_write {
            return Err(RewriteError::redefinition(span, binding.span));
        }

        let mut calls = Vec::new();
        let mut retained = Vec::new();
        for reference in analysis.references_to(helper.binding) {
            match reference.kind {
                ReferenceKind::Callee => calls.push(reference.span),
                _ => retained.push(reference.span),
            }
        }

        let index = plan.helpers.len();
        for &span in &calls {
            plan.targets.insert(span, index);
        }
        log::debug!(
            "helper `{}`: {} call(s), {} other reference(s)",
            binding.name,
            calls.len(),
            retained.len()
        );

        plan.helpers.push(HelperPlan {
            name: binding.name.clone(),
            origin: helper.origin,
            declared_at: binding.span,
            calls,
            retained,
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_for(source: &str) -> Result<RewritePlan, RewriteError> {
        let parsed = idx_parser::parse(source, "test.ts").unwrap();
        let analysis = ScopeAnalysis::analyze(&parsed.program, "idx")?;
        plan(&analysis)
    }

    fn import_error(source: &str) -> &'static str {
        plan_for(source).unwrap_err().message()
    }

    #[test]
    fn test_import_validation() {
        assert_eq!(import_error("import 'idx';"), error::IMPORT_NO_VALUE);
        assert_eq!(import_error("import idx, { b } from 'idx';"), error::IMPORT_NOT_SINGLE);
        assert_eq!(import_error("import * as idx from 'idx';"), error::IMPORT_NOT_DEFAULT);
        assert_eq!(import_error("import { idx } from 'idx';"), error::IMPORT_NOT_DEFAULT);
        assert_eq!(import_error("import type idx from 'idx';"), error::IMPORT_NOT_VALUE);
        assert_eq!(
            import_error("import { type default as idx } from 'idx';"),
            error::IMPORT_NOT_VALUE
        );
    }

    #[test]
    fn test_default_as_import_is_accepted() {
        let plan = plan_for("import { default as get } from 'idx';\nget(a, _ => _.b);").unwrap();
        assert_eq!(plan.helpers[0].name, "get");
        assert_eq!(plan.target_count(), 1);
    }

    #[test]
    fn test_redefinition_before_or_after_use() {
        let after = plan_for("import idx from 'idx';\nidx(a, _ => _.b);\nidx = null;").unwrap_err();
        assert_eq!(after.message(), error::REDEFINED);

        let before = plan_for("import idx from 'idx';\nidx = null;\nidx(a, _ => _.b);").unwrap_err();
        assert!(matches!(before, RewriteError::Redefinition { .. }));

        let nested = plan_for("import idx from 'idx';\nfunction f() { idx += 1; }").unwrap_err();
        assert!(matches!(nested, RewriteError::Redefinition { .. }));
    }

    #[test]
    fn test_shadowed_write_is_not_a_redefinition() {
        let plan =
            plan_for("import idx from 'idx';\nfunction f(idx) { idx = 1; }\nidx(a, _ => _.b);").unwrap();
        assert_eq!(plan.target_count(), 1);
    }

    #[test]
    fn test_removal_is_all_or_nothing() {
        let removed = plan_for("import idx from 'idx';\nidx(a, _ => _.b);").unwrap();
        assert_eq!(removed.removals().len(), 1);

        let kept = plan_for("import idx from 'idx';\nidx(a, _ => _.b);\nfoo(idx);").unwrap();
        assert!(kept.removals().is_empty());
        assert_eq!(kept.helpers[0].retained.len(), 1);

        let unused = plan_for("import idx from 'idx';").unwrap();
        assert!(unused.removals().is_empty());

        let exported = plan_for("export const idx = require('idx');\nidx(a, _ => _.b);").unwrap();
        assert!(exported.removals().is_empty());
    }

    #[test]
    fn test_require_with_other_name() {
        let parsed = idx_parser::parse("var get = require('safe-get');\nget(a, _ => _.b);", "t.js").unwrap();
        let analysis = ScopeAnalysis::analyze(&parsed.program, "safe-get").unwrap();
        let plan = plan(&analysis).unwrap();
        assert_eq!(plan.helpers[0].name, "get");
        assert_eq!(plan.target_count(), 1);
    }
}

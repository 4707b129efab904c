//! Rewrite errors.
//!
//! Every error is fatal for the program being rewritten. The messages are
//! matched verbatim by downstream tooling, so they hard-code `idx` even when
//! a different helper name is configured.

use idx_diagnostics::{Diagnostic, DiagnosticCode, Span};
use thiserror::Error;

pub const ARITY: &str = "The `idx` function takes exactly two arguments.";
pub const NOT_ARROW: &str = "The second argument supplied to `idx` must be an arrow function.";
pub const BLOCK_BODY: &str =
    "The body of the arrow function supplied to `idx` must be a single expression (without curly braces).";
pub const PARAM_COUNT: &str = "The arrow function supplied to `idx` must take exactly one parameter.";
pub const PARAM_NOT_IDENT: &str = "The parameter supplied to `idx` must be an identifier.";
pub const PARAM_MISMATCH: &str =
    "The parameter of the arrow function supplied to `idx` must match the base of the body expression.";
pub const PARAM_ESCAPES: &str =
    "The parameter of the arrow function supplied to `idx` can only be used as the base of the body expression.";
pub const STRICT_BODY: &str = "idx callbacks may only access properties on the callback parameter.";
pub const PERMISSIVE_BODY: &str = "The `idx` body can only be composed of properties and methods.";
pub const REDEFINED: &str = "`idx` cannot be redefined.";
pub const IMPORT_NO_VALUE: &str = "The idx import must have a value.";
pub const IMPORT_NOT_SINGLE: &str = "The idx import must be a single specifier.";
pub const IMPORT_NOT_DEFAULT: &str = "The idx import must be a default import.";
pub const IMPORT_NOT_VALUE: &str = "The idx import must be a value import.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// The helper was called with other than two arguments.
    #[error("{message}")]
    Arity {
        message: &'static str,
        span: swc_common::Span,
    },

    /// The accessor callback does not follow the chain grammar.
    #[error("{message}")]
    Shape {
        message: &'static str,
        span: swc_common::Span,
    },

    /// The import or require of the helper is malformed.
    #[error("{message}")]
    Binding {
        message: &'static str,
        span: swc_common::Span,
    },

    /// The helper binding is assigned to or declared twice.
    #[error("{message}")]
    Redefinition {
        message: &'static str,
        span: swc_common::Span,
        /// Where the helper was declared
        declared_at: swc_common::Span,
    },
}

impl RewriteError {
    pub(crate) fn arity(span: swc_common::Span) -> Self {
        RewriteError::Arity {
            message: ARITY,
            span,
        }
    }

    pub(crate) fn shape(message: &'static str, span: swc_common::Span) -> Self {
        RewriteError::Shape { message, span }
    }

    pub(crate) fn binding(message: &'static str, span: swc_common::Span) -> Self {
        RewriteError::Binding { message, span }
    }

    pub(crate) fn redefinition(span: swc_common::Span, declared_at: swc_common::Span) -> Self {
        RewriteError::Redefinition {
            message: REDEFINED,
            span,
            declared_at,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RewriteError::Arity { message, .. }
            | RewriteError::Shape { message, .. }
            | RewriteError::Binding { message, .. }
            | RewriteError::Redefinition { message, .. } => message,
        }
    }

    /// Location of the offending node.
    pub fn span(&self) -> swc_common::Span {
        match self {
            RewriteError::Arity { span, .. }
            | RewriteError::Shape { span, .. }
            | RewriteError::Binding { span, .. }
            | RewriteError::Redefinition { span, .. } => *span,
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            RewriteError::Arity { .. } => DiagnosticCode::ArityMismatch,
            RewriteError::Shape { .. } => DiagnosticCode::InvalidAccessor,
            RewriteError::Binding { .. } => DiagnosticCode::InvalidHelperImport,
            RewriteError::Redefinition { .. } => DiagnosticCode::HelperRedefined,
        }
    }

    /// Convert into a diagnostic, mapping SWC spans with `convert`.
    pub fn to_diagnostic(&self, convert: impl Fn(swc_common::Span) -> Option<Span>) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.code(), self.message()).with_span(convert(self.span()));
        match self {
            RewriteError::Arity { .. } => {
                diagnostic.with_help("call it as `idx(object, _ => _.path.to.value)`")
            }
            RewriteError::Shape { .. } => diagnostic
                .with_help("the callback must be `_ => _` followed by property accesses or calls"),
            RewriteError::Binding { .. } => {
                diagnostic.with_help("import the helper as `import idx from 'idx'`")
            }
            RewriteError::Redefinition { declared_at, .. } => {
                diagnostic.with_note(convert(*declared_at), "helper declared here")
            }
        }
    }
}

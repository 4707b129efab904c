//! What the rewriter reports about a file: rejected calls, kept helpers,
//! and files it could not read or parse.

use crate::span::{Note, Span};
use serde::{Serialize, Serializer};

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Only shown by `idx check --all`
    Hint,
    /// The file is rewritten, but the helper declaration stays
    Warning,
    /// The file is not rewritten
    Error,
}

impl Severity {
    /// Lowercase name, as printed before the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable codes, explained by `idx explain <code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// P001: the file is not valid JavaScript or TypeScript
    ParseError,
    /// A001: `idx` called with other than two arguments
    ArityMismatch,
    /// S001: the accessor callback is not `_ => _.a.b`
    InvalidAccessor,
    /// B001: malformed `import idx from 'idx'`
    InvalidHelperImport,
    /// B002: the helper binding is reassigned or redeclared
    HelperRedefined,
    /// W001: the helper is referenced other than as a call, so it stays
    UntransformedReference,
    /// W002: a require of the helper module the rewriter leaves alone
    UnrecognizedRequire,
    /// I002: a file could not be read or written
    IoError,
}

impl DiagnosticCode {
    /// Every code, in the order `idx explain` lists them.
    pub const ALL: [DiagnosticCode; 8] = [
        Self::ParseError,
        Self::ArityMismatch,
        Self::InvalidAccessor,
        Self::InvalidHelperImport,
        Self::HelperRedefined,
        Self::UntransformedReference,
        Self::UnrecognizedRequire,
        Self::IoError,
    ];

    /// The code as printed, e.g. `"B002"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::ArityMismatch => "A001",
            Self::InvalidAccessor => "S001",
            Self::InvalidHelperImport => "B001",
            Self::HelperRedefined => "B002",
            Self::UntransformedReference => "W001",
            Self::UnrecognizedRequire => "W002",
            Self::IoError => "I002",
        }
    }

    /// Look a code up by its printed form, ignoring case.
    pub fn from_code(code: &str) -> Option<DiagnosticCode> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    /// Severity used by [`Diagnostic::new`].
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::UntransformedReference => Severity::Warning,
            Self::UnrecognizedRequire => Severity::Hint,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One finding, located at the offending node when there is one.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Single line message
    pub message: String,
    pub span: Option<Span>,
    /// Related locations, e.g. the helper's declaration
    pub notes: Vec<Note>,
    /// How to fix it
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the code's default severity and no location.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.default_severity(),
            message: message.into(),
            span: None,
            notes: Vec::new(),
            help: None,
        }
    }

    /// Override the default severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Locate the diagnostic.
    pub fn with_span(mut self, span: impl Into<Option<Span>>) -> Self {
        self.span = span.into();
        self
    }

    /// Point at a related location.
    pub fn with_note(mut self, span: impl Into<Option<Span>>, message: impl Into<String>) -> Self {
        self.notes.push(Note {
            span: span.into(),
            message: message.into(),
        });
        self
    }

    /// Suggest a fix.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// The diagnostics of a whole run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Add the diagnostics of another file or stage.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    /// Drop hints, which `idx check` only shows on request.
    pub fn drop_hints(&mut self) {
        self.items.retain(|d| d.severity != Severity::Hint);
    }

    /// Number of diagnostics of `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    /// Number of errors.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Number of hints.
    pub fn hint_count(&self) -> usize {
        self.count(Severity::Hint)
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Diagnostics in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lookup_is_case_insensitive() {
        assert_eq!(DiagnosticCode::from_code("b002"), Some(DiagnosticCode::HelperRedefined));
        assert_eq!(DiagnosticCode::from_code("A001"), Some(DiagnosticCode::ArityMismatch));
        assert_eq!(DiagnosticCode::from_code("X999"), None);
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in DiagnosticCode::ALL.iter().enumerate() {
            for b in &DiagnosticCode::ALL[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }

    #[test]
    fn test_kept_helpers_warn_and_unknown_requires_hint() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(DiagnosticCode::ArityMismatch, "bad arity"));
        diags.push(Diagnostic::new(DiagnosticCode::UntransformedReference, "kept"));
        diags.push(Diagnostic::new(DiagnosticCode::UnrecognizedRequire, "ignored"));
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.hint_count(), 1);

        diags.drop_hints();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.hint_count(), 0);
    }

    #[test]
    fn test_recoverable_parse_errors_can_be_downgraded() {
        let diag = Diagnostic::new(DiagnosticCode::ParseError, "missing semicolon")
            .with_severity(Severity::Warning);
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.span.is_none());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_value((Severity::Warning, DiagnosticCode::IoError)).unwrap();
        assert_eq!(json, serde_json::json!(["warning", "I002"]));
    }
}

//! Diagnostics reported by the idx rewriter.
//!
//! A [`Diagnostic`] carries a stable [`DiagnosticCode`], the location of the
//! offending node, notes pointing at related code (usually the helper's
//! declaration) and an optional fix. Emitters render them for a terminal,
//! with a code frame, or as JSON lines.
//!
//! # Example
//!
//! ```
//! use idx_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticEmitter, SourceCache, Span, TerminalEmitter};
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("input.js", "idx(1, 2, 3);".to_string());
//!
//! let diag = Diagnostic::new(
//!     DiagnosticCode::ArityMismatch,
//!     "The `idx` function takes exactly two arguments.",
//! )
//! .with_span(Span::new(file_id, 0, 12));
//!
//! let mut out = Vec::new();
//! TerminalEmitter::new(&mut out, false).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().contains("--> input.js:1:1"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, TerminalEmitter};
pub use source_cache::SourceCache;
pub use span::{FileId, Location, Note, Span};

//! JavaScript/TypeScript parser and printer wrapper using SWC
//!
//! This crate provides a high-level interface to parse source code into an
//! SWC `Program`, with integrated diagnostic support, and to print a
//! (possibly rewritten) `Program` back to source text.

use anyhow::{anyhow, Result};
use idx_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, FileId, Severity, SourceCache, Span};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use swc_common::comments::{Comments, SingleThreadedComments};
use swc_common::{input::StringInput, sync::Lrc, BytePos, FileName, SourceMap};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_codegen::{text_writer::JsWriter, Config, Emitter};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, Syntax, TsSyntax};

// Re-export AST types for consumers that need to inspect the AST
pub use swc_ecma_ast;

// Re-export Spanned trait for getting spans from AST nodes
pub use swc_common::Spanned;

/// Source dialects, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `.js`, `.mjs`, `.cjs`, `.jsx` (JSX is always enabled for JavaScript)
    JavaScript,
    /// `.ts`, `.mts`, `.cts`
    TypeScript,
    /// `.tsx`
    Tsx,
}

impl Dialect {
    /// Pick the dialect for a file name. Unknown extensions parse as JavaScript.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("ts") | Some("mts") | Some("cts") => Dialect::TypeScript,
            Some("tsx") => Dialect::Tsx,
            _ => Dialect::JavaScript,
        }
    }

    fn syntax(self) -> Syntax {
        match self {
            Dialect::JavaScript => Syntax::Es(EsSyntax {
                jsx: true,
                ..Default::default()
            }),
            Dialect::TypeScript | Dialect::Tsx => Syntax::Typescript(TsSyntax {
                tsx: self == Dialect::Tsx,
                decorators: true,
                dts: false,
                no_early_errors: false,
                disallow_ambiguous_jsx_like: false,
            }),
        }
    }
}

/// File extensions the rewriter processes.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// Result of parsing one source file.
pub struct ParseResult {
    /// The parsed program (module or script)
    pub program: Program,
    /// The file ID in the source cache
    pub file_id: FileId,
    /// SWC source map holding this file; needed again for printing
    pub source_map: Lrc<SourceMap>,
    /// Position of the first byte of this file inside `source_map`
    pub start_pos: BytePos,
    /// Comments keyed by the position of the token they are attached to
    pub comments: SingleThreadedComments,
    /// Recoverable parse errors, reported as warnings
    pub diagnostics: Diagnostics,
}

// `SourceMap` does not implement `Debug`, so it is omitted here.
impl std::fmt::Debug for ParseResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseResult")
            .field("program", &self.program)
            .field("file_id", &self.file_id)
            .field("start_pos", &self.start_pos)
            .field("comments", &self.comments)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl ParseResult {
    /// Convert an SWC span of this file into a diagnostic span.
    pub fn span(&self, swc_span: swc_common::Span) -> Option<Span> {
        swc_span_to_span(swc_span, self.file_id, self.start_pos)
    }

    /// Print the (possibly rewritten) program back to source text, with
    /// its comments.
    pub fn print(&self) -> Result<String> {
        print_program(&self.program, &self.source_map, Some(&self.comments))
    }
}

/// Parse source code into a `Program`, registering the file in `cache`.
///
/// A fatal syntax error is pushed into `diagnostics` as a P001 error and
/// returned as `Err`; recoverable errors become warnings on the result.
pub fn parse_with_cache(
    source: &str,
    filename: &str,
    cache: &mut SourceCache,
    diagnostics: &mut Diagnostics,
) -> Result<ParseResult> {
    let file_id = cache.add_file(filename, source.to_string());

    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );
    let start_pos = source_file.start_pos;
    let comments = SingleThreadedComments::default();

    // The parser borrows `comments`; it is dropped before they move into
    // the result.
    let (program, errors) = {
        let lexer = Lexer::new(
            Dialect::from_path(filename).syntax(),
            EsVersion::Es2022,
            StringInput::from(&*source_file),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);

        let program = parser.parse_program().map_err(|e| {
            let span = swc_span_to_span(e.span(), file_id, start_pos);
            diagnostics.push(
                Diagnostic::new(DiagnosticCode::ParseError, e.kind().msg()).with_span(span),
            );
            anyhow!("Parse error in {}: {}", filename, e.kind().msg())
        })?;
        (program, parser.take_errors())
    };

    let mut warnings = Diagnostics::new();
    for error in errors {
        let span = swc_span_to_span(error.span(), file_id, start_pos);
        warnings.push(
            Diagnostic::new(DiagnosticCode::ParseError, error.kind().msg())
                .with_severity(Severity::Warning)
                .with_span(span),
        );
    }
    log::trace!("parsed {} ({} recoverable errors)", filename, warnings.len());

    Ok(ParseResult {
        program,
        file_id,
        source_map,
        start_pos,
        comments,
        diagnostics: warnings,
    })
}

/// Parse source code without a caller-provided cache.
pub fn parse(source: &str, filename: &str) -> Result<ParseResult> {
    let mut cache = SourceCache::new();
    let mut diagnostics = Diagnostics::new();
    parse_with_cache(source, filename, &mut cache, &mut diagnostics)
}

/// Print a program with SWC's code generator.
///
/// The emitter consumes the comments it prints, so it works on a copy and
/// `comments` can be printed again.
pub fn print_program(
    program: &Program,
    source_map: &Lrc<SourceMap>,
    comments: Option<&SingleThreadedComments>,
) -> Result<String> {
    let comments = comments.map(copy_comments);
    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: Config::default().with_target(EsVersion::Es2022),
            cm: source_map.clone(),
            comments: comments.as_ref().map(|c| c as &dyn Comments),
            wr: JsWriter::new(source_map.clone(), "\n", &mut buf, None),
        };
        emitter
            .emit_program(program)
            .map_err(|e| anyhow!("Failed to print program: {}", e))?;
    }
    Ok(String::from_utf8(buf)?)
}

fn copy_comments(comments: &SingleThreadedComments) -> SingleThreadedComments {
    let (leading, trailing) = comments.borrow_all();
    SingleThreadedComments::from_leading_and_trailing(
        Rc::new(RefCell::new((*leading).clone())),
        Rc::new(RefCell::new((*trailing).clone())),
    )
}

/// Convert an SWC span to our span type.
///
/// SWC positions are offsets into the whole source map, so the file's start
/// position is subtracted. Dummy SWC spans have no location.
pub fn swc_span_to_span(
    swc_span: swc_common::Span,
    file_id: FileId,
    start_pos: BytePos,
) -> Option<Span> {
    if swc_span.is_dummy() {
        return None;
    }
    Some(Span::new(
        file_id,
        swc_span.lo.0.saturating_sub(start_pos.0),
        swc_span.hi.0.saturating_sub(start_pos.0),
    ))
}

//! CLI command implementations

pub mod check;
pub mod explain;
pub mod init;
pub mod transform;

use anyhow::Result;
use clap::Args;
use idx_diagnostics::{Diagnostics, SourceCache};
use idx_parser::SOURCE_EXTENSIONS;
use idx_transform::{ChainPolicy, Options, RewriteReport};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Rewrite options shared by `transform` and `check`; they override
/// `idx.toml`.
#[derive(Args, Debug, Default)]
pub struct RewriteArgs {
    /// Module the helper is imported from
    #[arg(long)]
    pub import_name: Option<String>,

    /// Only allow property accesses in callbacks (no calls)
    #[arg(long)]
    pub strict_chains: bool,
}

impl RewriteArgs {
    pub fn apply(&self, mut options: Options) -> Options {
        if let Some(name) = &self.import_name {
            options.import_name = name.clone();
        }
        if self.strict_chains {
            options.policy = ChainPolicy::Strict;
        }
        options
    }
}

/// Whether `path` names a source file the rewriter handles.
pub fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    // Declaration files have nothing to rewrite
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Collect all source files under `path`, or `path` itself if it is a file.
pub fn collect_source_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_source_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Result of rewriting one source text.
pub struct Rewritten {
    /// The new source; the original text when nothing changed
    pub code: String,
    pub report: RewriteReport,
}

/// Parse and rewrite one source text.
///
/// Parse and rewrite errors are pushed into `diagnostics` and yield `None`;
/// warnings are pushed alongside a successful result.
pub fn rewrite_source(
    source: &str,
    filename: &str,
    options: &Options,
    cache: &mut SourceCache,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Rewritten>> {
    let mut parsed = match idx_parser::parse_with_cache(source, filename, cache, diagnostics) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("{}", e);
            return Ok(None);
        }
    };
    diagnostics.extend(std::mem::take(&mut parsed.diagnostics));

    let report = match idx_transform::transform_program(
        &mut parsed.program,
        source,
        Some(&parsed.comments),
        options,
    ) {
        Ok(report) => report,
        Err(e) => {
            diagnostics.push(e.to_diagnostic(|s| parsed.span(s)));
            return Ok(None);
        }
    };
    diagnostics.extend(report.diagnostics(|s| parsed.span(s)));

    // Untouched sources keep their formatting
    let code = if report.changed() {
        parsed.print()?
    } else {
        source.to_string()
    };
    Ok(Some(Rewritten { code, report }))
}

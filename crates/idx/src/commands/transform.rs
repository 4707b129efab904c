//! Transform command - rewrites idx() calls in a file or directory tree

use anyhow::{anyhow, Result};
use clap::Args;
use idx_diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache,
    TerminalEmitter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{collect_source_files, rewrite_source, RewriteArgs};
use crate::config::Config;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input file or directory
    pub input: PathBuf,

    /// Output file (single input file only; default: stdout)
    #[arg(short, long, conflicts_with = "out_dir")]
    pub output: Option<PathBuf>,

    /// Output directory; required when the input is a directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[command(flatten)]
    pub rewrite: RewriteArgs,
}

#[derive(Debug, Default)]
struct Totals {
    files: usize,
    written: usize,
    calls: usize,
    failed: usize,
}

/// Where the rewritten source of `file` goes, relative to the input root.
fn destination(file: &Path, root: &Path, out_dir: &Path) -> PathBuf {
    match file.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => out_dir.join(relative),
        _ => out_dir.join(file.file_name().unwrap_or(file.as_os_str())),
    }
}

fn write_output(path: &Path, code: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, code).map_err(|e| anyhow!("Could not write {}: {}", path.display(), e))
}

pub fn run(
    args: TransformArgs,
    config: &Config,
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
) -> Result<()> {
    let options = args.rewrite.apply(config.transform.clone());
    log::debug!("transform options: {:?}", options);

    if !args.input.exists() {
        return Err(anyhow!("Input not found: {}", args.input.display()));
    }
    let is_dir = args.input.is_dir();
    if is_dir && args.out_dir.is_none() {
        return Err(anyhow!("--out-dir is required when the input is a directory"));
    }

    let files = collect_source_files(&args.input);
    let mut cache = SourceCache::new();
    let mut diagnostics = Diagnostics::new();
    let mut totals = Totals::default();

    let progress = if is_dir && !quiet && matches!(format, OutputFormat::Text) {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    for file in &files {
        totals.files += 1;
        if let Some(bar) = &progress {
            bar.set_message(file.display().to_string());
        }

        let source = match fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::IoError,
                        format!("Could not read {}: {}", file.display(), e),
                    ),
                );
                totals.failed += 1;
                continue;
            }
        };

        let filename = file.to_string_lossy().to_string();
        let Some(rewritten) =
            rewrite_source(&source, &filename, &options, &mut cache, &mut diagnostics)?
        else {
            totals.failed += 1;
            if let Some(bar) = &progress {
                bar.inc(1);
            }
            continue;
        };
        totals.calls += rewritten.report.calls_rewritten;

        let target = match (&args.output, &args.out_dir) {
            (Some(output), _) => Some(output.clone()),
            (None, Some(out_dir)) => Some(destination(file, &args.input, out_dir)),
            (None, None) => None,
        };
        match target {
            Some(path) => {
                write_output(&path, &rewritten.code)?;
                log::debug!("wrote {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(rewritten.code.as_bytes())?;
                stdout.flush()?;
            }
        }
        totals.written += 1;

        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    // Rewritten code may be on stdout, so everything else goes to stderr.
    let stderr = std::io::stderr();
    match format {
        OutputFormat::Text => {
            let mut emitter = TerminalEmitter::new(stderr.lock(), use_color);
            emitter.emit_all(&diagnostics, &cache)?;

            if !quiet && (is_dir || args.output.is_some() || args.out_dir.is_some()) {
                let summary = format!(
                    "{} file(s), {} call(s) rewritten, {} written",
                    totals.files, totals.calls, totals.written
                );
                if totals.failed > 0 {
                    let failed = format!("{} file(s) failed", totals.failed);
                    if use_color {
                        eprintln!("{}: {}", console::style(failed).red().bold(), summary);
                    } else {
                        eprintln!("{}: {}", failed, summary);
                    }
                } else if use_color {
                    eprintln!("{} {}", console::style("Done").green().bold(), summary);
                } else {
                    eprintln!("Done {}", summary);
                }
            }
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(stderr.lock());
            emitter.emit_all(&diagnostics, &cache)?;

            let summary = serde_json::json!({
                "type": "summary",
                "success": totals.failed == 0,
                "files": totals.files,
                "written": totals.written,
                "failed": totals.failed,
                "calls_rewritten": totals.calls,
                "errors": diagnostics.error_count(),
                "warnings": diagnostics.warning_count(),
            });
            eprintln!("{}", serde_json::to_string(&summary)?);
        }
    }

    if totals.failed > 0 {
        Err(anyhow!("Transform failed for {} file(s)", totals.failed))
    } else {
        Ok(())
    }
}

//! Check command - runs the rewriter without writing anything

use anyhow::{anyhow, Result};
use clap::Args;
use idx_diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache,
    TerminalEmitter,
};
use std::fs;
use std::path::PathBuf;

use super::{collect_source_files, rewrite_source, RewriteArgs};
use crate::config::Config;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input file or directory
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Show hints as well as errors and warnings
    #[arg(long)]
    pub all: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub rewrite: RewriteArgs,
}

pub fn run(
    args: CheckArgs,
    config: &Config,
    format: OutputFormat,
    use_color: bool,
    verbose: u8,
) -> Result<()> {
    let options = args.rewrite.apply(config.transform.clone());
    let files = collect_source_files(&args.input);

    if files.is_empty() {
        match format {
            OutputFormat::Text => println!("No source files found."),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "files": 0,
                        "errors": 0,
                        "warnings": 0,
                    })
                );
            }
        }
        return Ok(());
    }

    if matches!(format, OutputFormat::Text) {
        println!("Checking {} file(s)...", files.len());
    }

    let mut source_cache = SourceCache::new();
    let mut all_diagnostics = Diagnostics::new();
    let mut checked_files = 0;
    let mut calls = 0;

    for file in &files {
        let source = match fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                all_diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::IoError,
                        format!("Could not read {}: {}", file.display(), e),
                    ),
                );
                continue;
            }
        };

        let filename = file.to_string_lossy().to_string();
        let rewritten = rewrite_source(
            &source,
            &filename,
            &options,
            &mut source_cache,
            &mut all_diagnostics,
        )?;
        if let Some(rewritten) = rewritten {
            calls += rewritten.report.calls_rewritten;
            if verbose > 0 && rewritten.report.changed() {
                println!(
                    "  {}: {} call(s)",
                    file.display(),
                    rewritten.report.calls_rewritten
                );
            }
        }
        checked_files += 1;
    }

    if !args.all {
        all_diagnostics.drop_hints();
    }

    let errors = all_diagnostics.error_count();
    let warnings = all_diagnostics.warning_count();

    match format {
        OutputFormat::Text => {
            let stderr = std::io::stderr();
            let mut emitter = TerminalEmitter::new(stderr.lock(), use_color);
            emitter.emit_all(&all_diagnostics, &source_cache)?;

            println!();

            if errors > 0 {
                if use_color {
                    println!(
                        "{}: {} error(s), {} warning(s)",
                        console::style("Check failed").red().bold(),
                        errors,
                        warnings
                    );
                } else {
                    println!("Check failed: {} error(s), {} warning(s)", errors, warnings);
                }
            } else if warnings > 0 && args.strict {
                if use_color {
                    println!(
                        "{}: {} warning(s) (strict mode)",
                        console::style("Check failed").yellow().bold(),
                        warnings
                    );
                } else {
                    println!("Check failed: {} warning(s) (strict mode)", warnings);
                }
            } else if warnings > 0 {
                if use_color {
                    println!(
                        "{}: {} warning(s)",
                        console::style("Check passed").yellow(),
                        warnings
                    );
                } else {
                    println!("Check passed: {} warning(s)", warnings);
                }
            } else if use_color {
                println!(
                    "{} - {} file(s) checked, {} call(s) to rewrite",
                    console::style("All checks passed!").green().bold(),
                    checked_files,
                    calls
                );
            } else {
                println!(
                    "All checks passed! - {} file(s) checked, {} call(s) to rewrite",
                    checked_files, calls
                );
            }
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(std::io::stdout().lock());
            emitter.emit_all(&all_diagnostics, &source_cache)?;

            let summary = serde_json::json!({
                "type": "summary",
                "success": errors == 0 && (!args.strict || warnings == 0),
                "files_checked": checked_files,
                "calls": calls,
                "errors": errors,
                "warnings": warnings,
                "hints": all_diagnostics.hint_count(),
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    let has_blocking_issues = errors > 0 || (args.strict && warnings > 0);
    if has_blocking_issues {
        Err(anyhow!("Check failed with errors"))
    } else {
        Ok(())
    }
}

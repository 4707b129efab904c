//! idx - safe property access rewriter
//!
//! CLI driver for rewriting `idx(base, _ => _.a.b)` calls into null-check
//! chains.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Rewrite idx() calls into guarded null checks
#[derive(Parser, Debug)]
#[command(name = "idx")]
#[command(author, version, about = "Rewrite idx() calls into guarded null checks")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (default: ./idx.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite a file or directory
    Transform(commands::transform::TransformArgs),

    /// Report what a rewrite would do without writing anything
    Check(commands::check::CheckArgs),

    /// Write a default idx.toml
    Init(commands::init::InitArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

/// Check if the first non-flag argument looks like a source file
fn is_shorthand_invocation(args: &[String]) -> bool {
    for arg in args.iter().skip(1) {
        if arg.starts_with('-') {
            continue;
        }
        if matches!(
            arg.as_str(),
            "transform" | "check" | "init" | "explain" | "help"
        ) {
            return false;
        }
        return commands::is_source_file(std::path::Path::new(arg));
    }
    false
}

/// `idx file.js -o out.js` is `idx transform file.js -o out.js`
fn expand_shorthand_args(args: Vec<String>) -> Vec<String> {
    let mut new_args = vec![args[0].clone(), "transform".to_string()];
    new_args.extend(args.into_iter().skip(1));
    new_args
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let effective_args = if is_shorthand_invocation(&args) {
        expand_shorthand_args(args)
    } else {
        args
    };

    let cli = Cli::parse_from(effective_args);

    // Determine if colors should be used
    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stderr);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Transform(args) => {
            let config = config::Config::load(cli.config.as_deref())?;
            commands::transform::run(args, &config, cli.format, use_color, cli.quiet)
        }
        Commands::Check(args) => {
            let config = config::Config::load(cli.config.as_deref())?;
            commands::check::run(args, &config, cli.format, use_color, cli.verbose)
        }
        Commands::Init(args) => commands::init::run(args, cli.format, use_color),
        Commands::Explain(args) => commands::explain::run(args, cli.format, use_color),
    }
}

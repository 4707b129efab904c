//! Init command - writes a default idx.toml

use anyhow::Result;
use clap::Args;
use std::fs;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory (default: current)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing idx.toml
    #[arg(long)]
    pub force: bool,
}

const HEADER: &str = "# idx rewriter configuration
#
# import_name        module whose default import (or require) is the helper
# policy             \"permissive\" allows calls in callbacks, \"strict\" only property accesses
# async_method_hoist priority reported for temporaries inside async methods

";

/// The text of a fresh `idx.toml`.
pub fn default_config() -> Result<String> {
    Ok(format!("{}{}", HEADER, Config::default().to_toml()?))
}

pub fn run(args: InitArgs, format: OutputFormat, _use_color: bool) -> Result<()> {
    fs::create_dir_all(&args.path)?;
    let config_path = args.path.join(CONFIG_FILE);

    let created = if config_path.exists() && !args.force {
        false
    } else {
        fs::write(&config_path, default_config()?)?;
        true
    };

    match format {
        OutputFormat::Text => {
            if created {
                println!("Created {}", config_path.display());
            } else {
                println!("Skipped {} (already exists)", config_path.display());
            }
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "created": created,
                "path": config_path.to_string_lossy(),
            });
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let text = default_config().unwrap();
        assert!(text.starts_with("# idx rewriter configuration"));
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }
}

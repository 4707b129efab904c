//! `idx.toml` loading

use anyhow::{anyhow, Result};
use idx_transform::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "idx.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub transform: Options,
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise `idx.toml` in the
    /// working directory if there is one, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None if Path::new(CONFIG_FILE).is_file() => Path::new(CONFIG_FILE),
            None => return Ok(Self::default()),
        };

        let text = fs::read_to_string(path)
            .map_err(|e| anyhow!("Could not read {}: {}", path.display(), e))?;
        let config = Self::parse(&text).map_err(|e| anyhow!("{}: {}", path.display(), e))?;
        log::debug!("loaded {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idx_transform::{ChainPolicy, HoistPriority};

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_transform_table() {
        let config = Config::parse(
            r#"
[transform]
import_name = "safe-get"
policy = "strict"
async_method_hoist = 4
"#,
        )
        .unwrap();
        assert_eq!(config.transform.import_name, "safe-get");
        assert_eq!(config.transform.policy, ChainPolicy::Strict);
        assert_eq!(config.transform.async_method_hoist, HoistPriority(4));
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config = Config::parse("[transform]\npolicy = \"permissive\"\n").unwrap();
        assert_eq!(config.transform, Options::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::parse("[transform]\npolicy = \"lenient\"\n").is_err());
        assert!(Config::parse("[build]\nout_dir = \"dist\"\n").is_err());
    }

    #[test]
    fn test_written_config_reads_back() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains("[transform]"));
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }
}

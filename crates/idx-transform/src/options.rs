//! Rewrite configuration.

use serde::{Deserialize, Serialize};

/// Module specifier the helper is imported from by default.
pub const DEFAULT_IMPORT_NAME: &str = "idx";

/// Which callback bodies are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainPolicy {
    /// Property accesses only
    Strict,
    /// Property accesses and calls (including method calls)
    #[default]
    Permissive,
}

/// Ordering key for merged temporary declarations.
///
/// Declarations with a higher priority are placed first in their holder.
/// The value is also reported so later passes (async lowering in particular)
/// can tell which declarations must stay ahead of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoistPriority(pub u8);

impl HoistPriority {
    pub const DEFAULT: HoistPriority = HoistPriority(2);
    pub const ASYNC_METHOD: HoistPriority = HoistPriority(3);
}

impl Default for HoistPriority {
    fn default() -> Self {
        HoistPriority::DEFAULT
    }
}

/// Options for [`crate::transform_program`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Module specifier whose default import (or `require`) is the helper
    pub import_name: String,
    /// Accepted callback body grammar
    pub policy: ChainPolicy,
    /// Priority of temporaries declared inside async class methods
    pub async_method_hoist: HoistPriority,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            import_name: DEFAULT_IMPORT_NAME.to_string(),
            policy: ChainPolicy::default(),
            async_method_hoist: HoistPriority::ASYNC_METHOD,
        }
    }
}

impl Options {
    pub fn strict() -> Self {
        Self {
            policy: ChainPolicy::Strict,
            ..Self::default()
        }
    }

    pub fn with_import_name(mut self, name: impl Into<String>) -> Self {
        self.import_name = name.into();
        self
    }
}

//! VM configuration.
//!
//! Configuration is read from a TOML file (conventionally `avm.toml`). Every
//! key is optional:
//!
//! ```toml
//! integer_pool_size = 256
//! hash_seed = 0x873d1ae5
//! dict_size_exp = 10
//! stack_reserve = 16
//! trace = false
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::backend::dict::DEFAULT_SIZE_EXP;
use crate::backend::hash_utils::DEFAULT_HASH_SEED;
use crate::backend::stack::DEFAULT_RESERVE;

/// Integer pool capacity used by the CLI when nothing is configured
pub const DEFAULT_POOL_SIZE: usize = 256;

/// VM configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    /// Capacity of the integer recycling pool (0 disables it)
    pub integer_pool_size: usize,
    /// Seed handed to the hash function
    pub hash_seed: u32,
    /// Dictionary bucket count exponent, clamped to [4, 16]
    pub dict_size_exp: u32,
    /// Initial stack reserve used by hosts that build stacks from the config
    pub stack_reserve: usize,
    /// Emit a trace event for every executed instruction
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            integer_pool_size: 0,
            hash_seed: DEFAULT_HASH_SEED,
            dict_size_exp: DEFAULT_SIZE_EXP,
            stack_reserve: DEFAULT_RESERVE,
            trace: false,
        }
    }
}

/// Failure to load a configuration file
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "Failed to read config: {}", err),
            Self::Parse(err) => write!(f, "Invalid config: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err)
    }
}

impl VmConfig {
    /// Parse a configuration from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Enable per-instruction tracing
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    /// Set the integer pool capacity
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.integer_pool_size = size;
        self
    }
}

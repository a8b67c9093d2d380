//! Codec configuration
//!
//! Values come from the environment ([`CodecConfig::from_env`]) or a JSON
//! document deserialized with serde; command-line flags are applied on top
//! with [`CodecConfig::with_overrides`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::TableSource;
use crate::{Error, Result};

/// Environment variable holding the table file path
pub const TABLE_ENV: &str = "CP949_TABLE";

/// Environment variable holding the stream buffer size in bytes
pub const BUFFER_SIZE_ENV: &str = "CP949_BUFFER_SIZE";

/// Table file looked up in the working directory when no path is configured
pub const DEFAULT_TABLE_FILE: &str = "cp949.dat";

/// Default stream buffer size (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Smallest buffer that always holds one complete character
pub const MIN_BUFFER_SIZE: usize = 4;

/// Largest accepted stream buffer size (256MB)
pub const MAX_BUFFER_SIZE: usize = 256 * 1024 * 1024;

/// Runtime configuration for table loading and streaming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Path of the binary table file
    pub table_path: Option<PathBuf>,
    /// Read buffer size used by [`StreamTranslator`](crate::StreamTranslator)
    pub buffer_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            table_path: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl CodecConfig {
    /// Read configuration from `CP949_TABLE` and `CP949_BUFFER_SIZE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup (environment-like)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(TABLE_ENV).filter(|p| !p.is_empty()) {
            config.table_path = Some(PathBuf::from(path));
        }

        if let Some(size) = lookup(BUFFER_SIZE_ENV) {
            config.buffer_size = size.trim().parse().map_err(|_| {
                Error::Config(format!("{BUFFER_SIZE_ENV} is not a byte count: {size:?}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, table_path: Option<PathBuf>, buffer_size: Option<usize>) -> Self {
        if table_path.is_some() {
            self.table_path = table_path;
        }
        if let Some(size) = buffer_size {
            self.buffer_size = size;
        }
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "buffer size {} is below the minimum of {MIN_BUFFER_SIZE} bytes",
                self.buffer_size
            )));
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "buffer size {} exceeds the maximum of {MAX_BUFFER_SIZE} bytes",
                self.buffer_size
            )));
        }
        Ok(())
    }

    /// Where the table bytes are read from
    pub fn table_source(&self) -> TableSource {
        TableSource::File(
            self.table_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TABLE_FILE)),
        )
    }
}

//! Configuration for BearDB
//!
//! Centralized configuration with sensible defaults.

use crate::error::{BearError, Result};
use crate::record::{HEADER_SIZE, MAX_LENGTH};

/// Main configuration for a BearDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Mode Configuration (recorded in the file preamble)
    // -------------------------------------------------------------------------
    /// Store key bytes after the value bytes of every record
    pub persist_keys: bool,

    /// Allow delete / modify / defrag. `false` gives an append-only store.
    pub mutable: bool,

    // -------------------------------------------------------------------------
    // Allocation Configuration
    // -------------------------------------------------------------------------
    /// Slack bytes reserved after every appended record (0 or >= 4)
    pub margin: u32,

    /// Smallest payload capacity a split-off remainder must have to be
    /// registered as a free slot of its own
    pub min_fragment: u32,

    // -------------------------------------------------------------------------
    // Free-Space Index Configuration
    // -------------------------------------------------------------------------
    /// What to do when no persisted free-space index is available on open
    pub free_index_recovery: FreeIndexRecovery,
}

/// Strategy used when a store is opened without a usable persisted index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeIndexRecovery {
    /// Walk every record and register each tombstone (slow on large files)
    Rescan,

    /// Start empty; writes append until the next rebuild
    Empty,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persist_keys: true,
            mutable: true,
            margin: 0,
            min_fragment: 8,
            free_index_recovery: FreeIndexRecovery::Rescan,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values that the record layout depends on
    pub fn validate(&self) -> Result<()> {
        if self.margin != 0 && self.margin < HEADER_SIZE as u32 {
            return Err(BearError::Config(format!(
                "margin must be 0 or at least {} bytes, got {}",
                HEADER_SIZE, self.margin
            )));
        }
        if self.margin > MAX_LENGTH {
            return Err(BearError::Config(format!(
                "margin {} exceeds the maximum record length {}",
                self.margin, MAX_LENGTH
            )));
        }
        if self.min_fragment == 0 {
            return Err(BearError::Config(
                "min_fragment must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Store keys alongside values
    pub fn persist_keys(mut self, persist: bool) -> Self {
        self.config.persist_keys = persist;
        self
    }

    /// Enable or disable delete / modify / defrag
    pub fn mutable(mut self, mutable: bool) -> Self {
        self.config.mutable = mutable;
        self
    }

    /// Set the slack reserved after each appended record (in bytes)
    pub fn margin(mut self, bytes: u32) -> Self {
        self.config.margin = bytes;
        self
    }

    /// Set the minimum capacity of a re-registered split remainder
    pub fn min_fragment(mut self, bytes: u32) -> Self {
        self.config.min_fragment = bytes;
        self
    }

    /// Set the fallback used when no persisted free-space index exists
    pub fn free_index_recovery(mut self, recovery: FreeIndexRecovery) -> Self {
        self.config.free_index_recovery = recovery;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

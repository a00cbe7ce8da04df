//! Engine configuration.
//!
//! Configuration is loaded from a TOML file or built in code; every
//! field has a default so a partial file (or none at all) works.
//!
//! ```toml
//! [retry]
//! max_attempts = 5
//! min_backoff_ms = 100
//!
//! [breaker]
//! cool_down_ms = 30000
//!
//! [paging]
//! initial_page = 20
//! max_page = 200
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ble_sync_core::{BoundedPageSizing, CountingBreaker, ExponentialBackoff, UniformSampler};
use ble_sync_types::PageSize;
use serde::Deserialize;

/// Root configuration for the sync engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Retry backoff parameters.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Circuit breaker parameters.
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Adaptive paging parameters.
    #[serde(default)]
    pub paging: PagingConfig,
}

/// Retry backoff parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Attempts per operation family before giving up (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Smallest backoff delay in milliseconds (default: 100).
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,
    /// Largest backoff delay in milliseconds (default: 30000).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Multiplicative jitter ratio in [0, 1] (default: 0.2).
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

/// Circuit breaker parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakerConfig {
    /// Failures before the breaker opens (default: 1).
    #[serde(default = "default_failures_to_open")]
    pub failures_to_open: u32,
    /// How long an open breaker denies calls, in milliseconds
    /// (default: 30000).
    #[serde(default = "default_cool_down_ms")]
    pub cool_down_ms: u64,
}

/// Adaptive paging parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    /// Smallest page size (default: 20).
    #[serde(default = "default_min_page")]
    pub min_page: u32,
    /// Largest page size (default: 200).
    #[serde(default = "default_max_page")]
    pub max_page: u32,
    /// Growth per stable round (default: 20).
    #[serde(default = "default_grow_step")]
    pub grow_step: u32,
    /// Shrink per failed round (default: 20).
    #[serde(default = "default_shrink_step")]
    pub shrink_step: u32,
    /// Page size a fresh device starts with (default: 20).
    #[serde(default = "default_initial_page")]
    pub initial_page: u32,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_min_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_jitter_ratio() -> f64 {
    0.2
}

fn default_failures_to_open() -> u32 {
    1
}

fn default_cool_down_ms() -> u64 {
    30_000
}

fn default_min_page() -> u32 {
    20
}

fn default_max_page() -> u32 {
    200
}

fn default_grow_step() -> u32 {
    20
}

fn default_shrink_step() -> u32 {
    20
}

fn default_initial_page() -> u32 {
    20
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failures_to_open: default_failures_to_open(),
            cool_down_ms: default_cool_down_ms(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            min_page: default_min_page(),
            max_page: default_max_page(),
            grow_step: default_grow_step(),
            shrink_step: default_shrink_step(),
            initial_page: default_initial_page(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl RetryConfig {
    /// Build the backoff policy with the given jitter sampler.
    pub fn build(&self, sampler: Arc<dyn UniformSampler>) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.max_attempts,
            self.min_backoff_ms,
            self.max_backoff_ms,
            self.jitter_ratio,
            sampler,
        )
    }
}

impl BreakerConfig {
    /// Build the breaker policy.
    pub fn build(&self) -> CountingBreaker {
        CountingBreaker::new(self.failures_to_open, self.cool_down_ms)
    }
}

impl PagingConfig {
    /// Build the page sizing policy.
    pub fn build(&self) -> BoundedPageSizing {
        BoundedPageSizing::new(self.min_page, self.max_page, self.grow_step, self.shrink_step)
    }

    /// The page size a fresh aggregate starts with, clamped into the
    /// configured window.
    pub fn initial_page_size(&self) -> PageSize {
        let lo = self.min_page.max(1);
        let hi = self.max_page.max(lo);
        PageSize::new(self.initial_page.clamp(lo, hi)).expect("clamped page size is positive")
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse the configuration file.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

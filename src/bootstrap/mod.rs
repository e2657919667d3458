//! Moving-block bootstrap prediction intervals.
//!
//! Layout:
//! - `blocks`: block-length rule and circular block resampling
//! - `interval`: refit per replicate, collect forecast draws, take quantiles

pub mod blocks;
pub mod interval;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::ModelError;

pub use blocks::{BlockLength, resample_blocks};
pub use interval::*;

/// Bootstrap settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    pub block_length: BlockLength,
    /// Requested replicate count; `0` disables the bootstrap.
    pub replicates: usize,
    /// Confidence level, e.g. `0.95`.
    pub level: f64,
    pub seed: u64,
    /// Share of requested replicates that must succeed before the result is
    /// flagged as under-replicated.
    pub min_success_ratio: f64,
    pub parallel: bool,
    /// Wall-clock budget per model; replicates not started in time are skipped.
    pub time_budget: Option<Duration>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            block_length: BlockLength::CubeRoot,
            replicates: 500,
            level: 0.95,
            seed: 42,
            min_success_ratio: 0.9,
            parallel: true,
            time_budget: None,
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.level.is_finite() && self.level > 0.0 && self.level < 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "level must be in (0, 1), got {}",
                self.level
            )));
        }
        if !(0.0..=1.0).contains(&self.min_success_ratio) {
            return Err(ModelError::InvalidConfig(format!(
                "min_success_ratio must be in [0, 1], got {}",
                self.min_success_ratio
            )));
        }
        if self.block_length == BlockLength::Fixed(0) {
            return Err(ModelError::InvalidConfig("block length must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Successful replicates needed to avoid the under-replication warning.
    pub fn min_required(&self) -> usize {
        (self.min_success_ratio * self.replicates as f64).ceil() as usize
    }
}

/// Cooperative cancellation shared between a caller and running replicates.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BootstrapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_required(), 450);
    }

    #[test]
    fn rejects_bad_level_and_ratio() {
        let bad_level = BootstrapConfig {
            level: 1.0,
            ..BootstrapConfig::default()
        };
        assert!(matches!(bad_level.validate(), Err(ModelError::InvalidConfig(_))));

        let bad_ratio = BootstrapConfig {
            min_success_ratio: 1.5,
            ..BootstrapConfig::default()
        };
        assert!(bad_ratio.validate().is_err());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}

//! Run configuration for the counting pipeline.

use crate::binning::BinningMode;
use crate::constants::{is_valid_k, DEFAULT_SEED, MAX_K, MAX_M, MIN_K};

/// Parameters of one counting run.
///
/// K and M are fixed for the run and must be identical on every rank, as
/// must the seed and binning mode: the rank map is computed redundantly on
/// every rank and has to come out byte-identical.
#[derive(Debug, Clone)]
pub struct CountConfiguration {
    /// K-mer length, in [2, 63]
    pub k: usize,

    /// Minimizer length, 1 <= m < k and m <= MAX_M
    pub m: usize,

    /// Seed for every deterministic hasher in the run
    pub seed: u64,

    /// How minimizers are assigned to owning ranks
    pub binning: BinningMode,
}

impl Default for CountConfiguration {
    fn default() -> Self {
        Self {
            k: 31,
            m: 9,
            seed: DEFAULT_SEED,
            binning: BinningMode::default(),
        }
    }
}

impl CountConfiguration {
    /// Create a configuration with the given k-mer and minimizer lengths
    pub fn new(k: usize, m: usize) -> Result<Self, String> {
        let config = Self {
            k,
            m,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_k(self.k) {
            return Err(format!(
                "k must be in range [{}, {}], got k={}",
                MIN_K, MAX_K, self.k
            ));
        }
        if self.m < 1 {
            return Err("m must be at least 1".to_string());
        }
        if self.m >= self.k {
            return Err(format!("m must be less than k, got m={}, k={}", self.m, self.k));
        }
        if self.m > MAX_M {
            return Err(format!(
                "m must be at most {} (dense minimizer arrays), got m={}",
                MAX_M, self.m
            ));
        }
        Ok(())
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Count Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  m = {}", self.m);
        tracing::info!("  binning = {:?}", self.binning);
        tracing::debug!("  seed = {}", self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CountConfiguration::default();
        assert_eq!(config.k, 31);
        assert_eq!(config.m, 9);
        assert_eq!(config.binning, BinningMode::GreedyBinning);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_config() {
        let config = CountConfiguration::new(21, 7).unwrap();
        assert_eq!(config.k, 21);
        assert_eq!(config.m, 7);
    }

    #[test]
    fn test_validate_m_ge_k() {
        assert!(CountConfiguration::new(5, 5).is_err());
        assert!(CountConfiguration::new(5, 6).is_err());
    }

    #[test]
    fn test_validate_k_out_of_range() {
        assert!(CountConfiguration::new(1, 1).is_err());
        assert!(CountConfiguration::new(64, 9).is_err());
    }

    #[test]
    fn test_validate_m_cap() {
        assert!(CountConfiguration::new(63, 15).is_err());
        assert!(CountConfiguration::new(63, 14).is_ok());
    }
}

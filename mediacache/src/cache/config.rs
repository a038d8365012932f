//! Configuration types for the cache manager.
//!
//! These types configure the cache independently of where the values come
//! from. The INI loader in [`crate::config`] converts its settings into a
//! [`CacheConfig`]; tests build one directly.

use super::budget::{PartitionWeights, DEFAULT_TRIM_FACTOR};
use super::memory::{DEFAULT_MEMORY_THUMBNAILS, LOW_MEMORY_THUMBNAILS};
use super::types::CacheError;
use crate::key::{HostNamespaces, DEFAULT_MEMO_CAPACITY, DEFAULT_VIRTUAL_SCHEME};

/// Tunables for a [`CacheManager`](super::CacheManager).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Relative share of the total budget per partition.
    pub weights: PartitionWeights,

    /// Extra fraction of the ceiling freed by each eviction pass.
    pub trim_factor: f64,

    /// Capacity of the in-memory thumbnail tier, in entries.
    pub memory_thumbnails: usize,

    /// Schemes whose identities are hashed verbatim.
    pub virtual_schemes: Vec<String>,

    /// Capacity of the identity → key memo.
    pub memo_capacity: usize,

    /// Host → namespace table used for key derivation.
    pub namespaces: HostNamespaces,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            weights: PartitionWeights::default(),
            trim_factor: DEFAULT_TRIM_FACTOR,
            memory_thumbnails: DEFAULT_MEMORY_THUMBNAILS,
            virtual_schemes: vec![DEFAULT_VIRTUAL_SCHEME.to_string()],
            memo_capacity: DEFAULT_MEMO_CAPACITY,
            namespaces: HostNamespaces::new(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, thumbnails: u32, media: u32) -> Self {
        self.weights = PartitionWeights::new(thumbnails, media);
        self
    }

    pub fn with_trim_factor(mut self, trim_factor: f64) -> Self {
        self.trim_factor = trim_factor;
        self
    }

    pub fn with_memory_thumbnails(mut self, capacity: usize) -> Self {
        self.memory_thumbnails = capacity;
        self
    }

    /// Shrink the memory tier for constrained devices.
    pub fn low_memory(mut self) -> Self {
        self.memory_thumbnails = LOW_MEMORY_THUMBNAILS;
        self
    }

    pub fn with_virtual_schemes(mut self, schemes: Vec<String>) -> Self {
        self.virtual_schemes = schemes;
        self
    }

    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }

    pub fn with_namespaces(mut self, namespaces: HostNamespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Reject values the cache cannot operate with.
    pub fn validate(&self) -> Result<(), CacheError> {
        if !self.trim_factor.is_finite() || !(0.0..=1.0).contains(&self.trim_factor) {
            return Err(CacheError::InvalidConfig(format!(
                "trim factor must be between 0 and 1, got {}",
                self.trim_factor
            )));
        }
        if self.weights.total() == 0 {
            return Err(CacheError::InvalidConfig(
                "at least one partition weight must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.weights, PartitionWeights::new(1, 2));
        assert_eq!(config.trim_factor, 0.3);
        assert_eq!(config.memory_thumbnails, 200);
        assert_eq!(config.virtual_schemes, vec!["resource".to_string()]);
        assert_eq!(config.memo_capacity, 1000);
        assert!(config.namespaces.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = CacheConfig::new()
            .with_weights(1, 1)
            .with_trim_factor(0.5)
            .with_memo_capacity(10)
            .low_memory();

        assert_eq!(config.weights.total(), 2);
        assert_eq!(config.trim_factor, 0.5);
        assert_eq!(config.memo_capacity, 10);
        assert_eq!(config.memory_thumbnails, 50);
    }

    #[test]
    fn test_validate_rejects_bad_trim_factor() {
        for trim in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let config = CacheConfig::new().with_trim_factor(trim);
            assert!(matches!(
                config.validate(),
                Err(CacheError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_validate_rejects_zero_weights() {
        let config = CacheConfig::new().with_weights(0, 0);
        assert!(config.validate().is_err());
    }
}

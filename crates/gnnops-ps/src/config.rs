//! Shard configuration

use crate::error::{PsError, PsResult};

/// Default number of internal lock shards
pub const DEFAULT_SHARD_AMOUNT: usize = 64;

/// Configuration for a [`PsShard`](crate::PsShard)
///
/// # Example
///
/// ```
/// use gnnops_ps::ShardConfig;
///
/// let config = ShardConfig::new(16)
///     .with_shard_amount(128)
///     .with_initial_capacity(10_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardConfig {
    /// Number of values stored per key
    pub value_width: usize,
    /// Number of independently locked partitions of the key space
    ///
    /// Must be a power of two greater than one.
    pub shard_amount: usize,
    /// Keys to reserve room for up front
    pub initial_capacity: usize,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            value_width: 1,
            shard_amount: DEFAULT_SHARD_AMOUNT,
            initial_capacity: 0,
        }
    }
}

impl ShardConfig {
    /// Default configuration for rows of `value_width` values
    pub fn new(value_width: usize) -> Self {
        Self {
            value_width,
            ..Default::default()
        }
    }

    pub fn with_shard_amount(mut self, shard_amount: usize) -> Self {
        self.shard_amount = shard_amount;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Check the configuration before a shard is built from it
    pub fn validate(&self) -> PsResult<()> {
        if self.value_width == 0 {
            return Err(PsError::InvalidConfig(
                "value_width must be positive".to_string(),
            ));
        }
        if self.shard_amount < 2 || !self.shard_amount.is_power_of_two() {
            return Err(PsError::InvalidConfig(format!(
                "shard_amount must be a power of two greater than 1, got {}",
                self.shard_amount
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ShardConfig::default();
        assert_eq!(config.value_width, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ShardConfig::new(0).validate().is_err());
        assert!(ShardConfig::new(4).with_shard_amount(1).validate().is_err());
        assert!(ShardConfig::new(4).with_shard_amount(48).validate().is_err());
        assert!(ShardConfig::new(4).with_shard_amount(2).validate().is_ok());
    }
}

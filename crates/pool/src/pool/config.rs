//! Pool configuration types

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for a fixed-size pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Number of instances created up front; the pool never grows or shrinks
    pub size: usize,
    /// Default wait for [`Pool::acquire`](crate::Pool::acquire).
    ///
    /// `None` waits until an instance is released or the caller cancels.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 10,
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PoolConfig {
    /// Config for a pool of `size` instances with the default acquire timeout.
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::configuration("size must be greater than 0"));
        }
        if self.acquire_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::configuration(
                "acquire_timeout must be greater than zero (use None to wait indefinitely)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.size, 10);
        assert_eq!(config.acquire_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_pool_config_validation() {
        assert!(PoolConfig::with_size(0).validate().is_err());
        assert!(
            PoolConfig {
                acquire_timeout: Some(Duration::ZERO),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            PoolConfig {
                acquire_timeout: None,
                ..Default::default()
            }
            .validate()
            .is_ok()
        );
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_config_fills_defaults() {
        let config: PoolConfig = serde_json::from_str(r#"{"size": 4}"#).unwrap();
        assert_eq!(config, PoolConfig::with_size(4));
    }
}

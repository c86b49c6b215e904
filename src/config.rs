//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// Every option is unset by default: unbounded size, no expiry, no background sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold (0 disables caching)
    pub maximum_size: Option<u64>,
    /// Time after a write at which an entry expires
    pub expire_after_write: Option<Duration>,
    /// Interval of the background sweep of expired entries
    pub cleanup_interval: Option<Duration>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAXIMUM_SIZE` - Maximum cache entries (default: unbounded)
    /// - `CACHE_EXPIRE_AFTER_WRITE_SECS` - Expiry after write in seconds (default: never)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Sweep frequency in seconds (default: no sweep)
    ///
    /// Unset variables take their defaults; unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            maximum_size: parse_var("CACHE_MAXIMUM_SIZE")?,
            expire_after_write: parse_var("CACHE_EXPIRE_AFTER_WRITE_SECS")?
                .map(Duration::from_secs),
            cleanup_interval: parse_var("CACHE_CLEANUP_INTERVAL_SECS")?.map(Duration::from_secs),
        })
    }

    /// Checks option combinations that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval == Some(Duration::ZERO) {
            return Err(CacheError::Configuration(
                "cleanup interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            CacheError::Configuration(format!("{} has an invalid value: {:?}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 3] = [
        "CACHE_MAXIMUM_SIZE",
        "CACHE_EXPIRE_AFTER_WRITE_SECS",
        "CACHE_CLEANUP_INTERVAL_SECS",
    ];

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.maximum_size, None);
        assert_eq!(config.expire_after_write, None);
        assert_eq!(config.cleanup_interval, None);
        assert!(config.validate().is_ok());
    }

    // Single test so the environment is not mutated from parallel tests
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }
        assert_eq!(CacheConfig::from_env().unwrap(), CacheConfig::default());

        env::set_var("CACHE_MAXIMUM_SIZE", "100");
        env::set_var("CACHE_EXPIRE_AFTER_WRITE_SECS", " 60 ");
        env::set_var("CACHE_CLEANUP_INTERVAL_SECS", "5");
        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.maximum_size, Some(100));
        assert_eq!(config.expire_after_write, Some(Duration::from_secs(60)));
        assert_eq!(config.cleanup_interval, Some(Duration::from_secs(5)));

        env::set_var("CACHE_MAXIMUM_SIZE", "-1");
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, CacheError::Configuration(_)));
        assert!(err.to_string().contains("CACHE_MAXIMUM_SIZE"));

        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_validate_rejects_zero_cleanup_interval() {
        let config = CacheConfig {
            cleanup_interval: Some(Duration::ZERO),
            ..CacheConfig::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::Configuration(_))));
    }
}

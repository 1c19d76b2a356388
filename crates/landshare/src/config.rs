//! Configuration for the LandShare store and marketplace

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    CACHE_TTL_SECS, DEFAULT_PRICE_PER_UNIT, DEFAULT_TREASURY_ADDRESS, LOCAL_WATCH_INTERVAL_MS,
    REFRESH_INTERVAL_SECS,
};
use crate::error::{LandshareError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandshareConfig {
    /// Directory of the local store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How long a collection read from the mirror stays fresh
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// How often the local store is checked for changes by other processes
    #[serde(default = "default_local_watch")]
    pub local_watch_ms: u64,

    /// Wallet receiving payment for primary sales
    #[serde(default = "default_treasury_address")]
    pub treasury_address: String,

    #[serde(default = "default_price")]
    pub default_price: f64,
}

impl Default for LandshareConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_ttl_secs: default_cache_ttl(),
            refresh_interval_secs: default_refresh_interval(),
            local_watch_ms: default_local_watch(),
            treasury_address: default_treasury_address(),
            default_price: default_price(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./.landshare")
}

fn default_cache_ttl() -> u64 {
    CACHE_TTL_SECS
}

fn default_refresh_interval() -> u64 {
    REFRESH_INTERVAL_SECS
}

fn default_local_watch() -> u64 {
    LOCAL_WATCH_INTERVAL_MS
}

fn default_treasury_address() -> String {
    DEFAULT_TREASURY_ADDRESS.to_string()
}

fn default_price() -> f64 {
    DEFAULT_PRICE_PER_UNIT
}

impl LandshareConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            data_dir: lookup("LANDSHARE_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cache_ttl_secs: parsed("LANDSHARE_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl_secs),
            refresh_interval_secs: parsed("LANDSHARE_REFRESH_INTERVAL_SECS")
                .unwrap_or(defaults.refresh_interval_secs),
            local_watch_ms: parsed("LANDSHARE_LOCAL_WATCH_MS").unwrap_or(defaults.local_watch_ms),
            treasury_address: lookup("LANDSHARE_TREASURY_ADDRESS")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.treasury_address),
            default_price: lookup("LANDSHARE_DEFAULT_PRICE")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(defaults.default_price),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn local_watch_interval(&self) -> Duration {
        Duration::from_millis(self.local_watch_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(LandshareError::Config(
                "Cache TTL must be greater than 0".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(LandshareError::Config(
                "Refresh interval must be greater than 0".to_string(),
            ));
        }
        if self.local_watch_ms == 0 {
            return Err(LandshareError::Config(
                "Local watch interval must be greater than 0".to_string(),
            ));
        }
        if !(self.default_price.is_finite() && self.default_price > 0.0) {
            return Err(LandshareError::Config(format!(
                "Default price must be positive, got {}",
                self.default_price
            )));
        }
        if self.treasury_address.trim().is_empty() {
            return Err(LandshareError::Config(
                "Treasury address must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

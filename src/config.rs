// 7.0 config.rs: all settings in one place. cache sizing, ttl, engine switches.
// 7.1 loaded from json or built from an environment preset, then validated.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::engine::EngineConfig;

/** 7.2: size + lifetime of one bounded cache. live_s counts from the write, not the last read */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpec {
    // Maximum number of entries kept
    pub size: u64,
    // Seconds an entry stays valid after it was written
    pub live_s: u64,
}

impl CacheSpec {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.live_s)
    }

    // a zero size or ttl would silently turn every lookup into a store query
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::InvalidCache {
                reason: "wallet_ids.size must be at least 1".to_string(),
            });
        }
        if self.size > MAX_CACHE_SIZE {
            return Err(ConfigError::InvalidCache {
                reason: format!("wallet_ids.size above {}", MAX_CACHE_SIZE),
            });
        }
        if self.live_s == 0 {
            return Err(ConfigError::InvalidCache {
                reason: "wallet_ids.live_s must be at least 1 second".to_string(),
            });
        }
        // ttl is held in i64 millis
        if self
            .live_s
            .checked_mul(1_000)
            .and_then(|ms| i64::try_from(ms).ok())
            .is_none()
        {
            return Err(ConfigError::InvalidCache {
                reason: "wallet_ids.live_s out of range".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self {
            size: 1_000,
            live_s: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    // Existence cache for (client, currency) -> wallet id
    pub wallet_ids: CacheSpec,
}

// The complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationConfig {
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

// hard ceiling on entries. the cache scans linearly on eviction.
const MAX_CACHE_SIZE: u64 = 1_000_000;

impl ReservationConfig {
    // Short-lived entries, chatty decisions
    pub fn development() -> Self {
        let mut config = Self::default();
        config.cache.wallet_ids = CacheSpec {
            size: 100,
            live_s: 5,
        };
        config.engine.verbose = true;
        config
    }

    // Paper trading against recorded books
    pub fn paper() -> Self {
        let mut config = Self::default();
        config.cache.wallet_ids.live_s = 30;
        config
    }

    // Live trading. wallets are rarely created, so absence may be trusted longer
    pub fn live() -> Self {
        let mut config = Self::default();
        config.cache.wallet_ids = CacheSpec {
            size: 10_000,
            live_s: 300,
        };
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.wallet_ids.validate()
    }
}

// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid cache config: {reason}")]
    InvalidCache { reason: String },

    #[error("Cannot read config: {0}")]
    Io(String),

    #[error("Cannot parse config: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Paper,
    Live,
}

impl Environment {
    pub fn config(&self) -> ReservationConfig {
        match self {
            Environment::Development => ReservationConfig::development(),
            Environment::Paper => ReservationConfig::paper(),
            Environment::Live => ReservationConfig::live(),
        }
    }
}

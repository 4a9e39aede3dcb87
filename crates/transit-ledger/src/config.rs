//! # Ledger Configuration
//!
//! Configuration for the store connection and the ledger services.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TRANSIT_DB_PATH=/var/lib/transit/ledger.db                         │
//! │     TRANSIT_FARE_CENTS=2500                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     passed explicitly to LedgerConfig::load                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     fare 2500, 5 s lock timeout, 3 busy retries                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "ledger.db"
//! max_connections = 5
//! lock_timeout_ms = 5000
//!
//! [ledger]
//! fare_cents = 2500
//! busy_retries = 3
//! retry_backoff_ms = 50
//! card_number_attempts = 5
//! rng_seed = 42              # optional, for reproducible runs
//! audit_channel_capacity = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use transit_core::{FarePolicy, Money, DEFAULT_FARE_CENTS};
use transit_db::DbConfig;

use crate::error::{LedgerError, LedgerResult};
use crate::retry::RetryPolicy;

// =============================================================================
// Database Settings
// =============================================================================

/// Store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Use a private in-memory database instead of `path`.
    #[serde(default)]
    pub in_memory: bool,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Bound on every lock wait (SQLite `busy_timeout`).
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("transit.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_lock_timeout() -> u64 {
    5000
}
fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            in_memory: false,
            max_connections: default_max_connections(),
            lock_timeout_ms: default_lock_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// Service behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Flat trip fare in minor units.
    #[serde(default = "default_fare")]
    pub fare_cents: i64,

    /// Extra attempts after a `Busy` failure. 0 disables retrying.
    #[serde(default = "default_busy_retries")]
    pub busy_retries: u32,

    /// Linear backoff step between busy retries.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Card numbers tried before `NumberSpaceExhausted`.
    #[serde(default = "default_card_number_attempts")]
    pub card_number_attempts: u32,

    /// Seed for the card number / staff selector. Random when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Buffer of the audit failure channel. 0 disables the channel.
    #[serde(default = "default_audit_channel_capacity")]
    pub audit_channel_capacity: usize,
}

fn default_fare() -> i64 {
    DEFAULT_FARE_CENTS
}
fn default_busy_retries() -> u32 {
    3
}
fn default_retry_backoff() -> u64 {
    50
}
fn default_card_number_attempts() -> u32 {
    5
}
fn default_audit_channel_capacity() -> usize {
    64
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            fare_cents: default_fare(),
            busy_retries: default_busy_retries(),
            retry_backoff_ms: default_retry_backoff(),
            card_number_attempts: default_card_number_attempts(),
            rng_seed: None,
            audit_channel_capacity: default_audit_channel_capacity(),
        }
    }
}

impl LedgerSettings {
    /// Retry policy for `Busy` failures.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.busy_retries, Duration::from_millis(self.retry_backoff_ms))
    }

    /// Fare policy built from `fare_cents`.
    pub fn fare_policy(&self) -> LedgerResult<FarePolicy> {
        Ok(FarePolicy::flat(Money::from_cents(self.fare_cents))?)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file, when given and present
    /// 3. `TRANSIT_*` environment variables
    pub fn load(config_path: Option<&Path>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses configuration from a TOML string and validates it.
    pub fn from_toml_str(contents: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// In-memory configuration for tests and demos.
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.database.in_memory = true;
        config
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.ledger.fare_cents <= 0 {
            return Err(LedgerError::Config("fare_cents must be greater than 0".into()));
        }

        if self.ledger.card_number_attempts == 0 {
            return Err(LedgerError::Config(
                "card_number_attempts must be at least 1".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(LedgerError::Config(
                "max_connections must be at least 1".into(),
            ));
        }

        if self.database.lock_timeout_ms == 0 {
            return Err(LedgerError::Config(
                "lock_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TRANSIT_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TRANSIT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        parse_into(&lookup, "TRANSIT_DB_MAX_CONNECTIONS", &mut self.database.max_connections);
        parse_into(&lookup, "TRANSIT_LOCK_TIMEOUT_MS", &mut self.database.lock_timeout_ms);
        parse_into(&lookup, "TRANSIT_FARE_CENTS", &mut self.ledger.fare_cents);
        parse_into(&lookup, "TRANSIT_BUSY_RETRIES", &mut self.ledger.busy_retries);
        parse_into(&lookup, "TRANSIT_RETRY_BACKOFF_MS", &mut self.ledger.retry_backoff_ms);
        parse_into(
            &lookup,
            "TRANSIT_CARD_NUMBER_ATTEMPTS",
            &mut self.ledger.card_number_attempts,
        );
        parse_into(
            &lookup,
            "TRANSIT_AUDIT_CHANNEL_CAPACITY",
            &mut self.ledger.audit_channel_capacity,
        );

        if let Some(seed) = lookup("TRANSIT_RNG_SEED") {
            match seed.parse::<u64>() {
                Ok(s) => self.ledger.rng_seed = Some(s),
                Err(_) => warn!(value = %seed, "Ignoring unparsable TRANSIT_RNG_SEED"),
            }
        }
    }

    /// Store configuration derived from `[database]`.
    pub fn db_config(&self) -> DbConfig {
        let busy = Duration::from_millis(self.database.lock_timeout_ms);
        if self.database.in_memory {
            return DbConfig::in_memory().busy_timeout(busy);
        }
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(busy)
    }
}

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse::<T>() {
            Ok(v) => {
                debug!(key, "Overriding setting from environment");
                *target = v;
            }
            Err(_) => warn!(key, value = %raw, "Ignoring unparsable environment override"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Process settings loaded via OrthoConfig.
//!
//! Values come from `LEDGER_*` environment variables, CLI flags or a config
//! file. They are read once at startup and passed into the components that
//! need them; nothing reads the environment afterwards.

use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;
use zeroize::Zeroizing;

use crate::domain::{Coins, DEFAULT_INITIAL_GRANT};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_HOURS: u32 = 24;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const EPHEMERAL_KEY_LEN: usize = 32;

/// Settings that cannot be turned into a runnable configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// No database URL was supplied.
    #[error("LEDGER_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    /// No signing key was supplied and ephemeral keys are not allowed.
    #[error("LEDGER_TOKEN_SECRET must be set unless LEDGER_ALLOW_EPHEMERAL_SECRET is enabled")]
    MissingTokenSecret,
    /// The configured starting balance is negative.
    #[error("initial grant must not be negative, got {value}")]
    NegativeInitialGrant {
        /// Rejected value.
        value: Coins,
    },
}

/// Configuration for the ledger service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LEDGER")]
pub struct LedgerSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// HS256 signing key for bearer tokens.
    pub token_secret: Option<String>,
    /// Bearer token lifetime in hours.
    pub token_ttl_hours: Option<u32>,
    /// Balance granted to newly registered accounts.
    pub initial_grant: Option<Coins>,
    /// Upper bound for a single ledger store operation, in milliseconds.
    pub store_timeout_ms: Option<u64>,
    /// Maximum pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Generate a throwaway signing key when none is configured.
    #[ortho_config(default = false)]
    pub allow_ephemeral_secret: bool,
}

impl LedgerSettings {
    /// Return the database URL.
    ///
    /// # Errors
    /// [`SettingsError::MissingDatabaseUrl`] when unset or blank.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// Return the bind address, falling back to the default.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Return the token signing key.
    ///
    /// Tokens signed with an ephemeral key stop validating on restart.
    ///
    /// # Errors
    /// [`SettingsError::MissingTokenSecret`] when no key is configured and
    /// ephemeral keys are disabled.
    pub fn signing_key(&self) -> Result<Zeroizing<Vec<u8>>, SettingsError> {
        match self.token_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Ok(Zeroizing::new(secret.as_bytes().to_vec())),
            None if self.allow_ephemeral_secret => {
                warn!("using ephemeral token signing key (dev only)");
                let key: [u8; EPHEMERAL_KEY_LEN] = rand::random();
                Ok(Zeroizing::new(key.to_vec()))
            }
            None => Err(SettingsError::MissingTokenSecret),
        }
    }

    /// Return the bearer token lifetime, falling back to the default.
    pub fn token_ttl(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(
            self.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS),
        ))
    }

    /// Return the starting balance for new accounts.
    ///
    /// # Errors
    /// [`SettingsError::NegativeInitialGrant`] when configured below zero.
    pub fn initial_grant(&self) -> Result<Coins, SettingsError> {
        match self.initial_grant {
            Some(value) if value < 0 => Err(SettingsError::NegativeInitialGrant { value }),
            Some(value) => Ok(value),
            None => Ok(DEFAULT_INITIAL_GRANT),
        }
    }

    /// Return the per-operation store deadline, falling back to the default.
    pub fn store_deadline(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms.unwrap_or(DEFAULT_STORE_TIMEOUT_MS))
    }

    /// Return the pool size, falling back to the default.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }
}

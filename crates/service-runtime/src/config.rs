//! # Runtime Configuration
//!
//! Loaded once at startup from the environment. The master secret is the
//! one setting that can never be defaulted: absent or wrong-length material
//! is a fatal startup error, because every wrapped secret already persisted
//! becomes unreadable under a different key.

use av_02_envelope_vault::{MasterSecret, VaultError};
use thiserror::Error;
use tracing::info;

/// Environment variable holding the base64 master secret.
pub const MASTER_SECRET_VAR: &str = "ARCHIVE_MASTER_SECRET";

/// Environment variable overriding the due-loan scan interval (seconds).
pub const SCAN_INTERVAL_VAR: &str = "ARCHIVE_SCAN_INTERVAL_SECS";

const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3600;

/// Configuration errors. All fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The master secret variable is not set
    #[error("{MASTER_SECRET_VAR} is not set; refusing to start without a master secret")]
    MissingMasterSecret,

    /// The master secret failed validation
    #[error("Master secret rejected: {0}")]
    InvalidMasterSecret(#[from] VaultError),

    /// A numeric setting could not be parsed
    #[error("Invalid value for {variable}: {message}")]
    InvalidSetting {
        /// Which environment variable
        variable: &'static str,
        message: String,
    },
}

/// Validated runtime settings.
#[derive(Debug)]
pub struct ServiceConfig {
    /// The process-wide wrapping key
    pub master_secret: MasterSecret,
    /// How often the due-loan scan runs
    pub scan_interval_secs: u64,
}

impl ServiceConfig {
    /// Load and validate configuration from the environment.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]; callers should treat all of them as fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        let encoded =
            std::env::var(MASTER_SECRET_VAR).map_err(|_| ConfigError::MissingMasterSecret)?;
        let master_secret = MasterSecret::from_base64(&encoded)?;

        let scan_interval_secs = match std::env::var(SCAN_INTERVAL_VAR) {
            Ok(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidSetting {
                    variable: SCAN_INTERVAL_VAR,
                    message: e.to_string(),
                }
            })?,
            Err(_) => DEFAULT_SCAN_INTERVAL_SECS,
        };

        info!(scan_interval_secs, "Configuration loaded");
        Ok(Self {
            master_secret,
            scan_interval_secs,
        })
    }
}

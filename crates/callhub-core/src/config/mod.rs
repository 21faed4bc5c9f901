//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a serde default, so an empty file (or no
//! file at all) yields a runnable configuration.

pub mod app;
pub mod auth;
pub mod logging;
pub mod realtime;
pub mod signaling;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::signaling::{MAX_RING_TIMEOUT_SECONDS, SignalingConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay + `CALLHUB__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Real-time WebSocket settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Call routing policy.
    #[serde(default)]
    pub signaling: SignalingConfig,
    /// Connection authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `{dir}/default.toml` with `{dir}/{env}.toml` and environment
    /// variables prefixed with `CALLHUB__` (double underscore separates
    /// nested keys, e.g. `CALLHUB__SERVER__PORT=9000`).
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CALLHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject timer settings the runtime cannot honor.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.realtime.ping_interval_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.ping_interval_seconds must be at least 1",
            ));
        }
        if self.signaling.sweep_interval_seconds == 0 {
            return Err(AppError::configuration(
                "signaling.sweep_interval_seconds must be at least 1",
            ));
        }
        let ring = self.signaling.ring_timeout_seconds;
        if ring == 0 || ring > MAX_RING_TIMEOUT_SECONDS {
            return Err(AppError::configuration(format!(
                "signaling.ring_timeout_seconds must be between 1 and {MAX_RING_TIMEOUT_SECONDS}, got {ring}"
            )));
        }
        Ok(())
    }
}

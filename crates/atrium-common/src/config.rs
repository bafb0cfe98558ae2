//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG.get().expect("Config not initialized. Call atrium_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("room.id", "main-room")?
        .set_default("room.name", "Main Room")?
        .set_default("room.max_occupants", 5)?
        .set_default("room.description", "The shared room where everyone gathers")?
        .set_default("presence.connect_timeout_secs", 5)?
        .set_default("presence.event_log_capacity", 10)?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (ATRIUM_SERVER__HOST, ATRIUM_ROOM__MAX_OCCUPANTS, etc.)
        .add_source(
            config::Environment::with_prefix("ATRIUM")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub room: RoomConfig,
    pub presence: PresenceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// The statically defined room this deployment hosts.
///
/// Rooms are not created or destroyed at runtime; a single fixed room is
/// configured at process start.
#[derive(Debug, Deserialize, Clone)]
pub struct RoomConfig {
    pub id: String,
    pub name: String,
    /// Hard occupancy cap. Must be > 0.
    pub max_occupants: usize,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresenceConfig {
    /// Hard deadline for a channel subscription to reach the subscribed state.
    pub connect_timeout_secs: u64,
    /// How many recent presence events the activity feed retains.
    pub event_log_capacity: usize,
}

impl PresenceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

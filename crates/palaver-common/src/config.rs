//! Client configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables otherwise.
//! Config precedence: env vars > .env file > palaver.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

use crate::models::{MediaKind, UserId};

static CONFIG: OnceLock<ClientConfig> = OnceLock::new();

/// Get the global client configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static ClientConfig {
    CONFIG.get().expect("Config not initialized. Call palaver_common::config::init() first.")
}

/// Initialize the global configuration from the environment.
///
/// Should be called once at startup, before any other code accesses config.
pub fn init() -> Result<&'static ClientConfig, config::ConfigError> {
    let cfg = load()?;
    Ok(CONFIG.get_or_init(|| cfg))
}

/// Load configuration without touching the global slot.
pub fn load() -> Result<ClientConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    defaults()?
        // Optional config file
        .add_source(config::File::with_name("palaver").required(false))
        // Environment variables (PALAVER__RELAY__URL, PALAVER__IDENTITY__USER_ID, etc.)
        .add_source(
            config::Environment::with_prefix("PALAVER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// Builder pre-populated with every default. `identity.user_id` has none and
/// must come from a file, the environment, or an override.
pub fn defaults()
-> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("api.base_url", "http://localhost:5001")?
        .set_default("api.timeout_secs", 10)?
        .set_default("relay.url", "ws://localhost:5001/relay")?
        .set_default("relay.outbound_buffer", 256)?
        .set_default("calls.default_media", "video")?
        .set_default("log.filter", "palaver=debug")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub relay: RelayConfig,
    pub identity: IdentityConfig,
    pub calls: CallsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the chat server (REST endpoints live under `/api`).
    pub base_url: String,
    pub timeout_secs: u64,
    /// Value of the server's `session` cookie, sent on REST and relay requests.
    #[serde(default)]
    pub session_cookie: Option<String>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// WebSocket URL of the relay channel.
    pub url: String,
    /// Capacity of the outbound frame queue.
    pub outbound_buffer: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Logical user identity the relay routes to.
    pub user_id: UserId,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CallsConfig {
    /// Media requested when a call is started without an explicit kind.
    pub default_media: MediaKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

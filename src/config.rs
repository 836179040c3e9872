use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Deserialize)]
pub struct Config {
    pub listen: ListenConfig,
    pub auth: AuthConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Deserialize)]
pub struct ListenConfig {
    pub ip: String,
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for session-token verification; the token-issuing
    /// endpoint signs with the same value.
    pub token_secret: String,
}

#[derive(Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base address of the provider's streaming speak endpoint,
    /// e.g. `wss://api.example.com/v1/speak`.
    pub speak_url: String,
    /// Provider API key sent on the upstream leg.
    pub api_key: String,
}

pub fn load_config() -> Result<Config> {
    let content = fs::read_to_string("config.toml").context("Failed to read config.toml file")?;
    toml::from_str(&content).context("Failed to parse config.toml as valid TOML")
}

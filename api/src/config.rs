use dotenv::dotenv;
use std::net::SocketAddr;

use shared::ConfigError;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_ISSUER: &str = "PropTradePro";

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub bind: SocketAddr,
    /// Issuer shown in authenticator apps.
    pub issuer: String,
}

impl SandboxConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_bind = std::env::var("SANDBOX_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind = raw_bind.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "SANDBOX_BIND",
            value: raw_bind.clone(),
        })?;

        Ok(SandboxConfig {
            bind,
            issuer: std::env::var("SANDBOX_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
        })
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

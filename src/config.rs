//! Environment-driven server configuration.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::mcp::service::ServerIdentity;

/// MCP protocol version this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Header the API-key gate reads the key from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyHeader {
    XApiKey,
    Authorization,
}

impl ApiKeyHeader {
    pub fn name(&self) -> &'static str {
        match self {
            ApiKeyHeader::XApiKey => "X-API-Key",
            ApiKeyHeader::Authorization => "Authorization",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_name: String,
    pub server_version: String,
    pub bind: SocketAddr,
    pub keep_alive_interval: Duration,
    pub require_api_key: bool,
    pub api_key: Option<String>,
    pub api_key_header: ApiKeyHeader,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind = env::var("BIND_ADDR")
            .ok()
            .and_then(|addr| addr.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let keep_alive_secs = env::var("KEEP_ALIVE_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok())
            .unwrap_or(30);

        let api_key_header = match env::var("API_KEY_HEADER").as_deref() {
            Ok("Authorization") => ApiKeyHeader::Authorization,
            _ => ApiKeyHeader::XApiKey,
        };

        ServerConfig {
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            bind,
            keep_alive_interval: Duration::from_secs(keep_alive_secs),
            require_api_key: !env_flag_disabled("REQUIRE_API_KEY"),
            api_key: env::var("API_KEY").ok().filter(|key| !key.is_empty()),
            api_key_header,
        }
    }

    /// Identity block handed to the dispatcher for `initialize` responses.
    pub fn identity(&self) -> ServerIdentity {
        ServerIdentity {
            name: self.server_name.clone(),
            version: self.server_version.clone(),
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

fn env_flag_disabled(key: &str) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "false" | "0" | "no"),
        Err(_) => false,
    }
}

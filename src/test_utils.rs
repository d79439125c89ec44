//! Shared helpers for unit and integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::{ApiKeyHeader, ServerConfig};
use crate::mcp::tools::builtin_tools;
use crate::AppState;

/// Config with the API-key gate disabled and a short keep-alive, suitable
/// for most tests. Never reads the environment.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        server_name: "relaymcp".to_string(),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        bind: SocketAddr::from(([127, 0, 0, 1], 0)),
        keep_alive_interval: Duration::from_secs(30),
        require_api_key: false,
        api_key: None,
        api_key_header: ApiKeyHeader::XApiKey,
    }
}

/// App state over the builtin tool registry.
pub fn test_state() -> AppState {
    AppState::new(test_config(), builtin_tools())
}

/// App state with the API-key gate enabled for `key`.
pub fn gated_state(key: Option<&str>, header: ApiKeyHeader) -> AppState {
    let mut config = test_config();
    config.require_api_key = true;
    config.api_key = key.map(str::to_string);
    config.api_key_header = header;
    AppState::new(config, builtin_tools())
}

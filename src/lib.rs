pub mod config;
pub mod error;
pub mod mcp;
pub mod middleware;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::mcp::service::McpService;
use crate::mcp::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub service: McpService,
    pub sessions: SessionStore,
}

impl AppState {
    /// Wire up a full application state from configuration.
    ///
    /// The session store and dispatcher are constructed here so their
    /// lifecycle is tied to the server process, not to module state.
    pub fn new(config: ServerConfig, registry: mcp::tools::ToolRegistry) -> Self {
        let config = Arc::new(config);
        let sessions = SessionStore::new(config.keep_alive_interval);
        let service = McpService::new(Arc::new(registry), config.identity());
        Self {
            config,
            service,
            sessions,
        }
    }
}

use relaymcp::config::ServerConfig;
use relaymcp::mcp::{app, builtin_tools};
use relaymcp::AppState;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaymcp=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let bind = config.bind;

    if config.require_api_key && config.api_key.is_none() {
        tracing::warn!("API key gate is enabled but API_KEY is not set; MCP endpoints will 500");
    }

    let state = AppState::new(config, builtin_tools());
    let router = app(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;

    Ok(())
}

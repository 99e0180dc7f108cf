use std::sync::Arc;

use ouicomply_mcp::{
    build_app,
    compliance::StaticComplianceEngine,
    config::{Config, Transport},
    logging, stdio, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let provider = Arc::new(StaticComplianceEngine::new());
    let state = AppState::new(config.api_token.clone(), config.call_timeout, provider);

    match config.transport {
        Transport::Stdio => {
            info!("serving MCP over stdio");
            stdio::run_stdio(state).await?;
        }
        Transport::Http => {
            let bind_socket = config.bind_socket()?;
            let app = build_app(state);
            let listener = tokio::net::TcpListener::bind(bind_socket).await?;

            info!(
                bind_addr = %config.bind_addr,
                bind_port = config.bind_port,
                "server starting"
            );

            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}

//! Serve command - Starts the HTTP server.

use std::net::SocketAddr;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, Database};

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");
    config.server_host = args.host;
    config.server_port = args.port;

    // Connects and applies pending migrations
    let db = Database::connect(&config).await?;

    let cache = Cache::try_connect(&config).await?;

    let app_state = AppState::from_config(db, cache, config.clone());
    let app = create_router(app_state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(url = %config.app_url, "Server running on http://{}", addr);

    // Client addresses feed the login rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}

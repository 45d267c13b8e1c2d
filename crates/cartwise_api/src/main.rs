//! Main entry point for the Cartwise API server

use axum::http::HeaderValue;
use cartwise_api::{router, AppState};
use cartwise_runtime::EngineConfig;
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cartwise_api=info,cartwise_orchestrator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    let state = AppState::from_config(&config).await?;

    let cors = if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = router(state).layer(cors);

    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Cartwise API server starting on http://{addr}");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /api/health - Health check");
    tracing::info!("  POST /api/orchestrate - Full orchestrated recommendation");
    tracing::info!("  POST /api/orchestrate/simple - Query-only orchestration");
    tracing::info!("  POST /api/search - Hybrid product search");
    tracing::info!("  POST /api/compare - Compare 2-5 products");
    tracing::info!("  POST /api/buyplan - Payment plan for a product");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

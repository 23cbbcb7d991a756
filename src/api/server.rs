//! API server setup

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_context_middleware},
    routes::create_router,
};
use crate::config::ApiSettings;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub struct ApiServer {
    config: ApiSettings,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiSettings, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Serve until the shutdown signal flips.
    pub async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.create_app();
        let addr = self.socket_addr()?;

        info!("starting tombola API server");
        info!("   listen: http://{addr}");
        self.log_endpoints();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        info!("API server stopped");
        Ok(())
    }

    fn create_app(&self) -> axum::Router {
        create_router(self.state.clone())
            // Request context first so every response carries an id
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                request_context_middleware,
            ))
            // CORS before timeout to handle preflight
            .layer(create_cors_layer(self.config.allowed_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error + Send + Sync>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_endpoints(&self) {
        info!("available endpoints:");
        info!("   GET  /health                      - health check");
        info!("   GET  /status                      - raffle status");
        info!("   POST /enter                       - enter the current round");
        info!("   GET  /upkeep                      - upkeep predicate");
        info!("   POST /upkeep                      - trigger round closure");
        info!("   POST /oracle/fulfill/:request_id  - force oracle callback");
        info!("   GET  /players, /players/:index    - registered players");
        info!("   GET  /winner                      - most recent winner");
        info!("   GET  /rounds                      - settled round history");
        info!("   GET  /events                      - SSE notifications");
        info!("   GET  /metrics                     - Prometheus metrics");
    }
}

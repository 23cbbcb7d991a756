//! Route definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Raffle status and reads
        .route("/status", get(status_handler))
        .route("/players", get(players_handler))
        .route("/players/:index", get(player_handler))
        .route("/winner", get(winner_handler))
        // Entry
        .route("/enter", post(enter_handler))
        // Automation interface
        .route(
            "/upkeep",
            get(upkeep_status_handler).post(perform_upkeep_handler),
        )
        // Oracle callback
        .route("/oracle/fulfill/:request_id", post(fulfill_handler))
        // Round history
        .route("/rounds", get(rounds_handler))
        // Live notifications
        .route("/events", get(events_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))
        // Attach shared state
        .with_state(state)
}

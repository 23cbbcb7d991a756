//! Request handlers

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::history::RoundStore;
use crate::metrics::MetricsRegistry;
use crate::oracle::VrfCoordinator;
use crate::raffle::Raffle;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Extension, Json,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;

/// Shared application state
pub struct AppState {
    pub raffle: Arc<Raffle>,
    pub coordinator: Arc<VrfCoordinator>,
    pub rounds: Option<Arc<RoundStore>>,
    pub metrics: Arc<MetricsRegistry>,
    pub version: String,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
    })
}

/// GET /status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let raffle = &state.raffle;
    Json(StatusResponse {
        state: raffle.state(),
        entrance_fee: raffle.entrance_fee(),
        interval_secs: raffle.interval_secs(),
        player_count: raffle.player_count(),
        pot: raffle.pot(),
        last_timestamp: datetime_from_unix(raffle.last_timestamp()),
        recent_winner: raffle.recent_winner(),
        pending_request: raffle.pending_request(),
        version: state.version.clone(),
    })
}

/// POST /enter
pub async fn enter_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnterRequest>,
) -> Result<Json<EnterResponse>, ApiError> {
    let player = request.player.trim();
    if player.is_empty() {
        return Err(ApiError::bad_request(
            request_id.0,
            "player must not be empty".to_string(),
        ));
    }

    state
        .raffle
        .enter(player, request.fee_paid)
        .map_err(|e| ApiError::from_raffle(request_id.0.clone(), e))?;
    MetricsRegistry::inc(&state.metrics.entries_total);

    Ok(Json(EnterResponse {
        player_count: state.raffle.player_count(),
        pot: state.raffle.pot(),
    }))
}

/// GET /upkeep
pub async fn upkeep_status_handler(State(state): State<Arc<AppState>>) -> Json<UpkeepResponse> {
    let status = state.raffle.check_upkeep();
    Json(UpkeepResponse {
        upkeep_needed: status.needed(),
        status,
    })
}

/// POST /upkeep
pub async fn perform_upkeep_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PerformUpkeepResponse>, ApiError> {
    let id = state
        .raffle
        .perform_upkeep()
        .map_err(|e| ApiError::from_raffle(request_id.0, e))?;
    MetricsRegistry::inc(&state.metrics.randomness_requests_total);
    Ok(Json(PerformUpkeepResponse { request_id: id }))
}

/// GET /players
pub async fn players_handler(State(state): State<Arc<AppState>>) -> Json<PlayersResponse> {
    let players = state.raffle.players();
    Json(PlayersResponse {
        count: players.len(),
        players,
    })
}

/// GET /players/:index
pub async fn player_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<PlayerResponse>, ApiError> {
    let player = state
        .raffle
        .player(index)
        .map_err(|e| ApiError::from_raffle(request_id.0, e))?;
    Ok(Json(PlayerResponse { index, player }))
}

/// GET /winner
pub async fn winner_handler(State(state): State<Arc<AppState>>) -> Json<WinnerResponse> {
    Json(WinnerResponse {
        recent_winner: state.raffle.recent_winner(),
    })
}

/// POST /oracle/fulfill/:request_id
///
/// Forces immediate delivery of an outstanding request, the HTTP rendition
/// of the coordinator call test harnesses use instead of waiting out the
/// oracle latency.
pub async fn fulfill_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<FulfillResponse>, ApiError> {
    state
        .coordinator
        .fulfill(id, state.raffle.as_ref())
        .await
        .map_err(|e| ApiError::from_raffle(request_id.0, e))?;
    MetricsRegistry::inc(&state.metrics.rounds_completed_total);

    Ok(Json(FulfillResponse {
        request_id: id,
        winner: state.raffle.recent_winner(),
    }))
}

/// GET /rounds
pub async fn rounds_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoundsQuery>,
) -> Result<Json<RoundsResponse>, ApiError> {
    let Some(rounds) = &state.rounds else {
        return Err(ApiError::service_unavailable(
            request_id.0,
            "round history is not enabled".to_string(),
        ));
    };

    let limit = query.limit.unwrap_or(20).min(100);
    let records = rounds
        .load_recent(limit)
        .map_err(|e| ApiError::internal_error(request_id.0, e.to_string()))?;

    Ok(Json(RoundsResponse {
        rounds: records.into_iter().map(RoundSummary::from).collect(),
    }))
}

/// GET /events — live raffle notifications over SSE.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.raffle.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|event| async move {
        // lagged receivers skip ahead; malformed events are dropped
        let event = event.ok()?;
        let sse = Event::default()
            .event(event.name())
            .json_data(&event)
            .ok()?;
        Some(Ok(sse))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus_format(),
    )
}

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::{
    error::{ApiError, ResponseCode},
    protocol::{CommandData, CommandResponse, ExecuteCommandRequest, HistoryEntry, PlacementRequest},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

mod api;
mod app_state;
mod config;

use api::SimulationStore;
use app_state::AppState;
use config::load_settings;

const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    #[serde(default)]
    simulation_id: String,
    limit: Option<usize>,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let simulations = SimulationStore::new(
        settings.simulator_options(),
        settings.pull_delay(),
        settings.max_simulations,
    );
    let app = build_router(Arc::new(AppState { simulations }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(
        %addr,
        pull_delay_ms = settings.pull_delay_ms,
        max_simulations = settings.max_simulations,
        grid = %format!("{}x{}", settings.grid_columns, settings.grid_rows),
        "server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/docker/execute", post(http_execute))
        .route("/api/docker/history", get(http_history))
        .route("/api/simulations/:simulation_id/state", get(http_state))
        .route(
            "/api/simulations/:simulation_id/placements",
            post(http_place),
        )
        .route("/api/simulations/:simulation_id", delete(http_reset))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .with_state(state)
}

fn status_for(code: ResponseCode) -> StatusCode {
    match code {
        ResponseCode::Success => StatusCode::OK,
        ResponseCode::NotFound => StatusCode::NOT_FOUND,
        ResponseCode::Conflict => StatusCode::CONFLICT,
        ResponseCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ResponseCode::UnknownCommand | ResponseCode::MissingArgument | ResponseCode::Validation => {
            StatusCode::BAD_REQUEST
        }
    }
}

fn http_error(err: ApiError) -> HttpError {
    (status_for(err.code), Json(err))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_execute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteCommandRequest>,
) -> Result<Json<CommandResponse>, HttpError> {
    api::execute_command(&state.simulations, req)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, HttpError> {
    api::command_history(&state.simulations, &q.simulation_id, q.limit)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_state(
    State(state): State<Arc<AppState>>,
    Path(simulation_id): Path<String>,
) -> Result<Json<CommandData>, HttpError> {
    api::simulation_state(&state.simulations, &simulation_id)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_place(
    State(state): State<Arc<AppState>>,
    Path(simulation_id): Path<String>,
    Json(req): Json<PlacementRequest>,
) -> Result<Json<CommandData>, HttpError> {
    api::place_container(&state.simulations, &simulation_id, req)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_reset(
    State(state): State<Arc<AppState>>,
    Path(simulation_id): Path<String>,
) -> Result<StatusCode, HttpError> {
    api::reset_simulation(&state.simulations, &simulation_id)
        .await
        .map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

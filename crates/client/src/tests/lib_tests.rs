use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::protocol::SUCCESS_MESSAGE;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct StubState {
    received: Arc<Mutex<Vec<ExecuteCommandRequest>>>,
    history_query: Arc<Mutex<Option<HashMap<String, String>>>>,
}

async fn stub_execute(
    State(state): State<StubState>,
    Json(req): Json<ExecuteCommandRequest>,
) -> Json<CommandResponse> {
    let output = format!("echo {}", req.command);
    state.received.lock().await.push(req);
    Json(CommandResponse::success(CommandData {
        output,
        ..CommandData::default()
    }))
}

async fn stub_history(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<HistoryEntry>> {
    *state.history_query.lock().await = Some(query);
    Json(Vec::new())
}

async fn stub_state(Path(simulation_id): Path<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(
            ResponseCode::NotFound,
            format!("no simulation {simulation_id}"),
        )),
    )
}

async fn spawn_stub_server(state: StubState) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/api/docker/execute", post(stub_execute))
        .route("/api/docker/history", get(stub_history))
        .route("/api/simulations/:simulation_id/state", get(stub_state))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn local_backend_runs_commands_in_process() {
    let backend = LocalBackend::new(SimulatorOptions::default(), Duration::ZERO, Some(UserId(3)));
    let response = backend
        .execute("docker network create staging")
        .await
        .expect("execute");
    assert!(response.is_success());

    let state = backend.state().await.expect("state");
    assert!(state.networks.iter().any(|n| n.name == "staging"));

    let history = backend.history(10).await.expect("history");
    assert_eq!(history[0].user_id, Some(UserId(3)));
}

#[tokio::test]
async fn local_backend_forwards_pull_notices() {
    let backend = LocalBackend::new(
        SimulatorOptions::default(),
        Duration::from_millis(10),
        None,
    );
    let mut notices = backend.notices().expect("local notices");
    backend.execute("docker pull alpine").await.expect("pull");
    let line = tokio::time::timeout(Duration::from_secs(2), notices.recv())
        .await
        .expect("in time")
        .expect("notice");
    assert_eq!(line, "Successfully pulled alpine:latest");
}

#[tokio::test]
async fn remote_backend_posts_execute_request() {
    let state = StubState::default();
    let server_url = spawn_stub_server(state.clone()).await;
    let backend = RemoteBackend::new(&server_url, "sim-1", UserId(9)).expect("backend");

    let response = backend.execute("docker ps").await.expect("execute");
    assert_eq!(response.message, SUCCESS_MESSAGE);
    assert_eq!(response.terminal_text(), "echo docker ps");

    let received = state.received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].simulation_id, "sim-1");
    assert_eq!(received[0].user_id, UserId(9));
}

#[tokio::test]
async fn remote_backend_sends_history_query() {
    let state = StubState::default();
    let server_url = spawn_stub_server(state.clone()).await;
    let backend = RemoteBackend::new(&server_url, "sim-1", UserId(1)).expect("backend");

    let history = backend.history(5).await.expect("history");
    assert!(history.is_empty());
    let query = state.history_query.lock().await.clone().expect("query");
    assert_eq!(query.get("simulationId").map(String::as_str), Some("sim-1"));
    assert_eq!(query.get("limit").map(String::as_str), Some("5"));
    assert!(backend.notices().is_none());
}

#[tokio::test]
async fn remote_backend_surfaces_api_errors() {
    let server_url = spawn_stub_server(StubState::default()).await;
    let backend = RemoteBackend::new(&server_url, "lab 1", UserId(1)).expect("backend");

    let err = backend.state().await.expect_err("stub rejects");
    match err {
        ClientError::Api { status, error } => {
            assert_eq!(status, 404);
            assert_eq!(error.code, ResponseCode::NotFound);
            assert_eq!(error.message, "no simulation lab 1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn remote_backend_validates_server_url() {
    assert!(matches!(
        RemoteBackend::new("not a url", "sim", UserId(1)),
        Err(ClientError::InvalidUrl { .. })
    ));
    assert!(matches!(
        RemoteBackend::new("ftp://example.com", "sim", UserId(1)),
        Err(ClientError::UnsupportedScheme(scheme)) if scheme == "ftp"
    ));
    let backend = RemoteBackend::new("http://localhost:8080/", "sim", UserId(1)).expect("ok");
    assert_eq!(backend.simulation_id(), "sim");
    assert_eq!(
        backend
            .endpoint(&["api", "docker", "execute"])
            .expect("endpoint")
            .as_str(),
        "http://localhost:8080/api/docker/execute"
    );
}

#[tokio::test]
async fn local_backend_settle_lands_pending_pulls() {
    let backend = LocalBackend::new(
        SimulatorOptions::default(),
        Duration::from_millis(20),
        None,
    );
    backend.execute("docker pull alpine").await.expect("pull");
    backend.settle().await;
    let state = backend.state().await.expect("state");
    assert!(state.images.iter().any(|image| image.image_name == "alpine"));
}

use super::*;
use shared::domain::UserId;

fn store() -> SimulationStore {
    SimulationStore::new(SimulatorOptions::default(), Duration::ZERO, 8)
}

fn request(simulation_id: &str, command: &str) -> ExecuteCommandRequest {
    ExecuteCommandRequest {
        command: command.into(),
        simulation_id: simulation_id.into(),
        user_id: UserId(1),
    }
}

#[tokio::test]
async fn simulations_are_isolated_and_created_lazily() {
    let store = store();
    assert_eq!(store.len().await, 0);

    execute_command(&store, request("a", "docker volume create data"))
        .await
        .expect("execute");
    let b = simulation_state(&store, "b").await.expect("state");
    assert!(b.volumes.is_empty());
    let a = simulation_state(&store, "a").await.expect("state");
    assert_eq!(a.volumes.len(), 1);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn command_errors_are_responses_not_api_errors() {
    let store = store();
    let response = execute_command(&store, request("sim", "docker rmi ghost"))
        .await
        .expect("exchange");
    assert_eq!(response.code, ResponseCode::NotFound);
    assert!(response.data.is_none());
}

#[tokio::test]
async fn blank_fields_are_validation_errors() {
    let store = store();
    let err = execute_command(&store, request("  ", "docker ps"))
        .await
        .expect_err("blank simulation");
    assert_eq!(err.code, ResponseCode::Validation);

    let err = execute_command(&store, request("sim", ""))
        .await
        .expect_err("blank command");
    assert_eq!(err.code, ResponseCode::Validation);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn history_limit_defaults_and_clamps() {
    let store = store();
    for _ in 0..25 {
        execute_command(&store, request("sim", "docker ps"))
            .await
            .expect("execute");
    }
    assert_eq!(
        command_history(&store, "sim", None).await.expect("history").len(),
        DEFAULT_HISTORY_PAGE
    );
    assert_eq!(
        command_history(&store, "sim", Some(0)).await.expect("history").len(),
        1
    );
    assert_eq!(
        command_history(&store, "sim", Some(500)).await.expect("history").len(),
        25
    );
}

#[tokio::test]
async fn placement_errors_keep_their_codes() {
    let store = store();
    execute_command(&store, request("sim", "docker run --name web nginx"))
        .await
        .expect("run");

    let data = place_container(
        &store,
        "sim",
        PlacementRequest {
            container: "web".into(),
            slot: 7,
        },
    )
    .await
    .expect("place");
    assert_eq!(data.containers[0].slot, Some(7));

    let err = place_container(
        &store,
        "sim",
        PlacementRequest {
            container: "ghost".into(),
            slot: 0,
        },
    )
    .await
    .expect_err("ghost");
    assert_eq!(err.code, ResponseCode::NotFound);

    let err = place_container(
        &store,
        "sim",
        PlacementRequest {
            container: "web".into(),
            slot: 24,
        },
    )
    .await
    .expect_err("range");
    assert_eq!(err.code, ResponseCode::Validation);
}

#[tokio::test]
async fn reset_starts_the_simulation_over() {
    let store = store();
    execute_command(&store, request("sim", "docker run nginx"))
        .await
        .expect("run");
    reset_simulation(&store, "sim").await.expect("reset");
    assert_eq!(store.len().await, 0);

    let state = simulation_state(&store, "sim").await.expect("state");
    assert!(state.containers.is_empty());
    reset_simulation(&store, "never-seen").await.expect("reset unknown");
}

#[tokio::test]
async fn least_recently_used_simulation_is_evicted_at_capacity() {
    let store = SimulationStore::new(SimulatorOptions::default(), Duration::ZERO, 2);
    for simulation_id in ["a", "b"] {
        execute_command(&store, request(simulation_id, "docker volume create data"))
            .await
            .expect("execute");
    }
    simulation_state(&store, "a").await.expect("touch a");

    execute_command(&store, request("c", "docker ps"))
        .await
        .expect("execute");
    assert_eq!(store.len().await, 2);

    let a = simulation_state(&store, "a").await.expect("a kept");
    assert_eq!(a.volumes.len(), 1);
    let b = simulation_state(&store, "b").await.expect("b recreated");
    assert!(b.volumes.is_empty());
}

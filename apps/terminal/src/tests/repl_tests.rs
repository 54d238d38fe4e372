use std::time::Duration;

use super::*;
use client::LocalBackend;
use dispatcher::SimulatorOptions;

fn backend() -> LocalBackend {
    LocalBackend::new(SimulatorOptions::default(), Duration::ZERO, None)
}

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).expect("utf8")
}

#[tokio::test]
async fn commands_print_their_output() {
    let backend = backend();
    let mut out = Vec::new();
    let step = handle_line(&backend, "docker volume create data", &mut out)
        .await
        .expect("line");
    assert_eq!(step, Step::Continue);
    assert_eq!(text(out), "data\n");
}

#[tokio::test]
async fn failures_print_an_error_line() {
    let backend = backend();
    let mut out = Vec::new();
    handle_line(&backend, "docker stop ghost", &mut out)
        .await
        .expect("line");
    assert_eq!(text(out), "Error: container not found: ghost\n");
}

#[tokio::test]
async fn builtins_are_handled_locally() {
    let backend = backend();
    let mut out = Vec::new();
    assert_eq!(
        handle_line(&backend, "  ", &mut out).await.expect("blank"),
        Step::Continue
    );
    assert_eq!(
        handle_line(&backend, "quit", &mut out).await.expect("quit"),
        Step::Exit
    );
    handle_line(&backend, "clear", &mut out).await.expect("clear");
    assert_eq!(text(out), CLEAR_SCREEN);
}

#[tokio::test]
async fn history_lists_oldest_first_and_marks_failures() {
    let backend = backend();
    let mut out = Vec::new();
    run_lines(
        &backend,
        ["docker ps", "docker nope", "history"],
        &mut out,
    )
    .await
    .expect("run");
    let out = text(out);
    assert!(out.contains("   1  docker ps\n"));
    assert!(out.contains("   2! docker nope\n"));
}

#[tokio::test]
async fn run_lines_skips_comments_and_stops_at_exit() {
    let backend = backend();
    let mut out = Vec::new();
    let script = "# setup\ndocker network create staging\nexit\ndocker network create never\n";
    run_lines(&backend, script.lines(), &mut out)
        .await
        .expect("run");

    let out = text(out);
    assert!(out.starts_with(&format!("{PROMPT}docker network create staging\n")));
    assert!(!out.contains("never"));
    let state = backend.state().await.expect("state");
    assert_eq!(state.networks.len(), 2);
}

#[tokio::test]
async fn interactive_reads_until_eof() {
    let backend = backend();
    let mut out = Vec::new();
    let input: &[u8] = b"docker volume create data\ndocker volume ls -q\n";
    interactive(&backend, input, &mut out).await.expect("loop");

    let out = text(out);
    assert_eq!(out.matches(PROMPT).count(), 3);
    assert!(out.contains("data\n"));
}

#[tokio::test]
async fn batch_mode_waits_for_pulls_before_the_next_line() {
    let backend = LocalBackend::new(SimulatorOptions::default(), Duration::from_millis(50), None);
    let mut out = Vec::new();
    run_lines(
        &backend,
        ["docker pull alpine", "docker run --name box alpine"],
        &mut out,
    )
    .await
    .expect("run");

    let out = text(out);
    assert!(out.contains("Pulling alpine:latest...\nSuccessfully pulled alpine:latest\n"));
    assert!(!out.contains("Error:"));
    let state = backend.state().await.expect("state");
    assert_eq!(state.containers.len(), 1);
    assert_eq!(state.containers[0].name, "box");
}

use std::io::Write;

use anyhow::Result;
use client::CommandBackend;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::broadcast,
};
use tracing::warn;

pub(crate) const PROMPT: &str = "docker-sim:~$ ";
const HISTORY_PAGE: usize = 20;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

const HELP: &[&str] = &[
    "docker run [-d] [-p HOST:CONTAINER] [--name NAME] [--network NET] [-v VOL:PATH] IMAGE",
    "docker ps [-a] [-q]            docker images [-q]       docker pull IMAGE",
    "docker start|stop|restart REF  docker rm [-f] REF       docker rmi [-f] IMAGE|ID",
    "docker inspect REF             docker container ls|run|start|stop|restart|rm|inspect|prune",
    "docker image ls|pull|rm|inspect|prune [-a]",
    "docker volume create|ls|rm|inspect|prune",
    "docker network create|ls|rm|inspect|connect|disconnect|prune",
    "history, clear, help, exit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Continue,
    Exit,
}

/// Runs one terminal line: a built-in or a command for the backend. Backend failures are
/// printed and the session goes on.
pub(crate) async fn handle_line(
    backend: &dyn CommandBackend,
    line: &str,
    out: &mut impl Write,
) -> Result<Step> {
    let line = line.trim();
    match line {
        "" => return Ok(Step::Continue),
        "exit" | "quit" => return Ok(Step::Exit),
        "clear" => write!(out, "{CLEAR_SCREEN}")?,
        "help" => {
            for help in HELP {
                writeln!(out, "{help}")?;
            }
        }
        "history" => match backend.history(HISTORY_PAGE).await {
            Ok(entries) => {
                for (index, entry) in entries.iter().rev().enumerate() {
                    let marker = if entry.success { ' ' } else { '!' };
                    writeln!(out, "{:>4}{marker} {}", index + 1, entry.command)?;
                }
            }
            Err(err) => writeln!(out, "error: {err}")?,
        },
        command => match backend.execute(command).await {
            Ok(response) if response.is_success() => {
                let text = response.terminal_text();
                if !text.is_empty() {
                    writeln!(out, "{text}")?;
                }
            }
            Ok(response) => writeln!(out, "Error: {}", response.message)?,
            Err(err) => {
                warn!(%err, "backend request failed");
                writeln!(out, "error: {err}")?;
            }
        },
    }
    Ok(Step::Continue)
}

/// Batch mode for `-c` and `--script`. Blank lines and `#` comments are skipped. Each line
/// waits for deferred pulls to land before the next one runs.
pub(crate) async fn run_lines<'a>(
    backend: &dyn CommandBackend,
    lines: impl IntoIterator<Item = &'a str>,
    out: &mut impl Write,
) -> Result<()> {
    let mut notices = backend.notices();
    for line in lines {
        if line.trim_start().starts_with('#') {
            continue;
        }
        if !line.trim().is_empty() {
            writeln!(out, "{PROMPT}{}", line.trim())?;
        }
        let step = handle_line(backend, line, out).await?;
        backend.settle().await;
        drain_notices(&mut notices, out)?;
        if step == Step::Exit {
            break;
        }
    }
    Ok(())
}

fn drain_notices(
    notices: &mut Option<broadcast::Receiver<String>>,
    out: &mut impl Write,
) -> Result<()> {
    let Some(receiver) = notices.as_mut() else {
        return Ok(());
    };
    loop {
        match receiver.try_recv() {
            Ok(notice) => writeln!(out, "{notice}")?,
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return Ok(()),
        }
    }
}

/// Interactive loop. Pull notices are printed as they arrive, between prompts.
pub(crate) async fn interactive(
    backend: &dyn CommandBackend,
    input: impl AsyncBufRead + Unpin,
    out: &mut impl Write,
) -> Result<()> {
    let mut lines = input.lines();
    let mut notices = backend.notices();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let line = loop {
            tokio::select! {
                line = lines.next_line() => break line?,
                notice = next_notice(&mut notices) => {
                    if let Some(notice) = notice {
                        write!(out, "\r{notice}\n{PROMPT}")?;
                        out.flush()?;
                    }
                }
            }
        };

        let Some(line) = line else {
            writeln!(out)?;
            return Ok(());
        };
        if handle_line(backend, &line, out).await? == Step::Exit {
            return Ok(());
        }
    }
}

async fn next_notice(notices: &mut Option<broadcast::Receiver<String>>) -> Option<String> {
    let Some(receiver) = notices.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Ok(notice) => Some(notice),
        Err(broadcast::error::RecvError::Lagged(_)) => None,
        Err(broadcast::error::RecvError::Closed) => {
            *notices = None;
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/repl_tests.rs"]
mod tests;

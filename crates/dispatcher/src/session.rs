use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ImageRef, UserId},
    error::CommandError,
    protocol::{CommandData, CommandResponse, HistoryEntry},
};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::debug;

use crate::simulator::{Simulator, SimulatorOptions};

const NOTICE_CAPACITY: usize = 32;

/// Shared handle to one simulation. Commands are applied one at a time; a `pull` with a
/// non-zero delay finishes on a background task and announces itself on `notices`.
#[derive(Clone)]
pub struct Session {
    simulator: Arc<Mutex<Simulator>>,
    pull_delay: Duration,
    notices: broadcast::Sender<String>,
    /// Pulls scheduled but not yet landed.
    pending_pulls: watch::Sender<usize>,
}

impl Session {
    pub fn new(options: SimulatorOptions, pull_delay: Duration) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let (pending_pulls, _) = watch::channel(0);
        Self {
            simulator: Arc::new(Mutex::new(Simulator::new(options))),
            pull_delay,
            notices,
            pending_pulls,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.notices.subscribe()
    }

    pub async fn execute(&self, line: &str, user_id: Option<UserId>) -> CommandResponse {
        let mut simulator = self.simulator.lock().await;
        match simulator.execute_as(line, user_id) {
            Ok(execution) => {
                let mut lines = execution.lines;
                if let Some(image) = execution.pending_pull {
                    if self.pull_delay.is_zero() {
                        lines.push(simulator.complete_pull(&image));
                    } else {
                        self.schedule_pull(image);
                    }
                }
                CommandResponse::success(simulator.snapshot(lines.join("\n")))
            }
            Err(err) => CommandResponse::failure(&err),
        }
    }

    fn schedule_pull(&self, image: ImageRef) {
        let simulator = Arc::clone(&self.simulator);
        let notices = self.notices.clone();
        let pending_pulls = self.pending_pulls.clone();
        let delay = self.pull_delay;
        pending_pulls.send_modify(|pending| *pending += 1);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let line = simulator.lock().await.complete_pull(&image);
            debug!(%image, "deferred pull finished");
            let _ = notices.send(line);
            pending_pulls.send_modify(|pending| *pending = pending.saturating_sub(1));
        });
    }

    /// Waits until every scheduled pull has landed and its notice has been sent.
    pub async fn settle(&self) {
        let mut pending = self.pending_pulls.subscribe();
        let _ = pending.wait_for(|count| *count == 0).await;
    }

    pub async fn place(&self, reference: &str, slot: usize) -> Result<CommandData, CommandError> {
        let mut simulator = self.simulator.lock().await;
        let placed = simulator.place(reference, slot)?;
        Ok(simulator.snapshot(format!("{reference} placed in slot {placed}")))
    }

    pub async fn state(&self) -> CommandData {
        self.simulator.lock().await.snapshot(String::new())
    }

    pub async fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.simulator.lock().await.history(limit)
    }

    pub async fn reset(&self) {
        self.simulator.lock().await.reset();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

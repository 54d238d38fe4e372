use std::{collections::HashMap, sync::Arc, time::Duration};

use dispatcher::{Session, SimulatorOptions};
use shared::{
    error::{ApiError, ResponseCode},
    protocol::{CommandData, CommandResponse, ExecuteCommandRequest, HistoryEntry, PlacementRequest},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const DEFAULT_HISTORY_PAGE: usize = 20;
pub const MAX_HISTORY_PAGE: usize = 100;

/// Simulations keyed by `simulationId`, created on first use. Once `max_simulations` are
/// live, creating another evicts the least recently used one.
#[derive(Clone)]
pub struct SimulationStore {
    sessions: Arc<RwLock<Sessions>>,
    options: SimulatorOptions,
    pull_delay: Duration,
    max_simulations: usize,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, Tracked>,
    clock: u64,
}

struct Tracked {
    session: Session,
    last_used: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_least_recent(&mut self) {
        let Some(idlest) = self
            .by_id
            .iter()
            .min_by_key(|(_, tracked)| tracked.last_used)
            .map(|(id, _)| id.clone())
        else {
            return;
        };
        self.by_id.remove(&idlest);
        info!(simulation_id = %idlest, "simulation evicted");
    }
}

impl SimulationStore {
    pub fn new(options: SimulatorOptions, pull_delay: Duration, max_simulations: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            options,
            pull_delay,
            max_simulations: max_simulations.max(1),
        }
    }

    pub async fn session(&self, simulation_id: &str) -> Session {
        let mut sessions = self.sessions.write().await;
        let now = sessions.tick();
        if let Some(tracked) = sessions.by_id.get_mut(simulation_id) {
            tracked.last_used = now;
            return tracked.session.clone();
        }
        if sessions.by_id.len() >= self.max_simulations {
            sessions.evict_least_recent();
        }
        info!(simulation_id, "simulation created");
        let session = Session::new(self.options.clone(), self.pull_delay);
        sessions.by_id.insert(
            simulation_id.to_string(),
            Tracked {
                session: session.clone(),
                last_used: now,
            },
        );
        session
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }

    /// Drops a simulation; the next request for it starts fresh. Returns whether it existed.
    pub async fn remove(&self, simulation_id: &str) -> bool {
        let removed = self.sessions.write().await.by_id.remove(simulation_id);
        if let Some(tracked) = &removed {
            tracked.session.reset().await;
        }
        removed.is_some()
    }
}

fn validate_simulation_id(simulation_id: &str) -> Result<&str, ApiError> {
    let simulation_id = simulation_id.trim();
    if simulation_id.is_empty() {
        return Err(ApiError::new(
            ResponseCode::Validation,
            "simulationId is required",
        ));
    }
    Ok(simulation_id)
}

/// Command failures are part of a successful exchange and come back inside the response;
/// only malformed requests are errors here.
pub async fn execute_command(
    store: &SimulationStore,
    req: ExecuteCommandRequest,
) -> Result<CommandResponse, ApiError> {
    let simulation_id = validate_simulation_id(&req.simulation_id)?;
    if req.command.trim().is_empty() {
        return Err(ApiError::new(ResponseCode::Validation, "command is required"));
    }
    let session = store.session(simulation_id).await;
    let response = session.execute(&req.command, Some(req.user_id)).await;
    debug!(
        simulation_id,
        user_id = req.user_id.0,
        code = ?response.code,
        "command executed"
    );
    Ok(response)
}

pub async fn command_history(
    store: &SimulationStore,
    simulation_id: &str,
    limit: Option<usize>,
) -> Result<Vec<HistoryEntry>, ApiError> {
    let simulation_id = validate_simulation_id(simulation_id)?;
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_PAGE)
        .clamp(1, MAX_HISTORY_PAGE);
    Ok(store.session(simulation_id).await.history(limit).await)
}

pub async fn simulation_state(
    store: &SimulationStore,
    simulation_id: &str,
) -> Result<CommandData, ApiError> {
    let simulation_id = validate_simulation_id(simulation_id)?;
    Ok(store.session(simulation_id).await.state().await)
}

pub async fn place_container(
    store: &SimulationStore,
    simulation_id: &str,
    req: PlacementRequest,
) -> Result<CommandData, ApiError> {
    let simulation_id = validate_simulation_id(simulation_id)?;
    let session = store.session(simulation_id).await;
    session
        .place(&req.container, req.slot)
        .await
        .map_err(ApiError::from)
}

pub async fn reset_simulation(store: &SimulationStore, simulation_id: &str) -> Result<(), ApiError> {
    let simulation_id = validate_simulation_id(simulation_id)?;
    if store.remove(simulation_id).await {
        let remaining = store.len().await;
        info!(simulation_id, remaining, "simulation reset");
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;

use crate::api::SimulationStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) simulations: SimulationStore,
}

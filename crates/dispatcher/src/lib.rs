//! Docker-style command dispatch over an in-memory [`registry::Registry`].

pub mod command;
mod handlers;
mod render;
pub mod session;
pub mod simulator;

pub use command::{parse, Command};
pub use registry::MAX_GRID_SIDE;
pub use session::Session;
pub use simulator::{Execution, Simulator, SimulatorOptions, DEFAULT_HISTORY_LIMIT};

use std::collections::VecDeque;

use chrono::Utc;
use registry::{Board, ContainerRecord, Registry, DEFAULT_COLUMNS, DEFAULT_ROWS};
use shared::{
    domain::{ImageRef, UserId},
    error::CommandError,
    protocol::{
        CommandData, ContainerSummary, HistoryEntry, ImageSummary, NetworkSummary, VolumeSummary,
        SUCCESS_MESSAGE,
    },
};
use tracing::{debug, info, warn};

use crate::command::{self, Command, ContainerCommand, ImageCommand, NetworkCommand, VolumeCommand};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    pub seed_sample_images: bool,
    pub history_limit: usize,
    pub grid_columns: usize,
    pub grid_rows: usize,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            seed_sample_images: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
            grid_columns: DEFAULT_COLUMNS,
            grid_rows: DEFAULT_ROWS,
        }
    }
}

/// Output of one accepted command. A `pull` hands its image back through `pending_pull`
/// so the caller decides when the image actually lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub lines: Vec<String>,
    pub pending_pull: Option<ImageRef>,
}

impl Execution {
    pub(crate) fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            pending_pull: None,
        }
    }

    pub(crate) fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            pending_pull: None,
        }
    }

    pub fn output(&self) -> String {
        self.lines.join("\n")
    }
}

/// One simulation: registry, placement board and command history.
#[derive(Debug, Clone)]
pub struct Simulator {
    pub(crate) registry: Registry,
    pub(crate) board: Board,
    history: VecDeque<HistoryEntry>,
    options: SimulatorOptions,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorOptions::default())
    }
}

impl Simulator {
    pub fn new(options: SimulatorOptions) -> Self {
        let mut registry = Registry::new();
        if options.seed_sample_images {
            registry.seed_sample_images();
        }
        Self {
            registry,
            board: Board::new(options.grid_columns, options.grid_rows),
            history: VecDeque::new(),
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn execute(&mut self, line: &str) -> Result<Execution, CommandError> {
        self.execute_as(line, None)
    }

    /// Parses and applies one line, recording the outcome in the history.
    pub fn execute_as(
        &mut self,
        line: &str,
        user_id: Option<UserId>,
    ) -> Result<Execution, CommandError> {
        let result = command::parse(line).and_then(|command| self.dispatch(command));
        match &result {
            Ok(_) => self.record(line, user_id, true, SUCCESS_MESSAGE.to_string()),
            Err(err) => {
                warn!(command = %line.trim(), error = %err, "command rejected");
                self.record(line, user_id, false, err.to_string());
            }
        }
        result
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Execution, CommandError> {
        if command.is_read_only() {
            debug!(verb = command.verb(), "dispatching command");
        } else {
            info!(verb = command.verb(), "dispatching command");
        }
        match command {
            Command::Run(args) => self.run(args),
            Command::Ps(args) => Ok(self.ps(args)),
            Command::Images(args) => Ok(self.images(args)),
            Command::Pull(args) => Ok(self.pull(args)),
            Command::Start(target) => self.start(&target.reference),
            Command::Stop(target) => self.stop(&target.reference),
            Command::Restart(target) => self.restart(&target.reference),
            Command::Rm(args) => self.rm(args),
            Command::Rmi(args) => self.rmi(args),
            Command::Container(ContainerCommand::Inspect { reference }) => {
                self.container_inspect(&reference)
            }
            Command::Container(ContainerCommand::Prune) => Ok(self.container_prune()),
            Command::Image(ImageCommand::Inspect { reference }) => self.image_inspect(&reference),
            Command::Image(ImageCommand::Prune { all }) => Ok(self.image_prune(all)),
            Command::Volume(VolumeCommand::Create { name }) => Ok(self.volume_create(&name)),
            Command::Volume(VolumeCommand::Ls { quiet }) => Ok(self.volume_ls(quiet)),
            Command::Volume(VolumeCommand::Rm { name, force }) => self.volume_rm(&name, force),
            Command::Volume(VolumeCommand::Inspect { name }) => self.volume_inspect(&name),
            Command::Volume(VolumeCommand::Prune) => Ok(self.volume_prune()),
            Command::Network(NetworkCommand::Create { name, driver }) => {
                Ok(self.network_create(&name, &driver))
            }
            Command::Network(NetworkCommand::Ls { quiet }) => Ok(self.network_ls(quiet)),
            Command::Network(NetworkCommand::Rm { name }) => self.network_rm(&name),
            Command::Network(NetworkCommand::Inspect { name }) => self.network_inspect(&name),
            Command::Network(NetworkCommand::Connect { network, container }) => {
                self.network_connect(&network, &container)
            }
            Command::Network(NetworkCommand::Disconnect {
                network,
                container,
                force,
            }) => self.network_disconnect(&network, &container, force),
            Command::Network(NetworkCommand::Prune) => Ok(self.network_prune()),
        }
    }

    /// Lands a pulled image. Re-pulling replaces the record with a fresh id.
    pub fn complete_pull(&mut self, image: &ImageRef) -> String {
        let record = self.registry.insert_image(
            image.clone(),
            registry::PULLED_IMAGE_SIZE,
            registry::PULLED_IMAGE_CREATED,
        );
        info!(image = %image, id = %record.id.short(), "image pulled");
        format!("Successfully pulled {image}")
    }

    /// Moves a container (by name or id prefix) onto a board slot.
    pub fn place(&mut self, reference: &str, slot: usize) -> Result<usize, CommandError> {
        let id = self.resolve(reference)?.id.clone();
        let placed = self.board.move_to(&id, slot)?;
        info!(container = %id.short(), slot = placed, "container placed");
        Ok(placed)
    }

    pub(crate) fn resolve(&self, reference: &str) -> Result<&ContainerRecord, CommandError> {
        self.registry
            .resolve_container(reference)
            .ok_or_else(|| CommandError::ContainerNotFound(reference.to_string()))
    }

    /// Newest entries first.
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.options.clone());
    }

    fn record(&mut self, line: &str, user_id: Option<UserId>, success: bool, message: String) {
        if self.options.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.options.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            command: line.trim().to_string(),
            success,
            message,
            user_id,
            executed_at: Utc::now(),
        });
    }

    /// Full view of the registry with `output` attached, as sent back to clients.
    pub fn snapshot(&self, output: impl Into<String>) -> CommandData {
        let containers = self
            .registry
            .containers(true)
            .into_iter()
            .map(|container| ContainerSummary {
                id: container.id.to_string(),
                name: container.name.clone(),
                image: container.image.to_string(),
                image_name: container.image.repository.clone(),
                image_tag: container.image.tag.clone(),
                status: container.status,
                ports: container.ports.clone(),
                network: container.network.clone(),
                volumes: container.mounts.iter().map(ToString::to_string).collect(),
                slot: self.board.slot_of(&container.id),
                created_at: container.created_at,
            })
            .collect();
        let images = self
            .registry
            .images()
            .map(|image| ImageSummary {
                id: image.id.to_string(),
                image_name: image.reference.repository.clone(),
                image_tag: image.reference.tag.clone(),
                created: image.created.clone(),
                size: image.size.clone(),
            })
            .collect();
        let networks = self
            .registry
            .networks()
            .map(|network| NetworkSummary {
                id: network.id.to_string(),
                name: network.name.clone(),
                driver: network.driver.clone(),
            })
            .collect();
        let volumes = self
            .registry
            .volumes()
            .map(|volume| VolumeSummary {
                name: volume.name.clone(),
                driver: volume.driver.clone(),
                mountpoint: volume.mountpoint.clone(),
            })
            .collect();

        CommandData {
            output: output.into(),
            containers,
            images,
            networks,
            volumes,
            slots: self
                .board
                .slots()
                .iter()
                .map(|slot| slot.as_ref().map(ToString::to_string))
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "tests/simulator_tests.rs"]
mod tests;

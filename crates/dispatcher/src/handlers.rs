use registry::{ImageRecord, NewContainer, DEFAULT_NETWORK};
use shared::{
    domain::{ContainerStatus, ImageRef},
    error::CommandError,
};
use tracing::info;

use crate::{
    command::{ImagesArgs, PsArgs, PullArgs, RmArgs, RmiArgs, RunArgs},
    render,
    simulator::{Execution, Simulator},
};

impl Simulator {
    pub(crate) fn run(&mut self, args: RunArgs) -> Result<Execution, CommandError> {
        let spec = NewContainer {
            image: args.image,
            name: args.name,
            ports: args.ports,
            network: args.network.unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            mounts: args.mounts,
            command: args.command,
        };
        let container = self.registry.create_container(spec)?;
        let (id, name) = (container.id.clone(), container.name.clone());
        let slot = self.board.place_first_free(&id);
        info!(container = %name, id = %id.short(), ?slot, "container started");
        Ok(Execution::line(id.to_string()))
    }

    pub(crate) fn ps(&self, args: PsArgs) -> Execution {
        let containers = self.registry.containers(args.all);
        if args.quiet {
            return Execution::lines(
                containers
                    .iter()
                    .map(|container| container.id.short().to_string())
                    .collect(),
            );
        }
        Execution::lines(render::containers(&containers))
    }

    pub(crate) fn images(&self, args: ImagesArgs) -> Execution {
        if args.quiet {
            return Execution::lines(
                self.registry
                    .images()
                    .map(|image| image.id.short().to_string())
                    .collect(),
            );
        }
        Execution::lines(render::images(self.registry.images()))
    }

    pub(crate) fn pull(&self, args: PullArgs) -> Execution {
        Execution {
            lines: vec![format!("Pulling {}...", args.image)],
            pending_pull: Some(args.image),
        }
    }

    pub(crate) fn start(&mut self, reference: &str) -> Result<Execution, CommandError> {
        self.change_status(reference, ContainerStatus::Running)
    }

    pub(crate) fn stop(&mut self, reference: &str) -> Result<Execution, CommandError> {
        self.change_status(reference, ContainerStatus::Stopped)
    }

    /// Restart keeps identity; only the status is touched.
    pub(crate) fn restart(&mut self, reference: &str) -> Result<Execution, CommandError> {
        self.change_status(reference, ContainerStatus::Running)
    }

    fn change_status(
        &mut self,
        reference: &str,
        status: ContainerStatus,
    ) -> Result<Execution, CommandError> {
        let id = self.resolve(reference)?.id.clone();
        let container = self.registry.set_status(&id, status)?;
        info!(container = %container.name, %status, "container status changed");
        Ok(Execution::line(container.name.clone()))
    }

    /// Removal is allowed in any status; `force` is accepted for compatibility.
    pub(crate) fn rm(&mut self, args: RmArgs) -> Result<Execution, CommandError> {
        let id = self.resolve(&args.reference)?.id.clone();
        let removed = self.registry.remove_container(&id)?;
        self.board.release(&id);
        info!(container = %removed.name, force = args.force, "container removed");
        Ok(Execution::line(removed.name))
    }

    pub(crate) fn rmi(&mut self, args: RmiArgs) -> Result<Execution, CommandError> {
        let image = self.resolve_image(&args.reference)?.reference.clone();
        if !args.force {
            if let Some(container) = self.registry.containers_using_image(&image).first() {
                return Err(CommandError::ImageInUse {
                    image: image.to_string(),
                    container: container.id.short().to_string(),
                });
            }
        }
        let removed = self.registry.remove_image(&image)?;
        info!(image = %removed.reference, "image removed");
        Ok(Execution::lines(vec![
            format!("Untagged: {}", removed.reference),
            format!("Deleted: sha256:{}", removed.id),
        ]))
    }

    fn resolve_image(&self, reference: &str) -> Result<&ImageRecord, CommandError> {
        self.registry
            .resolve_image(reference)
            .ok_or_else(|| CommandError::ImageNotFound(reference.to_string()))
    }

    pub(crate) fn image_inspect(&self, reference: &str) -> Result<Execution, CommandError> {
        let image = self.resolve_image(reference)?;
        Ok(Execution::lines(render::image_inspect(image, &self.registry)))
    }

    /// With `all`, removes every image no container references.
    pub(crate) fn image_prune(&mut self, all: bool) -> Execution {
        let unused: Vec<ImageRef> = if all {
            self.registry
                .images()
                .filter(|image| {
                    self.registry
                        .containers_using_image(&image.reference)
                        .is_empty()
                })
                .map(|image| image.reference.clone())
                .collect()
        } else {
            Vec::new()
        };
        let mut lines = Vec::new();
        if !unused.is_empty() {
            lines.push("Deleted Images:".to_string());
            for reference in &unused {
                if let Ok(removed) = self.registry.remove_image(reference) {
                    lines.push(format!("untagged: {}", removed.reference));
                    lines.push(format!("deleted: sha256:{}", removed.id));
                }
            }
            lines.push(String::new());
        }
        info!(removed = unused.len(), all, "images pruned");
        lines.push("Total reclaimed space: 0B".to_string());
        Execution::lines(lines)
    }

    pub(crate) fn container_inspect(&self, reference: &str) -> Result<Execution, CommandError> {
        let container = self.resolve(reference)?;
        let slot = self.board.slot_of(&container.id);
        Ok(Execution::lines(render::container_inspect(container, slot)))
    }

    /// Removes every stopped container and frees its slot.
    pub(crate) fn container_prune(&mut self) -> Execution {
        let stopped: Vec<_> = self
            .registry
            .containers(true)
            .into_iter()
            .filter(|container| container.status == ContainerStatus::Stopped)
            .map(|container| container.id.clone())
            .collect();
        let mut lines = Vec::new();
        if !stopped.is_empty() {
            lines.push("Deleted Containers:".to_string());
            for id in &stopped {
                if let Ok(removed) = self.registry.remove_container(id) {
                    self.board.release(id);
                    lines.push(removed.id.to_string());
                }
            }
            lines.push(String::new());
        }
        info!(removed = stopped.len(), "containers pruned");
        lines.push("Total reclaimed space: 0B".to_string());
        Execution::lines(lines)
    }

    pub(crate) fn volume_create(&mut self, name: &str) -> Execution {
        let volume = self.registry.create_volume(name);
        info!(volume = %volume.name, "volume created");
        Execution::line(volume.name.clone())
    }

    pub(crate) fn volume_ls(&self, quiet: bool) -> Execution {
        if quiet {
            return Execution::lines(self.registry.volumes().map(|v| v.name.clone()).collect());
        }
        Execution::lines(render::volumes(self.registry.volumes()))
    }

    pub(crate) fn volume_rm(&mut self, name: &str, force: bool) -> Result<Execution, CommandError> {
        if self.registry.volume(name).is_none() {
            return Err(CommandError::VolumeNotFound(name.to_string()));
        }
        if !force {
            if let Some(container) = self.registry.containers_using_volume(name).first() {
                return Err(CommandError::VolumeInUse {
                    volume: name.to_string(),
                    container: container.id.short().to_string(),
                });
            }
        }
        let removed = self.registry.remove_volume(name)?;
        info!(volume = %removed.name, "volume removed");
        Ok(Execution::line(removed.name))
    }

    pub(crate) fn volume_inspect(&self, name: &str) -> Result<Execution, CommandError> {
        let volume = self
            .registry
            .volume(name)
            .ok_or_else(|| CommandError::VolumeNotFound(name.to_string()))?;
        Ok(Execution::lines(render::volume_inspect(volume, &self.registry)))
    }

    pub(crate) fn volume_prune(&mut self) -> Execution {
        let unused: Vec<String> = self
            .registry
            .volumes()
            .filter(|volume| self.registry.containers_using_volume(&volume.name).is_empty())
            .map(|volume| volume.name.clone())
            .collect();
        let mut lines = vec!["Deleted Volumes:".to_string()];
        for name in unused {
            if let Ok(removed) = self.registry.remove_volume(&name) {
                lines.push(removed.name);
            }
        }
        info!(removed = lines.len() - 1, "volumes pruned");
        lines.push(String::new());
        lines.push("Total reclaimed space: 0B".to_string());
        Execution::lines(lines)
    }

    pub(crate) fn network_create(&mut self, name: &str, driver: &str) -> Execution {
        let network = self.registry.create_network(name, driver);
        info!(network = %network.name, driver = %network.driver, "network created");
        Execution::line(network.id.to_string())
    }

    pub(crate) fn network_ls(&self, quiet: bool) -> Execution {
        if quiet {
            return Execution::lines(
                self.registry
                    .networks()
                    .map(|network| network.id.short().to_string())
                    .collect(),
            );
        }
        Execution::lines(render::networks(self.registry.networks()))
    }

    pub(crate) fn network_rm(&mut self, reference: &str) -> Result<Execution, CommandError> {
        let name = self.network_name(reference)?;
        if name == DEFAULT_NETWORK {
            return Err(CommandError::ProtectedNetwork(name));
        }
        if let Some(container) = self.registry.containers_on_network(&name).first() {
            return Err(CommandError::NetworkInUse {
                network: name.clone(),
                container: container.name.clone(),
            });
        }
        let removed = self.registry.remove_network(&name)?;
        info!(network = %removed.name, "network removed");
        Ok(Execution::line(removed.name))
    }

    pub(crate) fn network_inspect(&self, reference: &str) -> Result<Execution, CommandError> {
        let network = self
            .registry
            .resolve_network(reference)
            .ok_or_else(|| CommandError::NetworkNotFound(reference.to_string()))?;
        Ok(Execution::lines(render::network_inspect(network, &self.registry)))
    }

    /// A container sits on one network, so connecting moves it.
    pub(crate) fn network_connect(
        &mut self,
        network: &str,
        container: &str,
    ) -> Result<Execution, CommandError> {
        let network = self.network_name(network)?;
        let target = self.resolve(container)?;
        if target.network == network {
            return Err(CommandError::AlreadyConnected {
                container: target.name.clone(),
                network,
            });
        }
        let id = target.id.clone();
        let moved = self.registry.set_network(&id, &network)?;
        info!(container = %moved.name, %network, "container connected");
        Ok(Execution::default())
    }

    /// Disconnecting sends the container back to the default network.
    pub(crate) fn network_disconnect(
        &mut self,
        network: &str,
        container: &str,
        force: bool,
    ) -> Result<Execution, CommandError> {
        let network = self.network_name(network)?;
        let target = self.resolve(container)?;
        if target.network != network {
            return Err(CommandError::NotConnected {
                container: target.name.clone(),
                network,
            });
        }
        if network == DEFAULT_NETWORK {
            return Err(CommandError::DefaultNetworkDetach(target.name.clone()));
        }
        let id = target.id.clone();
        let moved = self.registry.set_network(&id, DEFAULT_NETWORK)?;
        info!(container = %moved.name, %network, force, "container disconnected");
        Ok(Execution::default())
    }

    fn network_name(&self, reference: &str) -> Result<String, CommandError> {
        self.registry
            .resolve_network(reference)
            .map(|network| network.name.clone())
            .ok_or_else(|| CommandError::NetworkNotFound(reference.to_string()))
    }

    /// Removes every user-defined network without attached containers.
    pub(crate) fn network_prune(&mut self) -> Execution {
        let unused: Vec<String> = self
            .registry
            .networks()
            .filter(|network| network.name != DEFAULT_NETWORK)
            .filter(|network| self.registry.containers_on_network(&network.name).is_empty())
            .map(|network| network.name.clone())
            .collect();
        if unused.is_empty() {
            return Execution::default();
        }
        let mut lines = vec!["Deleted Networks:".to_string()];
        for name in unused {
            if let Ok(removed) = self.registry.remove_network(&name) {
                lines.push(removed.name);
            }
        }
        info!(removed = lines.len() - 1, "networks pruned");
        Execution::lines(lines)
    }
}

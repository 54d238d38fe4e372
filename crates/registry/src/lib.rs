use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use shared::{
    domain::{ContainerId, ContainerStatus, ImageId, ImageRef, Mount, NetworkId},
    error::CommandError,
};

mod board;

pub use board::{Board, DEFAULT_COLUMNS, DEFAULT_ROWS, MAX_GRID_SIDE};

pub const DEFAULT_NETWORK: &str = "default";
pub const DEFAULT_NETWORK_DRIVER: &str = "bridge";
pub const VOLUME_DRIVER: &str = "local";
pub const PULLED_IMAGE_SIZE: &str = "150MB";
pub const PULLED_IMAGE_CREATED: &str = "just now";

const SAMPLE_IMAGES: [(&str, &str, &str); 3] = [
    ("nginx:latest", "133MB", "2 days ago"),
    ("redis:alpine", "32MB", "1 week ago"),
    ("mysql:8.0", "521MB", "3 days ago"),
];

#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub reference: ImageRef,
    pub id: ImageId,
    pub created: String,
    pub size: String,
}

#[derive(Debug, Clone)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub name: String,
    pub image: ImageRef,
    pub status: ContainerStatus,
    pub ports: Option<String>,
    pub network: String,
    pub mounts: Vec<Mount>,
    pub command: Vec<String>,
    pub created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct VolumeRecord {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NetworkRecord {
    pub id: NetworkId,
    pub name: String,
    pub driver: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContainer {
    pub image: ImageRef,
    pub name: Option<String>,
    pub ports: Option<String>,
    pub network: String,
    pub mounts: Vec<Mount>,
    pub command: Vec<String>,
}

impl NewContainer {
    pub fn from_image(image: ImageRef) -> Self {
        Self {
            image,
            name: None,
            ports: None,
            network: DEFAULT_NETWORK.to_string(),
            mounts: Vec::new(),
            command: Vec::new(),
        }
    }
}

/// In-memory images, containers, volumes and networks of one simulation.
///
/// Each key space is independent. The only cross-key check is the existence of the
/// image and network when a container is created; removals never cascade.
#[derive(Debug, Clone)]
pub struct Registry {
    images: BTreeMap<ImageRef, ImageRecord>,
    containers: HashMap<ContainerId, ContainerRecord>,
    volumes: BTreeMap<String, VolumeRecord>,
    networks: BTreeMap<String, NetworkRecord>,
    next_seq: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Self {
            images: BTreeMap::new(),
            containers: HashMap::new(),
            volumes: BTreeMap::new(),
            networks: BTreeMap::new(),
            next_seq: 0,
        };
        registry.create_network(DEFAULT_NETWORK, DEFAULT_NETWORK_DRIVER);
        registry
    }

    pub fn seed_sample_images(&mut self) {
        for (reference, size, created) in SAMPLE_IMAGES {
            self.insert_image(ImageRef::parse(reference), size, created);
        }
    }

    pub fn insert_image(
        &mut self,
        reference: ImageRef,
        size: impl Into<String>,
        created: impl Into<String>,
    ) -> &ImageRecord {
        let record = ImageRecord {
            reference: reference.clone(),
            id: ImageId::generate(),
            created: created.into(),
            size: size.into(),
        };
        self.images.insert(reference.clone(), record);
        &self.images[&reference]
    }

    pub fn image(&self, reference: &ImageRef) -> Option<&ImageRecord> {
        self.images.get(reference)
    }

    /// `repository[:tag]` first, then a full or prefixed image id (`sha256:` optional).
    pub fn resolve_image(&self, reference: &str) -> Option<&ImageRecord> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Some(image) = self.images.get(&ImageRef::parse(reference)) {
            return Some(image);
        }
        let id = reference.strip_prefix("sha256:").unwrap_or(reference);
        if id.is_empty() {
            return None;
        }
        self.images
            .values()
            .find(|image| image.id.as_str().starts_with(id))
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRecord> {
        self.images.values()
    }

    pub fn remove_image(&mut self, reference: &ImageRef) -> Result<ImageRecord, CommandError> {
        self.images
            .remove(reference)
            .ok_or_else(|| CommandError::ImageNotFound(reference.to_string()))
    }

    pub fn containers_using_image(&self, reference: &ImageRef) -> Vec<&ContainerRecord> {
        self.containers_where(|container| &container.image == reference)
    }

    pub fn create_container(&mut self, spec: NewContainer) -> Result<&ContainerRecord, CommandError> {
        if !self.images.contains_key(&spec.image) {
            return Err(CommandError::ImageNotFound(spec.image.to_string()));
        }
        if !self.networks.contains_key(&spec.network) {
            return Err(CommandError::NetworkNotFound(spec.network));
        }
        let created_at = Utc::now();
        let name = match spec.name {
            Some(name) if self.name_taken(&name) => return Err(CommandError::NameConflict(name)),
            Some(name) => name,
            None => self.generated_name(&spec.image, created_at),
        };

        for mount in &spec.mounts {
            if !self.volumes.contains_key(&mount.volume) {
                self.create_volume(&mount.volume);
            }
        }

        let id = self.unused_container_id();
        self.next_seq += 1;
        let record = ContainerRecord {
            id: id.clone(),
            name,
            image: spec.image,
            status: ContainerStatus::Running,
            ports: spec.ports,
            network: spec.network,
            mounts: spec.mounts,
            command: spec.command,
            created_at,
            seq: self.next_seq,
        };
        self.containers.insert(id.clone(), record);
        Ok(&self.containers[&id])
    }

    pub fn container(&self, id: &ContainerId) -> Option<&ContainerRecord> {
        self.containers.get(id)
    }

    /// Exact name or full id wins; otherwise the earliest-created container whose id starts
    /// with `reference`.
    pub fn resolve_container(&self, reference: &str) -> Option<&ContainerRecord> {
        if reference.is_empty() {
            return None;
        }
        let ordered = self.containers_oldest_first();
        ordered
            .iter()
            .find(|container| container.name == reference || container.id.as_str() == reference)
            .or_else(|| {
                ordered
                    .iter()
                    .find(|container| container.id.as_str().starts_with(reference))
            })
            .copied()
    }

    pub fn set_status(
        &mut self,
        id: &ContainerId,
        status: ContainerStatus,
    ) -> Result<&ContainerRecord, CommandError> {
        let container = self
            .containers
            .get_mut(id)
            .ok_or_else(|| CommandError::ContainerNotFound(id.to_string()))?;
        container.status = status;
        Ok(container)
    }

    pub fn set_network(
        &mut self,
        id: &ContainerId,
        network: &str,
    ) -> Result<&ContainerRecord, CommandError> {
        if !self.networks.contains_key(network) {
            return Err(CommandError::NetworkNotFound(network.to_string()));
        }
        let container = self
            .containers
            .get_mut(id)
            .ok_or_else(|| CommandError::ContainerNotFound(id.to_string()))?;
        container.network = network.to_string();
        Ok(container)
    }

    pub fn remove_container(&mut self, id: &ContainerId) -> Result<ContainerRecord, CommandError> {
        self.containers
            .remove(id)
            .ok_or_else(|| CommandError::ContainerNotFound(id.to_string()))
    }

    /// Newest first. With `all == false` only running containers are returned.
    pub fn containers(&self, all: bool) -> Vec<&ContainerRecord> {
        let mut containers: Vec<_> = self
            .containers
            .values()
            .filter(|container| all || container.status == ContainerStatus::Running)
            .collect();
        containers.sort_by(|a, b| b.seq.cmp(&a.seq));
        containers
    }

    pub fn create_volume(&mut self, name: &str) -> &VolumeRecord {
        let record = VolumeRecord {
            name: name.to_string(),
            driver: VOLUME_DRIVER.to_string(),
            mountpoint: format!("/var/lib/docker/volumes/{name}/_data"),
            created_at: Utc::now(),
        };
        self.volumes.insert(name.to_string(), record);
        &self.volumes[name]
    }

    pub fn volume(&self, name: &str) -> Option<&VolumeRecord> {
        self.volumes.get(name)
    }

    pub fn volumes(&self) -> impl Iterator<Item = &VolumeRecord> {
        self.volumes.values()
    }

    pub fn remove_volume(&mut self, name: &str) -> Result<VolumeRecord, CommandError> {
        self.volumes
            .remove(name)
            .ok_or_else(|| CommandError::VolumeNotFound(name.to_string()))
    }

    pub fn containers_using_volume(&self, name: &str) -> Vec<&ContainerRecord> {
        self.containers_where(|container| container.mounts.iter().any(|m| m.volume == name))
    }

    pub fn create_network(&mut self, name: &str, driver: &str) -> &NetworkRecord {
        let record = NetworkRecord {
            id: NetworkId::generate(),
            name: name.to_string(),
            driver: driver.to_string(),
            created_at: Utc::now(),
        };
        self.networks.insert(name.to_string(), record);
        &self.networks[name]
    }

    pub fn network(&self, name: &str) -> Option<&NetworkRecord> {
        self.networks.get(name)
    }

    /// Looks a network up by name, then by id prefix.
    pub fn resolve_network(&self, reference: &str) -> Option<&NetworkRecord> {
        if reference.is_empty() {
            return None;
        }
        self.networks.get(reference).or_else(|| {
            self.networks
                .values()
                .find(|network| network.id.as_str().starts_with(reference))
        })
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkRecord> {
        self.networks.values()
    }

    pub fn remove_network(&mut self, name: &str) -> Result<NetworkRecord, CommandError> {
        self.networks
            .remove(name)
            .ok_or_else(|| CommandError::NetworkNotFound(name.to_string()))
    }

    pub fn containers_on_network(&self, name: &str) -> Vec<&ContainerRecord> {
        self.containers_where(|container| container.network == name)
    }

    fn containers_where(&self, predicate: impl Fn(&ContainerRecord) -> bool) -> Vec<&ContainerRecord> {
        self.containers_oldest_first()
            .into_iter()
            .filter(|container| predicate(*container))
            .collect()
    }

    fn containers_oldest_first(&self) -> Vec<&ContainerRecord> {
        let mut containers: Vec<_> = self.containers.values().collect();
        containers.sort_by_key(|container| container.seq);
        containers
    }

    fn name_taken(&self, name: &str) -> bool {
        self.containers.values().any(|container| container.name == name)
    }

    fn generated_name(&self, image: &ImageRef, created_at: DateTime<Utc>) -> String {
        let base = format!("{}_{}", image.short_name(), created_at.timestamp_millis());
        if !self.name_taken(&base) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !self.name_taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    fn unused_container_id(&self) -> ContainerId {
        loop {
            let id = ContainerId::generate();
            if !self.containers.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

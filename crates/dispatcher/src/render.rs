use std::io::{self, Write};

use chrono::SecondsFormat;
use registry::{ContainerRecord, ImageRecord, NetworkRecord, Registry, VolumeRecord};
use serde_json::{json, Value};
use shared::domain::ContainerStatus;
use tabwriter::TabWriter;

const NETWORK_SCOPE: &str = "local";

fn aligned(text: &str) -> io::Result<String> {
    let mut tw = TabWriter::new(Vec::new());
    tw.write_all(text.as_bytes())?;
    let bytes = tw
        .into_inner()
        .map_err(|err| io::Error::new(err.error().kind(), err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Column-aligned table. The header is always printed, even with no rows.
pub(crate) fn table(header: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut text = header.join("\t");
    text.push('\n');
    for row in rows {
        text.push_str(&row.join("\t"));
        text.push('\n');
    }
    let rendered = aligned(&text).unwrap_or(text);
    rendered
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect()
}

pub(crate) fn containers(containers: &[&ContainerRecord]) -> Vec<String> {
    let rows: Vec<_> = containers
        .iter()
        .map(|container| {
            vec![
                container.id.short().to_string(),
                container.image.to_string(),
                container.status.to_string(),
                container.ports.clone().unwrap_or_default(),
                container.name.clone(),
            ]
        })
        .collect();
    table(&["CONTAINER ID", "IMAGE", "STATUS", "PORTS", "NAMES"], &rows)
}

pub(crate) fn images<'a>(images: impl Iterator<Item = &'a ImageRecord>) -> Vec<String> {
    let rows: Vec<_> = images
        .map(|image| {
            vec![
                image.reference.repository.clone(),
                image.reference.tag.clone(),
                image.id.short().to_string(),
                image.created.clone(),
                image.size.clone(),
            ]
        })
        .collect();
    table(&["REPOSITORY", "TAG", "IMAGE ID", "CREATED", "SIZE"], &rows)
}

pub(crate) fn volumes<'a>(volumes: impl Iterator<Item = &'a VolumeRecord>) -> Vec<String> {
    let rows: Vec<_> = volumes
        .map(|volume| vec![volume.driver.clone(), volume.name.clone()])
        .collect();
    table(&["DRIVER", "VOLUME NAME"], &rows)
}

pub(crate) fn networks<'a>(networks: impl Iterator<Item = &'a NetworkRecord>) -> Vec<String> {
    let rows: Vec<_> = networks
        .map(|network| {
            vec![
                network.id.short().to_string(),
                network.name.clone(),
                network.driver.clone(),
                NETWORK_SCOPE.to_string(),
            ]
        })
        .collect();
    table(&["NETWORK ID", "NAME", "DRIVER", "SCOPE"], &rows)
}

pub(crate) fn container_inspect(container: &ContainerRecord, slot: Option<usize>) -> Vec<String> {
    let mounts: Vec<Value> = container
        .mounts
        .iter()
        .map(|mount| {
            json!({
                "Type": "volume",
                "Name": mount.volume,
                "Destination": mount.target,
            })
        })
        .collect();
    let value = json!([{
        "Id": container.id,
        "Name": format!("/{}", container.name),
        "Created": container.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "State": {
            "Status": container.status,
            "Running": container.status == ContainerStatus::Running,
        },
        "Image": container.image.to_string(),
        "Config": {
            "Image": container.image.to_string(),
            "Cmd": container.command,
        },
        "HostConfig": {
            "PortBindings": container.ports,
        },
        "Mounts": mounts,
        "NetworkSettings": {
            "Networks": { (container.network.clone()): {} },
        },
        "Slot": slot,
    }]);
    pretty(&value)
}

pub(crate) fn image_inspect(image: &ImageRecord, registry: &Registry) -> Vec<String> {
    let value = json!([{
        "Id": format!("sha256:{}", image.id),
        "RepoTags": [image.reference.to_string()],
        "Created": image.created,
        "Size": image.size,
        "Containers": registry.containers_using_image(&image.reference).len(),
    }]);
    pretty(&value)
}

pub(crate) fn volume_inspect(volume: &VolumeRecord, registry: &Registry) -> Vec<String> {
    let value = json!([{
        "CreatedAt": volume.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "Driver": volume.driver,
        "Labels": {},
        "Mountpoint": volume.mountpoint,
        "Name": volume.name,
        "Scope": NETWORK_SCOPE,
        "RefCount": registry.containers_using_volume(&volume.name).len(),
    }]);
    pretty(&value)
}

pub(crate) fn network_inspect(network: &NetworkRecord, registry: &Registry) -> Vec<String> {
    let attached: serde_json::Map<String, Value> = registry
        .containers_on_network(&network.name)
        .into_iter()
        .map(|container| {
            (
                container.id.to_string(),
                json!({ "Name": container.name, "Status": container.status }),
            )
        })
        .collect();
    let value = json!([{
        "Name": network.name,
        "Id": network.id,
        "Created": network.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "Scope": NETWORK_SCOPE,
        "Driver": network.driver,
        "Containers": attached,
    }]);
    pretty(&value)
}

fn pretty(value: &Value) -> Vec<String> {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| value.to_string())
        .lines()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;

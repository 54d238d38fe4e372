use super::*;

fn seeded() -> Registry {
    let mut registry = Registry::new();
    registry.seed_sample_images();
    registry
}

fn nginx() -> ImageRef {
    ImageRef::parse("nginx:latest")
}

#[test]
fn new_registry_has_only_the_default_network() {
    let registry = Registry::new();
    let networks: Vec<_> = registry.networks().map(|n| n.name.as_str()).collect();
    assert_eq!(networks, vec![DEFAULT_NETWORK]);
    assert_eq!(
        registry.network(DEFAULT_NETWORK).expect("default").driver,
        "bridge"
    );
    assert_eq!(registry.images().count(), 0);
    assert!(registry.containers(true).is_empty());
}

#[test]
fn sample_images_are_seeded() {
    let registry = seeded();
    let names: Vec<_> = registry.images().map(|i| i.reference.to_string()).collect();
    assert_eq!(names, vec!["mysql:8.0", "nginx:latest", "redis:alpine"]);
    assert_eq!(registry.image(&nginx()).expect("nginx").size, "133MB");
}

#[test]
fn create_container_starts_running_with_unique_id() {
    let mut registry = seeded();
    let first = registry
        .create_container(NewContainer::from_image(nginx()))
        .expect("first")
        .clone();
    let second = registry
        .create_container(NewContainer::from_image(nginx()))
        .expect("second")
        .clone();

    assert_eq!(first.status, ContainerStatus::Running);
    assert_ne!(first.id, second.id);
    assert_ne!(first.name, second.name);
    assert!(first.name.starts_with("nginx_"));
    assert_eq!(first.network, DEFAULT_NETWORK);
}

#[test]
fn create_container_requires_existing_image() {
    let mut registry = Registry::new();
    let err = registry
        .create_container(NewContainer::from_image(ImageRef::parse("ghost")))
        .expect_err("should fail");
    assert_eq!(err, CommandError::ImageNotFound("ghost:latest".into()));
    assert!(registry.containers(true).is_empty());
}

#[test]
fn create_container_rejects_duplicate_explicit_name() {
    let mut registry = seeded();
    let mut spec = NewContainer::from_image(nginx());
    spec.name = Some("web".into());
    registry.create_container(spec.clone()).expect("first");

    let err = registry.create_container(spec).expect_err("duplicate");
    assert_eq!(err, CommandError::NameConflict("web".into()));
    assert_eq!(registry.containers(true).len(), 1);
}

#[test]
fn create_container_with_unknown_network_leaves_volumes_untouched() {
    let mut registry = seeded();
    let mut spec = NewContainer::from_image(nginx());
    spec.network = "missing".into();
    spec.mounts = vec![Mount::parse("cache:/cache")];

    let err = registry.create_container(spec).expect_err("network");
    assert_eq!(err, CommandError::NetworkNotFound("missing".into()));
    assert!(registry.volume("cache").is_none());
}

#[test]
fn create_container_creates_missing_named_volumes() {
    let mut registry = seeded();
    let mut spec = NewContainer::from_image(nginx());
    spec.mounts = vec![Mount::parse("cache:/cache")];
    let id = registry.create_container(spec).expect("container").id.clone();

    assert!(registry.volume("cache").is_some());
    assert_eq!(registry.containers_using_volume("cache")[0].id, id);
}

#[test]
fn resolve_container_matches_name_and_id_prefix() {
    let mut registry = seeded();
    let mut spec = NewContainer::from_image(nginx());
    spec.name = Some("web".into());
    let id = registry.create_container(spec).expect("container").id.clone();

    assert_eq!(registry.resolve_container("web").expect("by name").id, id);
    assert_eq!(registry.resolve_container(id.short()).expect("by prefix").id, id);
    assert_eq!(registry.resolve_container(id.as_str()).expect("by id").id, id);
    assert!(registry.resolve_container("").is_none());
    assert!(registry.resolve_container("nope").is_none());
}

#[test]
fn status_changes_keep_identity() {
    let mut registry = seeded();
    let created = registry
        .create_container(NewContainer::from_image(nginx()))
        .expect("container")
        .clone();

    registry
        .set_status(&created.id, ContainerStatus::Stopped)
        .expect("stop");
    assert!(registry.containers(false).is_empty());
    assert_eq!(registry.containers(true).len(), 1);

    let restarted = registry
        .set_status(&created.id, ContainerStatus::Running)
        .expect("start");
    assert_eq!(restarted.id, created.id);
    assert_eq!(restarted.name, created.name);
    assert_eq!(restarted.status, ContainerStatus::Running);
}

#[test]
fn containers_are_listed_newest_first() {
    let mut registry = seeded();
    let first = registry
        .create_container(NewContainer::from_image(nginx()))
        .expect("first")
        .id
        .clone();
    let second = registry
        .create_container(NewContainer::from_image(ImageRef::parse("redis:alpine")))
        .expect("second")
        .id
        .clone();

    let ids: Vec<_> = registry.containers(true).into_iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec![second, first]);
}

#[test]
fn remove_container_forgets_it() {
    let mut registry = seeded();
    let id = registry
        .create_container(NewContainer::from_image(nginx()))
        .expect("container")
        .id
        .clone();
    registry.remove_container(&id).expect("remove");

    assert!(registry.container(&id).is_none());
    assert!(registry.containers(true).is_empty());
    assert_eq!(
        registry.remove_container(&id).expect_err("gone"),
        CommandError::ContainerNotFound(id.to_string())
    );
}

#[test]
fn volume_and_network_creates_are_last_write_wins() {
    let mut registry = Registry::new();
    registry.create_volume("data");
    registry.create_volume("data");
    assert_eq!(registry.volumes().count(), 1);
    assert_eq!(
        registry.volume("data").expect("volume").mountpoint,
        "/var/lib/docker/volumes/data/_data"
    );

    let first_id = registry.create_network("staging", "bridge").id.clone();
    registry.create_network("staging", "overlay");
    let staging: Vec<_> = registry
        .networks()
        .filter(|network| network.name == "staging")
        .collect();
    assert_eq!(staging.len(), 1);
    assert_eq!(staging[0].driver, "overlay");
    assert_ne!(staging[0].id, first_id);
}

#[test]
fn removing_an_image_does_not_cascade() {
    let mut registry = seeded();
    let id = registry
        .create_container(NewContainer::from_image(nginx()))
        .expect("container")
        .id
        .clone();
    assert_eq!(registry.containers_using_image(&nginx()).len(), 1);

    registry.remove_image(&nginx()).expect("remove image");
    let container = registry.container(&id).expect("container survives");
    assert_eq!(container.image, nginx());
    assert_eq!(container.status, ContainerStatus::Running);
}

#[test]
fn resolve_network_by_name_or_id_prefix() {
    let mut registry = Registry::new();
    let id = registry.create_network("staging", "bridge").id.clone();
    assert_eq!(registry.resolve_network("staging").expect("name").id, id);
    assert_eq!(
        registry.resolve_network(id.short()).expect("prefix").name,
        "staging"
    );
    assert!(registry.resolve_network("").is_none());
}

#[test]
fn resolve_image_by_reference_or_id_prefix() {
    let registry = seeded();
    let mysql = registry
        .image(&ImageRef::parse("mysql:8.0"))
        .expect("mysql")
        .id
        .clone();

    assert_eq!(registry.resolve_image("mysql:8.0").expect("ref").id, mysql);
    assert_eq!(
        registry.resolve_image(mysql.short()).expect("short id").reference,
        ImageRef::parse("mysql:8.0")
    );
    assert_eq!(
        registry
            .resolve_image(&format!("sha256:{mysql}"))
            .expect("digest form")
            .id,
        mysql
    );
    assert!(registry.resolve_image("mysql").is_none());
    assert!(registry.resolve_image("").is_none());
    assert!(registry.resolve_image("sha256:").is_none());
}

#[test]
fn set_network_requires_an_existing_network() {
    let mut registry = seeded();
    registry.create_network("staging", "bridge");
    let id = registry
        .create_container(NewContainer::from_image(nginx()))
        .expect("container")
        .id
        .clone();

    assert_eq!(
        registry.set_network(&id, "ghost").expect_err("unknown"),
        CommandError::NetworkNotFound("ghost".into())
    );
    assert_eq!(registry.container(&id).expect("container").network, "default");

    registry.set_network(&id, "staging").expect("move");
    assert_eq!(registry.containers_on_network("staging").len(), 1);
    assert!(registry.containers_on_network("default").is_empty());
}

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SHORT_ID_LEN: usize = 12;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn short(&self) -> &str {
                let end = self
                    .0
                    .char_indices()
                    .nth(SHORT_ID_LEN)
                    .map(|(idx, _)| idx)
                    .unwrap_or(self.0.len());
                &self.0[..end]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(ContainerId);
id_newtype!(ImageId);
id_newtype!(NetworkId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
}

impl ContainerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_TAG: &str = "latest";

/// `repository:tag` reference. A missing tag means `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Splits on the last `:` unless it belongs to a registry host (`localhost:5000/app`).
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') && !repository.is_empty() => {
                let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
                Self::new(repository, tag)
            }
            _ => Self::new(raw, DEFAULT_TAG),
        }
    }

    /// Last path segment of the repository, used for generated container names.
    pub fn short_name(&self) -> &str {
        self.repository
            .rsplit('/')
            .next()
            .unwrap_or(&self.repository)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

pub const DEFAULT_MOUNT_TARGET: &str = "/data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub volume: String,
    pub target: String,
}

impl Mount {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((volume, target)) if !target.is_empty() => Self {
                volume: volume.to_string(),
                target: target.to_string(),
            },
            Some((volume, _)) => Self {
                volume: volume.to_string(),
                target: DEFAULT_MOUNT_TARGET.to_string(),
            },
            None => Self {
                volume: raw.to_string(),
                target: DEFAULT_MOUNT_TARGET.to_string(),
            },
        }
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.volume, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_defaults_to_latest() {
        assert_eq!(ImageRef::parse("nginx"), ImageRef::new("nginx", "latest"));
        assert_eq!(ImageRef::parse("nginx:"), ImageRef::new("nginx", "latest"));
        assert_eq!(ImageRef::parse("redis:alpine").to_string(), "redis:alpine");
    }

    #[test]
    fn image_ref_keeps_registry_port_in_repository() {
        let image = ImageRef::parse("localhost:5000/team/app");
        assert_eq!(image.repository, "localhost:5000/team/app");
        assert_eq!(image.tag, "latest");
        assert_eq!(image.short_name(), "app");

        let tagged = ImageRef::parse("localhost:5000/team/app:v2");
        assert_eq!(tagged.repository, "localhost:5000/team/app");
        assert_eq!(tagged.tag, "v2");
    }

    #[test]
    fn short_id_is_twelve_chars() {
        let id = ContainerId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(id.short().len(), 12);
        assert!(id.as_str().starts_with(id.short()));
        assert_eq!(ContainerId("abc".into()).short(), "abc");
    }

    #[test]
    fn mount_target_defaults_to_data() {
        assert_eq!(Mount::parse("cache").target, "/data");
        assert_eq!(Mount::parse("db:/var/lib/mysql").to_string(), "db:/var/lib/mysql");
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ContainerStatus::Stopped).expect("json");
        assert_eq!(json, "\"stopped\"");
    }
}

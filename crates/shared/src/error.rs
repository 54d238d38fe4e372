use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Success,
    UnknownCommand,
    MissingArgument,
    NotFound,
    Conflict,
    Validation,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ResponseCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Every way a command can be rejected. A rejected command leaves the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command not found: {0}")]
    UnknownCommand(String),
    #[error("unknown {group} command: {name}")]
    UnknownSubcommand { group: &'static str, name: String },
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
    #[error("flag {0} needs a value")]
    MissingFlagValue(String),
    #[error("unknown flag: {0}")]
    UnknownFlag(String),
    #[error("image not found: {0}")]
    ImageNotFound(String),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("volume not found: {0}")]
    VolumeNotFound(String),
    #[error("network not found: {0}")]
    NetworkNotFound(String),
    #[error("container name {0} is already in use")]
    NameConflict(String),
    #[error("unable to remove image {image}: in use by container {container}")]
    ImageInUse { image: String, container: String },
    #[error("unable to remove volume {volume}: in use by container {container}")]
    VolumeInUse { volume: String, container: String },
    #[error("network {network} has active endpoints ({container})")]
    NetworkInUse { network: String, container: String },
    #[error("{0} is a pre-defined network and cannot be removed")]
    ProtectedNetwork(String),
    #[error("container {container} is already connected to network {network}")]
    AlreadyConnected { container: String, network: String },
    #[error("container {container} is not connected to network {network}")]
    NotConnected { container: String, network: String },
    #[error("container {0} cannot be disconnected from the default network")]
    DefaultNetworkDetach(String),
    #[error("slot {slot} is out of range (grid has {slots} slots)")]
    SlotOutOfRange { slot: usize, slots: usize },
    #[error("slot {slot} is already occupied by {container}")]
    SlotOccupied { slot: usize, container: String },
}

impl CommandError {
    pub fn code(&self) -> ResponseCode {
        match self {
            Self::UnknownCommand(_) | Self::UnknownSubcommand { .. } | Self::UnknownFlag(_) => {
                ResponseCode::UnknownCommand
            }
            Self::MissingArgument(_) | Self::MissingFlagValue(_) => ResponseCode::MissingArgument,
            Self::ImageNotFound(_)
            | Self::ContainerNotFound(_)
            | Self::VolumeNotFound(_)
            | Self::NetworkNotFound(_) => ResponseCode::NotFound,
            Self::NameConflict(_)
            | Self::ImageInUse { .. }
            | Self::VolumeInUse { .. }
            | Self::NetworkInUse { .. }
            | Self::ProtectedNetwork(_)
            | Self::AlreadyConnected { .. }
            | Self::NotConnected { .. }
            | Self::DefaultNetworkDetach(_)
            | Self::SlotOccupied { .. } => ResponseCode::Conflict,
            Self::SlotOutOfRange { .. } => ResponseCode::Validation,
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(value: CommandError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_share_a_code() {
        for err in [
            CommandError::ImageNotFound("nginx:latest".into()),
            CommandError::ContainerNotFound("web".into()),
            CommandError::VolumeNotFound("data".into()),
            CommandError::NetworkNotFound("staging".into()),
        ] {
            assert_eq!(err.code(), ResponseCode::NotFound);
        }
    }

    #[test]
    fn api_error_carries_display_message() {
        let api: ApiError = CommandError::MissingArgument("IMAGE").into();
        assert_eq!(api.code, ResponseCode::MissingArgument);
        assert_eq!(api.message, "missing required argument: IMAGE");
    }

    #[test]
    fn response_code_is_screaming_snake_on_the_wire() {
        let json = serde_json::to_string(&ResponseCode::UnknownCommand).expect("json");
        assert_eq!(json, "\"UNKNOWN_COMMAND\"");
    }
}

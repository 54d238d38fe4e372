use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ContainerStatus, UserId},
    error::{ApiError, CommandError, ResponseCode},
};

pub const SUCCESS_MESSAGE: &str = "command executed successfully";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandRequest {
    pub command: String,
    pub simulation_id: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub code: ResponseCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CommandData>,
}

impl CommandResponse {
    pub fn success(data: CommandData) -> Self {
        Self {
            code: ResponseCode::Success,
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(data),
        }
    }

    pub fn failure(err: &CommandError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ResponseCode::Success
    }

    /// The terminal text for this response: output on success, the error line otherwise.
    pub fn terminal_text(&self) -> &str {
        match &self.data {
            Some(data) if self.is_success() => &data.output,
            _ => &self.message,
        }
    }
}

impl From<ApiError> for CommandResponse {
    fn from(value: ApiError) -> Self {
        Self {
            code: value.code,
            message: value.message,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandData {
    pub output: String,
    pub containers: Vec<ContainerSummary>,
    pub images: Vec<ImageSummary>,
    pub networks: Vec<NetworkSummary>,
    #[serde(default)]
    pub volumes: Vec<VolumeSummary>,
    #[serde(default)]
    pub slots: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub image_name: String,
    pub image_tag: String,
    pub status: ContainerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    pub network: String,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub id: String,
    pub image_name: String,
    pub image_tag: String,
    pub created: String,
    pub size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub id: String,
    pub name: String,
    pub driver: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSummary {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub command: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    pub container: String,
    pub slot: usize,
}

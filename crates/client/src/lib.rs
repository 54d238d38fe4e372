use std::time::Duration;

use async_trait::async_trait;
use dispatcher::{Session, SimulatorOptions};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::UserId,
    error::{ApiError, ResponseCode},
    protocol::{CommandData, CommandResponse, ExecuteCommandRequest, HistoryEntry},
};
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

mod error;

pub use error::ClientError;

/// Where commands go: an in-process simulation or a remote server.
#[async_trait]
pub trait CommandBackend: Send + Sync {
    async fn execute(&self, command: &str) -> Result<CommandResponse, ClientError>;

    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ClientError>;

    async fn state(&self) -> Result<CommandData, ClientError>;

    fn describe(&self) -> String;

    /// Out-of-band lines such as finished pulls. Remote backends have none.
    fn notices(&self) -> Option<broadcast::Receiver<String>> {
        None
    }

    /// Returns once deferred work such as a pending pull has finished.
    async fn settle(&self) {}
}

pub struct LocalBackend {
    session: Session,
    user_id: Option<UserId>,
}

impl LocalBackend {
    pub fn new(options: SimulatorOptions, pull_delay: Duration, user_id: Option<UserId>) -> Self {
        Self {
            session: Session::new(options, pull_delay),
            user_id,
        }
    }
}

#[async_trait]
impl CommandBackend for LocalBackend {
    async fn execute(&self, command: &str) -> Result<CommandResponse, ClientError> {
        Ok(self.session.execute(command, self.user_id).await)
    }

    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ClientError> {
        Ok(self.session.history(limit).await)
    }

    async fn state(&self) -> Result<CommandData, ClientError> {
        Ok(self.session.state().await)
    }

    fn describe(&self) -> String {
        "local simulation".to_string()
    }

    fn notices(&self) -> Option<broadcast::Receiver<String>> {
        Some(self.session.subscribe())
    }

    async fn settle(&self) {
        self.session.settle().await;
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams<'a> {
    simulation_id: &'a str,
    limit: usize,
}

pub struct RemoteBackend {
    http: Client,
    base: Url,
    simulation_id: String,
    user_id: UserId,
}

impl RemoteBackend {
    pub fn new(
        server_url: &str,
        simulation_id: impl Into<String>,
        user_id: UserId,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(server_url.trim()).map_err(|source| ClientError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedScheme(base.scheme().to_string()));
        }
        if base.cannot_be_a_base() {
            return Err(ClientError::CannotBeBase(server_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base,
            simulation_id: simulation_id.into(),
            user_id,
        })
    }

    pub fn simulation_id(&self) -> &str {
        &self.simulation_id
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::CannotBeBase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Non-2xx responses become [`ClientError::Api`], keeping the server's error body when it
/// sent one.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await?;
    let error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        };
        ApiError::new(ResponseCode::Internal, message)
    });
    Err(ClientError::Api {
        status: status.as_u16(),
        error,
    })
}

#[async_trait]
impl CommandBackend for RemoteBackend {
    async fn execute(&self, command: &str) -> Result<CommandResponse, ClientError> {
        let url = self.endpoint(&["api", "docker", "execute"])?;
        debug!(%url, command, "sending command");
        let response = self
            .http
            .post(url)
            .json(&ExecuteCommandRequest {
                command: command.to_string(),
                simulation_id: self.simulation_id.clone(),
                user_id: self.user_id,
            })
            .send()
            .await?;
        decode(response).await
    }

    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ClientError> {
        let url = self.endpoint(&["api", "docker", "history"])?;
        let response = self
            .http
            .get(url)
            .query(&HistoryParams {
                simulation_id: &self.simulation_id,
                limit,
            })
            .send()
            .await?;
        decode(response).await
    }

    async fn state(&self) -> Result<CommandData, ClientError> {
        let url = self.endpoint(&["api", "simulations", self.simulation_id.as_str(), "state"])?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    fn describe(&self) -> String {
        format!("{} (simulation {})", self.base, self.simulation_id)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

//! ARM client - The transport seam between handlers and Azure Resource Manager
//!
//! Handlers never talk HTTP themselves. They go through [`ArmClient`], which
//! is injected via [`Clients`] so the same handlers run against Azure or the
//! in-memory backend in [`crate::memory`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use azrm_core::config::{ProviderConfig, Timeouts};
use azrm_core::provider::{ErrorKind, ProviderError, ProviderResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Errors reported by an [`ArmClient`]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{id} was not found (404)")]
    NotFound { id: String },

    #[error("conflict on {id} (409): {message}")]
    Conflict { id: String, message: String },

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Minimal Azure Resource Manager surface used by the handlers
///
/// IDs are full ARM IDs; bodies are the JSON documents ARM exchanges.
#[async_trait]
pub trait ArmClient: Send + Sync {
    async fn get(&self, id: &str, api_version: &str) -> ClientResult<JsonValue>;

    /// Create or replace
    async fn put(&self, id: &str, api_version: &str, body: JsonValue) -> ClientResult<JsonValue>;

    /// Merge `body` into the existing object
    async fn patch(&self, id: &str, api_version: &str, body: JsonValue) -> ClientResult<JsonValue>;

    async fn delete(&self, id: &str, api_version: &str) -> ClientResult<()>;

    /// List the children under a collection ID (e.g. ".../automationAccounts/a1/jobSchedules")
    async fn list(&self, collection_id: &str, api_version: &str) -> ClientResult<Vec<JsonValue>>;

    /// Invoke an action (e.g. ".../runbooks/r1/publish")
    async fn post(&self, id: &str, api_version: &str, body: JsonValue) -> ClientResult<JsonValue>;

    /// Upload a text document (runbook draft content)
    async fn put_content(&self, id: &str, api_version: &str, content: &str) -> ClientResult<()>;

    /// Download a text document (published runbook content)
    async fn get_content(&self, id: &str, api_version: &str) -> ClientResult<String>;
}

/// Wrap a client error with the action that failed
pub fn api_error(action: impl Into<String>, err: ClientError) -> ProviderError {
    let kind = if err.is_not_found() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Api
    };
    ProviderError::with_kind(kind, action).with_cause(err)
}

fn decode_error(action: &str, err: serde_json::Error) -> ProviderError {
    ProviderError::decode(format!("decoding response while {}", action)).with_cause(err)
}

/// Everything a handler needs to reach Azure
#[derive(Clone)]
pub struct Clients {
    pub arm: Arc<dyn ArmClient>,
    pub config: ProviderConfig,
}

impl Clients {
    pub fn new(arm: Arc<dyn ArmClient>, config: ProviderConfig) -> Self {
        Self { arm, config }
    }

    pub fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// A handler's default time limits with the configured overrides applied
    pub fn timeouts(&self, defaults: Timeouts) -> Timeouts {
        defaults.merged(&self.config.timeouts)
    }

    /// GET and decode; `Ok(None)` on 404
    pub async fn get_model<T: DeserializeOwned>(
        &self,
        id: &str,
        api_version: &str,
        action: &str,
    ) -> ProviderResult<Option<T>> {
        log::trace!("GET {} (api-version {})", id, api_version);
        match self.arm.get(id, api_version).await {
            Ok(body) => serde_json::from_value(body)
                .map(Some)
                .map_err(|e| decode_error(action, e)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(api_error(action, e)),
        }
    }

    pub async fn put_model<T: Serialize>(
        &self,
        id: &str,
        api_version: &str,
        body: &T,
        action: &str,
    ) -> ProviderResult<()> {
        let body = serde_json::to_value(body).map_err(|e| {
            ProviderError::decode(format!("encoding request while {}", action)).with_cause(e)
        })?;
        log::debug!("PUT {} (api-version {})", id, api_version);
        self.arm
            .put(id, api_version, body)
            .await
            .map(|_| ())
            .map_err(|e| api_error(action, e))
    }

    pub async fn patch_model<T: Serialize>(
        &self,
        id: &str,
        api_version: &str,
        body: &T,
        action: &str,
    ) -> ProviderResult<()> {
        let body = serde_json::to_value(body).map_err(|e| {
            ProviderError::decode(format!("encoding request while {}", action)).with_cause(e)
        })?;
        log::debug!("PATCH {} (api-version {})", id, api_version);
        self.arm
            .patch(id, api_version, body)
            .await
            .map(|_| ())
            .map_err(|e| api_error(action, e))
    }

    /// DELETE; a 404 surfaces as a `NotFound` error the harness ignores
    pub async fn delete(&self, id: &str, api_version: &str, action: &str) -> ProviderResult<()> {
        log::debug!("DELETE {} (api-version {})", id, api_version);
        self.arm
            .delete(id, api_version)
            .await
            .map_err(|e| api_error(action, e))
    }

    pub async fn list_models<T: DeserializeOwned>(
        &self,
        collection_id: &str,
        api_version: &str,
        action: &str,
    ) -> ProviderResult<Vec<T>> {
        let items = self
            .arm
            .list(collection_id, api_version)
            .await
            .map_err(|e| api_error(action, e))?;
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| decode_error(action, e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_its_kind() {
        let err = api_error(
            "reading Zone",
            ClientError::NotFound {
                id: "/subscriptions/sub1".to_string(),
            },
        );
        assert!(err.is_not_found());
        assert!(err.to_string().contains("404"));

        let err = api_error(
            "reading Zone",
            ClientError::Status {
                status: 500,
                message: "boom".to_string(),
            },
        );
        assert_eq!(err.kind, ErrorKind::Api);
    }
}

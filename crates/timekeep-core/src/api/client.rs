//! Async client for the remote timer/task service.
//!
//! One client instance is shared (cheaply cloned) by the task store, the
//! timer engine, and the analytics reader. Cross-cutting concerns live
//! here: bearer-token attachment, the 401 sign-out policy, status mapping,
//! and envelope-tolerant body decoding.

use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::analytics::{SessionRecord, SessionStats};
use crate::auth::CredentialProvider;
use crate::config::Config;
use crate::error::{ApiError, ConfigError, CoreError};
use crate::task::{Task, TaskDraft, TaskPatch};

use super::types::{
    extract_active_timer, extract_start_ack, extract_task, extract_tasks, ActiveTimerDto, StartAck,
};

/// Client for the remote timer/task service.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    /// Create a client against `base_url` with a 30 second request timeout.
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, CoreError> {
        Self::with_timeout(base_url, credentials, Duration::from_secs(30))
    }

    /// Create a client with an explicit whole-request timeout. The timeout
    /// bounds how long a transient engine phase can outlive a hung call.
    pub fn with_timeout(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "api.base_url".into(),
            message: e.to_string(),
        })?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, CoreError> {
        Self::with_timeout(
            &config.api.base_url,
            credentials,
            Duration::from_secs(config.api.timeout_secs),
        )
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Issue a request and decode the body, mapping statuses to the error
    /// taxonomy. A 401 invalidates the credential provider before failing:
    /// forced sign-out is this client's concern, not its callers'.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let token = self.credentials.token().map_err(|_| ApiError::AuthExpired)?;
        let url = format!("{}{}", self.base_url, path);

        let mut req = self.http.request(method, &url).bearer_auth(token);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED => {
                tracing::warn!(%url, "credential rejected, invalidating session");
                self.credentials.invalidate();
                Err(ApiError::AuthExpired)
            }
            StatusCode::CONFLICT => Err(ApiError::Conflict),
            s if !s.is_success() => {
                let message = resp.text().await.unwrap_or_default();
                Err(ApiError::Status {
                    status: s.as_u16(),
                    message,
                })
            }
            _ => {
                let raw = resp.text().await?;
                if raw.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&raw).map_err(|e| ApiError::Decode(e.to_string()))
            }
        }
    }

    // ── Task service ─────────────────────────────────────────────────

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let body = self.request(Method::GET, "/tasks", &[], None).await?;
        Ok(extract_tasks(&body)?
            .into_iter()
            .map(|dto| dto.into_task())
            .collect())
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let payload = json!({
            "title": draft.name,
            "description": draft.description,
            "category": draft.category,
            "priority": draft.priority.unwrap_or_default(),
        });
        let body = self
            .request(Method::POST, "/tasks", &[], Some(payload))
            .await?;
        Ok(extract_task(&body)?.into_task())
    }

    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, ApiError> {
        let mut payload = serde_json::Map::new();
        if let Some(name) = &patch.name {
            payload.insert("title".into(), json!(name));
        }
        if let Some(description) = &patch.description {
            payload.insert("description".into(), json!(description));
        }
        if let Some(category) = &patch.category {
            payload.insert("category".into(), json!(category));
        }
        if let Some(priority) = &patch.priority {
            payload.insert("priority".into(), json!(priority));
        }
        if let Some(status) = &patch.status {
            payload.insert("status".into(), json!(status));
        }
        let body = self
            .request(
                Method::PUT,
                &format!("/tasks/{id}"),
                &[],
                Some(Value::Object(payload)),
            )
            .await?;
        Ok(extract_task(&body)?.into_task())
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, &format!("/tasks/{id}"), &[], None)
            .await?;
        Ok(())
    }

    // ── Timer service ────────────────────────────────────────────────

    /// Begin a timer for `task_id`. Fails with [`ApiError::Conflict`] if a
    /// timer is already active server-side.
    pub async fn begin_timer(&self, task_id: &str) -> Result<StartAck, ApiError> {
        let body = self
            .request(
                Method::POST,
                "/timer/start",
                &[],
                Some(json!({ "taskId": task_id })),
            )
            .await?;
        Ok(extract_start_ack(&body))
    }

    /// End the active timer. The server tolerates ending when nothing runs.
    pub async fn end_timer(&self) -> Result<(), ApiError> {
        self.request(Method::POST, "/timer/stop", &[], None).await?;
        Ok(())
    }

    /// Atomically replace the active timer's task: the server stops the old
    /// session and starts the new one with no gap.
    pub async fn switch_timer(&self, task_id: &str) -> Result<StartAck, ApiError> {
        let body = self
            .request(
                Method::POST,
                "/timer/switch",
                &[],
                Some(json!({ "taskId": task_id })),
            )
            .await?;
        Ok(extract_start_ack(&body))
    }

    /// Query the server for a running timer. `Ok(None)` is the normal
    /// "no timer" signal, which a 404 also maps to.
    pub async fn active_timer(&self) -> Result<Option<ActiveTimerDto>, ApiError> {
        match self.request(Method::GET, "/timer/active", &[], None).await {
            Ok(body) => extract_active_timer(&body),
            Err(ApiError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Session service (read-only) ──────────────────────────────────

    pub async fn list_sessions(&self, period: Option<&str>) -> Result<Vec<SessionRecord>, ApiError> {
        let query: Vec<(&str, &str)> = period.map(|p| ("period", p)).into_iter().collect();
        let body = self.request(Method::GET, "/sessions", &query, None).await?;
        Ok(crate::analytics::extract_sessions(&body))
    }

    pub async fn session_stats(&self, period: Option<&str>) -> Result<SessionStats, ApiError> {
        let query: Vec<(&str, &str)> = period.map(|p| ("period", p)).into_iter().collect();
        let body = self
            .request(Method::GET, "/sessions/stats", &query, None)
            .await?;
        Ok(crate::analytics::extract_stats(&body))
    }
}

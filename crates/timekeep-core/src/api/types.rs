//! Wire-level types and envelope handling for the remote service.
//!
//! Deployed gateways have been observed to wrap payloads inconsistently:
//! a list of tasks may arrive flat, under `data`, under `tasks`, or under
//! `data.tasks`; the active timer may arrive flat, under `data`, or under
//! `timer`. The extractors here accept every observed shape so the rest of
//! the crate never touches raw `serde_json::Value`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::task::{Task, TaskPriority, TaskStatus, DEFAULT_COLOR};

/// A task as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub total_time_spent: u64,
}

impl TaskDto {
    /// Transform to the domain task. The backend has no color field, so a
    /// client-side default is assigned.
    pub fn into_task(self) -> Task {
        Task {
            id: self.task_id,
            name: self.title,
            color: DEFAULT_COLOR.to_string(),
            total_time_secs: self.total_time_spent,
            description: self.description,
            category: self.category,
            priority: self.priority,
            status: self.status,
        }
    }
}

/// The server-side view of a running timer.
///
/// `start_time` is kept raw: reconciliation decides what an unparseable
/// instant means, not the decoding layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimerDto {
    pub task_id: String,
    #[serde(default, alias = "taskTitle")]
    pub task_name: Option<String>,
    pub start_time: String,
}

/// Acknowledgement of a begin/switch operation.
#[derive(Debug, Clone)]
pub struct StartAck {
    /// Server-acknowledged start instant, when present and parseable.
    pub start_time: Option<DateTime<Utc>>,
}

fn as_object<'a>(v: &'a Value) -> Option<&'a Value> {
    v.is_object().then_some(v)
}

fn as_array<'a>(v: &'a Value) -> Option<&'a Value> {
    v.is_array().then_some(v)
}

/// Locate the task array in a list response.
pub(crate) fn extract_tasks(body: &Value) -> Result<Vec<TaskDto>, ApiError> {
    let candidates = [
        as_array(body),
        as_array(&body["data"]),
        as_array(&body["tasks"]),
        as_array(&body["data"]["tasks"]),
    ];
    let array = candidates
        .into_iter()
        .flatten()
        .next()
        .ok_or_else(|| ApiError::Decode("no task array in response".into()))?;
    serde_json::from_value(array.clone()).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Locate a single task record in a create/update response.
pub(crate) fn extract_task(body: &Value) -> Result<TaskDto, ApiError> {
    let candidates = [
        as_object(&body["data"]["task"]),
        as_object(&body["task"]),
        as_object(&body["data"]),
        as_object(body),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(dto) = serde_json::from_value::<TaskDto>(candidate.clone()) {
            return Ok(dto);
        }
    }
    Err(ApiError::Decode("no task record in response".into()))
}

/// Locate the active timer in a status response.
///
/// `Ok(None)` is the normal "no timer" signal. A candidate that carries a
/// `taskId` but fails to decode is an error, not an absence -- the caller
/// must not mistake a mangled timer for an idle one without logging it.
pub(crate) fn extract_active_timer(body: &Value) -> Result<Option<ActiveTimerDto>, ApiError> {
    let candidates = [
        as_object(&body["data"]),
        as_object(&body["timer"]),
        as_object(&body["data"]["timer"]),
        as_object(body),
    ];
    for candidate in candidates.into_iter().flatten() {
        if candidate.get("taskId").is_some() {
            return serde_json::from_value::<ActiveTimerDto>(candidate.clone())
                .map(Some)
                .map_err(|e| ApiError::Decode(e.to_string()));
        }
    }
    Ok(None)
}

/// Pull the acknowledged start instant out of a begin/switch response.
/// A missing or malformed instant degrades to `None` -- the caller falls
/// back to its own clock observation.
pub(crate) fn extract_start_ack(body: &Value) -> StartAck {
    let raw = body["data"]["startTime"]
        .as_str()
        .or_else(|| body["startTime"].as_str());
    let start_time = raw.and_then(|s| match DateTime::parse_from_rfc3339(s) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(start_time = %s, error = %e, "unparseable acknowledged start instant");
            None
        }
    });
    StartAck { start_time }
}

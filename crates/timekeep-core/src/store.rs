//! In-memory task cache synced from the remote task collection.
//!
//! The list is read-mostly: the timer engine resolves task references
//! against it and the presentation layer renders it. Mutations go to the
//! server first and apply only the server-confirmed record; a local guess
//! is never committed ahead of confirmation.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::error::CoreError;
use crate::task::{Task, TaskDraft, TaskPatch};

/// Outcome of a store mutation. Callers render inline failure from the
/// message instead of handling an error type.
#[derive(Debug, Clone)]
pub struct StoreResult {
    pub success: bool,
    pub message: Option<String>,
}

impl StoreResult {
    pub(crate) fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub(crate) fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

struct StoreState {
    tasks: Vec<Task>,
    loaded: bool,
    busy: bool,
}

/// Shared, clonable task cache.
#[derive(Clone)]
pub struct TaskStore {
    api: ApiClient,
    state: Arc<Mutex<StoreState>>,
}

impl TaskStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(StoreState {
                tasks: Vec::new(),
                loaded: false,
                busy: false,
            })),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Snapshot of the current task list.
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Whether the initial server sync has completed.
    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    /// Whether a mutation is in progress (drives loading indicators).
    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    // ── Sync ─────────────────────────────────────────────────────────

    /// Fetch the task list and replace the cache with it.
    pub async fn load(&self) -> Result<(), CoreError> {
        self.set_busy(true);
        let result = self.api.list_tasks().await;
        self.set_busy(false);

        let tasks = result?;
        let mut st = self.state.lock();
        st.tasks = tasks;
        st.loaded = true;
        Ok(())
    }

    /// Re-sync from the server. Identical to `load`; named for call sites
    /// that refresh after a stopped session changed task totals.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.load().await
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub async fn create(&self, draft: TaskDraft) -> StoreResult {
        if let Err(e) = draft.validate() {
            return StoreResult::fail(e.to_string());
        }

        self.set_busy(true);
        let result = self.api.create_task(&draft).await;
        self.set_busy(false);

        match result {
            Ok(task) => {
                self.state.lock().tasks.push(task);
                StoreResult::ok()
            }
            Err(e) => {
                tracing::warn!(error = %e, "task creation failed");
                StoreResult::fail(format!("failed to add task: {e}"))
            }
        }
    }

    pub async fn update(&self, id: &str, patch: TaskPatch) -> StoreResult {
        if let Err(e) = patch.validate() {
            return StoreResult::fail(e.to_string());
        }
        if patch.is_empty() {
            return StoreResult::ok();
        }

        self.set_busy(true);
        let result = self.api.update_task(id, &patch).await;
        self.set_busy(false);

        match result {
            Ok(confirmed) => {
                let mut st = self.state.lock();
                if let Some(slot) = st.tasks.iter_mut().find(|t| t.id == id) {
                    *slot = confirmed;
                }
                StoreResult::ok()
            }
            Err(e) => {
                tracing::warn!(task = %id, error = %e, "task update failed");
                StoreResult::fail(format!("failed to update task: {e}"))
            }
        }
    }

    /// Remove a task. Callers owning a timer engine must stop an active
    /// timer on this task first; see the tracker's delete flow.
    pub async fn delete(&self, id: &str) -> StoreResult {
        self.set_busy(true);
        let result = self.api.delete_task(id).await;
        self.set_busy(false);

        match result {
            Ok(()) => {
                self.state.lock().tasks.retain(|t| t.id != id);
                StoreResult::ok()
            }
            Err(e) => {
                tracing::warn!(task = %id, error = %e, "task deletion failed");
                StoreResult::fail(format!("failed to delete task: {e}"))
            }
        }
    }

    fn set_busy(&self, busy: bool) {
        self.state.lock().busy = busy;
    }
}

//! Composition root for one authenticated session.
//!
//! A `Tracker` owns one task store, one timer engine, and one notice
//! center over a shared API client, and implements the flows that span
//! components: startup reconciliation, stop-then-refresh, and
//! delete-active-task. Consumers receive it (or clones of its parts) by
//! injection; there is no process-wide instance.

use crate::api::ApiClient;
use crate::error::{CoreError, ValidationError};
use crate::notify::NoticeCenter;
use crate::store::{StoreResult, TaskStore};
use crate::task::{TaskDraft, TaskPatch};
use crate::timer::{StartAction, TimerEngine};

pub struct Tracker {
    api: ApiClient,
    store: TaskStore,
    engine: TimerEngine,
    notices: NoticeCenter,
}

impl Tracker {
    pub fn new(api: ApiClient) -> Self {
        Self {
            store: TaskStore::new(api.clone()),
            engine: TimerEngine::new(api.clone()),
            notices: NoticeCenter::new(),
            api,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn notices(&self) -> &NoticeCenter {
        &self.notices
    }

    /// Startup sequence, before any user intent: load the task list, adopt
    /// any timer already running server-side, and resolve its task against
    /// the loaded list. A failed load does not block reconciliation -- the
    /// engine falls back to a placeholder until a later refresh succeeds.
    pub async fn init(&self) -> Result<(), CoreError> {
        if let Err(e) = self.store.load().await {
            if !e.is_recoverable() {
                return Err(e);
            }
            tracing::warn!(error = %e, "initial task load failed");
            self.notices.push("Failed to load tasks");
        }
        self.engine.reconcile(&self.store).await?;
        self.engine.resolve_tasks(&self.store);
        Ok(())
    }

    /// Single-control press on a task: start, toggle-stop, or switch.
    pub async fn press(&self, task_id: &str) -> Result<StartAction, CoreError> {
        let Some(task) = self.store.get(task_id) else {
            return Err(ValidationError::UnknownTask(task_id.to_string()).into());
        };
        match self.engine.start(&task).await {
            Ok(StartAction::Stopped) => {
                self.refresh_after_stop().await;
                Ok(StartAction::Stopped)
            }
            Ok(action) => Ok(action),
            Err(e) => {
                self.note_failure("Failed to start timer", &e);
                Err(e)
            }
        }
    }

    /// End the active timer, then refresh task totals.
    pub async fn stop(&self) -> Result<bool, CoreError> {
        match self.engine.stop().await {
            Ok(true) => {
                self.refresh_after_stop().await;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                self.note_failure("Failed to stop timer", &e);
                Err(e)
            }
        }
    }

    pub async fn create_task(&self, draft: TaskDraft) -> StoreResult {
        let result = self.store.create(draft).await;
        self.note_store_failure(&result);
        result
    }

    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult {
        let result = self.store.update(id, patch).await;
        if result.success {
            // Keep the active timer's task copy in sync with the rename.
            self.engine.resolve_tasks(&self.store);
        }
        self.note_store_failure(&result);
        result
    }

    /// Delete a task, stopping its timer first when it is the active one.
    /// If the stop fails the delete is abandoned: the timer is presumed
    /// still running and must not reference a removed task.
    pub async fn delete_task(&self, id: &str) -> StoreResult {
        if self.engine.active_task_id().as_deref() == Some(id) {
            match self.engine.stop().await {
                Ok(true) => self.refresh_after_stop().await,
                Ok(false) | Err(_) => {
                    let result =
                        StoreResult::fail("cannot delete task while its timer cannot be stopped");
                    self.note_store_failure(&result);
                    return result;
                }
            }
        }
        let result = self.store.delete(id).await;
        self.note_store_failure(&result);
        result
    }

    /// The stopped task's total changed server-side; re-sync the list. A
    /// refresh failure does not undo the stop.
    async fn refresh_after_stop(&self) {
        if let Err(e) = self.store.refresh().await {
            tracing::warn!(error = %e, "task refresh after stop failed");
            self.notices
                .push("Timer stopped, but task totals could not be refreshed");
        }
        self.engine.resolve_tasks(&self.store);
    }

    fn note_failure(&self, context: &str, error: &CoreError) {
        if error.is_recoverable() {
            self.notices.push(context.to_string());
        } else {
            self.notices.push("Session expired, please sign in again");
        }
    }

    fn note_store_failure(&self, result: &StoreResult) {
        if !result.success {
            if let Some(message) = &result.message {
                self.notices.push(message.clone());
            }
        }
    }
}

//! Active-timer state machine and its reconciliation with the remote
//! timer service.
//!
//! ## Phases
//!
//! ```text
//! Idle ──start──> Starting ──ok──> Active ──stop──> Stopping ──ok──> Idle
//!                    │fail            │ start(other)     │fail
//!                    v                v                  v
//!                  Idle            Switching ──ok──> Active(other)
//!                                     │fail
//!                                     v
//!                                  Active(same)   (rollback)
//! ```
//!
//! Transient phases (`Starting`/`Switching`/`Stopping`) guard re-entrancy:
//! an intent arriving while one is in flight is a silent no-op, so two rapid
//! clicks issue exactly one remote call. The guard is checked and set under
//! the state lock *before* the network call; the lock is never held across
//! an await.
//!
//! Elapsed time is derived from `start_epoch_ms` on every read, never
//! accumulated, so a suspended process or a clock jump between ticks cannot
//! drift it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, StartAck};
use crate::error::{ApiError, CoreError};
use crate::store::TaskStore;
use crate::task::Task;

/// Engine phase. The transient phases are observable (they drive loading
/// indicators) but carry no data of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Starting,
    Active,
    Switching,
    Stopping,
}

impl TimerPhase {
    /// Whether a remote transition is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TimerPhase::Starting | TimerPhase::Switching | TimerPhase::Stopping
        )
    }
}

/// The task an active timer points at.
///
/// A `Placeholder` stands in when the server reports a running timer before
/// the task store has the full record; it is upgraded in place once the
/// store loads, preserving the start instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskRef {
    Resolved(Task),
    Placeholder { id: String, name: String },
}

impl TaskRef {
    pub fn id(&self) -> &str {
        match self {
            TaskRef::Resolved(task) => &task.id,
            TaskRef::Placeholder { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TaskRef::Resolved(task) => &task.name,
            TaskRef::Placeholder { name, .. } => name,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, TaskRef::Placeholder { .. })
    }
}

/// The single in-progress time-tracking session. At most one exists per
/// engine; only the engine mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTimer {
    pub task: TaskRef,
    /// Epoch milliseconds of the start instant (server-acknowledged where
    /// available, client-observed otherwise).
    pub start_epoch_ms: i64,
}

impl ActiveTimer {
    /// Derived elapsed seconds as of `now_ms`. Clamped at zero when the
    /// server clock runs ahead of the local one.
    pub fn elapsed_secs(&self, now_ms: i64) -> u64 {
        derive_elapsed_secs(self.start_epoch_ms, now_ms)
    }
}

/// The one definition of elapsed time: floored whole seconds since the
/// start instant, never accumulated.
fn derive_elapsed_secs(start_epoch_ms: i64, now_ms: i64) -> u64 {
    ((now_ms - start_epoch_ms) / 1000).max(0) as u64
}

/// Read-only projection published to observers.
#[derive(Debug, Clone, Serialize)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub elapsed_secs: u64,
    pub start_epoch_ms: Option<i64>,
    /// True while the task is a placeholder awaiting store resolution.
    pub provisional: bool,
    pub at: DateTime<Utc>,
}

impl TimerSnapshot {
    fn idle() -> Self {
        Self {
            phase: TimerPhase::Idle,
            task_id: None,
            task_name: None,
            elapsed_secs: 0,
            start_epoch_ms: None,
            provisional: false,
            at: Utc::now(),
        }
    }
}

/// What a `start` intent resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAction {
    /// A timer was begun from idle.
    Started,
    /// The active task was replaced atomically.
    Switched,
    /// The press hit the already-active task: toggle semantics, stopped.
    Stopped,
    /// A transition was in flight; the intent was dropped.
    Ignored,
}

/// Scoped handle on the 1 Hz snapshot publisher. Dropping it aborts the
/// task, so every exit path from `Active` tears the loop down.
struct TickGuard {
    handle: JoinHandle<()>,
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct EngineState {
    phase: TimerPhase,
    active: Option<ActiveTimer>,
    ticker: Option<TickGuard>,
}

/// The active-timer state machine. Clones share one state; all mutation
/// happens through the engine's own operations.
#[derive(Clone)]
pub struct TimerEngine {
    api: ApiClient,
    state: Arc<Mutex<EngineState>>,
    updates: Arc<watch::Sender<TimerSnapshot>>,
}

enum Intent {
    Begin,
    Stop,
    Switch,
}

impl TimerEngine {
    pub fn new(api: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(TimerSnapshot::idle());
        Self {
            api,
            state: Arc::new(Mutex::new(EngineState {
                phase: TimerPhase::Idle,
                active: None,
                ticker: None,
            })),
            updates: Arc::new(tx),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.state.lock().phase
    }

    pub fn active_task_id(&self) -> Option<String> {
        self.state
            .lock()
            .active
            .as_ref()
            .map(|a| a.task.id().to_string())
    }

    /// Whether the 1 Hz publisher is currently running.
    pub fn is_ticking(&self) -> bool {
        self.state.lock().ticker.is_some()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let st = self.state.lock();
        Self::snapshot_of(&st)
    }

    /// Subscribe to snapshot updates (transitions plus the 1 Hz tick).
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.updates.subscribe()
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// Single-control press semantics: begin from idle, stop when the task
    /// is already active (toggle), otherwise switch atomically.
    pub async fn start(&self, task: &Task) -> Result<StartAction, CoreError> {
        let intent = {
            let mut st = self.state.lock();
            if st.phase.is_in_flight() {
                tracing::debug!(task = %task.id, "intent dropped, transition in flight");
                return Ok(StartAction::Ignored);
            }
            let active_id = st.active.as_ref().map(|a| a.task.id().to_string());
            match active_id.as_deref() {
                Some(id) if id == task.id => {
                    st.phase = TimerPhase::Stopping;
                    Intent::Stop
                }
                Some(_) => {
                    st.phase = TimerPhase::Switching;
                    Intent::Switch
                }
                None => {
                    st.phase = TimerPhase::Starting;
                    Intent::Begin
                }
            }
        };
        self.publish();

        match intent {
            Intent::Begin => self.do_begin(task).await.map(|_| StartAction::Started),
            Intent::Switch => self.do_switch(task).await.map(|_| StartAction::Switched),
            Intent::Stop => self.do_stop().await.map(|_| StartAction::Stopped),
        }
    }

    /// End the active timer. Returns `Ok(true)` when a running timer was
    /// ended; stopping while idle or in flight is a no-op with no remote
    /// call.
    pub async fn stop(&self) -> Result<bool, CoreError> {
        {
            let mut st = self.state.lock();
            if st.phase.is_in_flight() {
                return Ok(false);
            }
            if st.active.is_none() {
                return Ok(false);
            }
            st.phase = TimerPhase::Stopping;
        }
        self.publish();
        self.do_stop().await?;
        Ok(true)
    }

    /// Determine whether a timer is already running server-side (left over
    /// from a previous session or another device) and adopt it. Idempotent;
    /// a no-op unless the engine is idle.
    pub async fn reconcile(&self, store: &TaskStore) -> Result<(), CoreError> {
        {
            let st = self.state.lock();
            if st.phase != TimerPhase::Idle {
                return Ok(());
            }
        }

        let remote = match self.api.active_timer().await {
            Ok(remote) => remote,
            Err(ApiError::AuthExpired) => return Err(ApiError::AuthExpired.into()),
            Err(e) => {
                tracing::warn!(error = %e, "active-timer lookup failed, assuming no timer");
                return Ok(());
            }
        };
        let Some(remote) = remote else {
            return Ok(());
        };

        let Some(start_epoch_ms) = parse_start_instant(&remote.start_time) else {
            tracing::warn!(
                task = %remote.task_id,
                start_time = %remote.start_time,
                "remote timer has an unparseable start instant, staying idle"
            );
            return Ok(());
        };

        let task = match store.get(&remote.task_id) {
            Some(task) => TaskRef::Resolved(task),
            None => {
                if store.is_loaded() {
                    tracing::warn!(
                        task = %remote.task_id,
                        "remote timer references a task missing from the store"
                    );
                }
                let name = remote
                    .task_name
                    .clone()
                    .unwrap_or_else(|| remote.task_id.clone());
                TaskRef::Placeholder {
                    id: remote.task_id.clone(),
                    name,
                }
            }
        };

        self.activate(task, start_epoch_ms);
        Ok(())
    }

    /// Swap a placeholder for the full task record once the store has
    /// loaded, preserving the start instant. A task that is still missing
    /// is logged and the placeholder kept -- a running timer is never
    /// silently dropped.
    pub fn resolve_tasks(&self, store: &TaskStore) {
        {
            let mut st = self.state.lock();
            let Some(active) = st.active.as_mut() else {
                return;
            };
            match store.get(active.task.id()) {
                Some(task) => active.task = TaskRef::Resolved(task),
                None => {
                    if active.task.is_placeholder() && store.is_loaded() {
                        tracing::warn!(
                            task = %active.task.id(),
                            "active timer task not found after store load, keeping placeholder"
                        );
                    }
                    return;
                }
            }
        }
        self.publish();
    }

    /// Release the tick resource without touching server state. Safe to
    /// call from any teardown path; dropping the last engine handle has the
    /// same effect.
    pub fn dispose(&self) {
        self.state.lock().ticker = None;
    }

    // ── Transitions ──────────────────────────────────────────────────

    async fn do_begin(&self, task: &Task) -> Result<(), CoreError> {
        let ack = match self.api.begin_timer(&task.id).await {
            Ok(ack) => Ok(ack),
            Err(ApiError::Conflict) => {
                // The server already tracks a timer this engine does not
                // know about: replace it atomically instead of failing.
                tracing::debug!(task = %task.id, "begin conflicted, retrying as switch");
                self.api.switch_timer(&task.id).await
            }
            Err(e) => Err(e),
        };

        match ack {
            Ok(ack) => {
                let start_ms = acknowledged_start_ms(&ack);
                self.activate(TaskRef::Resolved(task.clone()), start_ms);
                Ok(())
            }
            Err(e) => {
                self.rollback();
                Err(e.into())
            }
        }
    }

    async fn do_switch(&self, task: &Task) -> Result<(), CoreError> {
        match self.api.switch_timer(&task.id).await {
            Ok(ack) => {
                let start_ms = acknowledged_start_ms(&ack);
                self.activate(TaskRef::Resolved(task.clone()), start_ms);
                Ok(())
            }
            Err(e) => {
                // The previous timer keeps running, server-side and here.
                self.rollback();
                Err(e.into())
            }
        }
    }

    async fn do_stop(&self) -> Result<(), CoreError> {
        match self.api.end_timer().await {
            Ok(()) => {
                {
                    let mut st = self.state.lock();
                    st.phase = TimerPhase::Idle;
                    st.active = None;
                    st.ticker = None;
                }
                self.publish();
                Ok(())
            }
            Err(e) => {
                // The timer is presumed still running; no silent data loss.
                self.rollback();
                Err(e.into())
            }
        }
    }

    /// Enter `Active` with a fresh tick resource. Replacing the guard
    /// aborts any previous publisher, so at most one loop runs.
    fn activate(&self, task: TaskRef, start_epoch_ms: i64) {
        let ticker = self.spawn_ticker(&task, start_epoch_ms);
        {
            let mut st = self.state.lock();
            st.active = Some(ActiveTimer {
                task,
                start_epoch_ms,
            });
            st.phase = TimerPhase::Active;
            st.ticker = Some(ticker);
        }
        self.publish();
    }

    /// Restore the phase matching the unchanged timer state after a failed
    /// remote transition.
    fn rollback(&self) {
        {
            let mut st = self.state.lock();
            st.phase = if st.active.is_some() {
                TimerPhase::Active
            } else {
                TimerPhase::Idle
            };
        }
        self.publish();
    }

    fn spawn_ticker(&self, task: &TaskRef, start_epoch_ms: i64) -> TickGuard {
        let updates = Arc::clone(&self.updates);
        let task_id = task.id().to_string();
        let task_name = task.name().to_string();
        let provisional = task.is_placeholder();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                updates.send_replace(TimerSnapshot {
                    phase: TimerPhase::Active,
                    task_id: Some(task_id.clone()),
                    task_name: Some(task_name.clone()),
                    elapsed_secs: derive_elapsed_secs(start_epoch_ms, now_ms()),
                    start_epoch_ms: Some(start_epoch_ms),
                    provisional,
                    at: Utc::now(),
                });
            }
        });
        TickGuard { handle }
    }

    fn publish(&self) {
        let snap = self.snapshot();
        self.updates.send_replace(snap);
    }

    fn snapshot_of(st: &EngineState) -> TimerSnapshot {
        match &st.active {
            Some(active) => TimerSnapshot {
                phase: st.phase,
                task_id: Some(active.task.id().to_string()),
                task_name: Some(active.task.name().to_string()),
                elapsed_secs: active.elapsed_secs(now_ms()),
                start_epoch_ms: Some(active.start_epoch_ms),
                provisional: active.task.is_placeholder(),
                at: Utc::now(),
            },
            None => TimerSnapshot {
                phase: st.phase,
                ..TimerSnapshot::idle()
            },
        }
    }
}

fn acknowledged_start_ms(ack: &StartAck) -> i64 {
    ack.start_time
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(now_ms)
}

/// Parse a server-reported start instant. `None` means the value is
/// unusable and reconciliation must abort rather than derive a garbage
/// elapsed time.
fn parse_start_instant(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.timestamp_millis())
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn timer_at(start_epoch_ms: i64) -> ActiveTimer {
        ActiveTimer {
            task: TaskRef::Placeholder {
                id: "t-1".into(),
                name: "Deep work".into(),
            },
            start_epoch_ms,
        }
    }

    #[test]
    fn elapsed_is_derived_from_start() {
        let timer = timer_at(1_000_000);
        assert_eq!(timer.elapsed_secs(1_000_000), 0);
        assert_eq!(timer.elapsed_secs(1_000_999), 0);
        assert_eq!(timer.elapsed_secs(1_001_000), 1);
        assert_eq!(timer.elapsed_secs(1_125_000), 125);
    }

    #[test]
    fn elapsed_clamps_when_server_clock_is_ahead() {
        let timer = timer_at(2_000_000);
        assert_eq!(timer.elapsed_secs(1_999_000), 0);
    }

    #[test]
    fn parse_start_instant_accepts_rfc3339() {
        let ms = parse_start_instant("2024-03-01T09:00:00Z").unwrap();
        assert_eq!(ms, 1_709_283_600_000);
        assert!(parse_start_instant("2024-03-01T10:00:00+01:00").is_some());
    }

    #[test]
    fn parse_start_instant_rejects_garbage() {
        assert!(parse_start_instant("").is_none());
        assert!(parse_start_instant("yesterday").is_none());
        assert!(parse_start_instant("1709283600000").is_none());
    }

    #[test]
    fn in_flight_phases() {
        assert!(TimerPhase::Starting.is_in_flight());
        assert!(TimerPhase::Switching.is_in_flight());
        assert!(TimerPhase::Stopping.is_in_flight());
        assert!(!TimerPhase::Idle.is_in_flight());
        assert!(!TimerPhase::Active.is_in_flight());
    }

    #[test]
    fn task_ref_accessors() {
        let placeholder = TaskRef::Placeholder {
            id: "t-9".into(),
            name: "Recovered".into(),
        };
        assert_eq!(placeholder.id(), "t-9");
        assert_eq!(placeholder.name(), "Recovered");
        assert!(placeholder.is_placeholder());
    }

    proptest! {
        /// Elapsed time is a pure function of (start, now): recomputing at
        /// any later instant never depends on how many reads happened in
        /// between, and advancing the clock never decreases it.
        #[test]
        fn elapsed_monotone_and_stateless(start in 0i64..4_000_000_000_000, d1 in 0i64..100_000_000, d2 in 0i64..100_000_000) {
            let timer = timer_at(start);
            let (early, late) = (d1.min(d2), d1.max(d2));
            let a = timer.elapsed_secs(start + early);
            let b = timer.elapsed_secs(start + late);
            prop_assert!(b >= a);
            prop_assert_eq!(a, ((early) / 1000) as u64);
            // re-reading at the same instant is stable
            prop_assert_eq!(timer.elapsed_secs(start + early), a);
        }
    }
}

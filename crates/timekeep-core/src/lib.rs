//! # Timekeep Core Library
//!
//! Client core for a small time-tracking service: users run a single timer
//! against named tasks; the server records sessions and aggregates totals.
//! All operations are available from the standalone CLI binary, and any
//! richer UI is a thin layer over this same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: the active-timer state machine. At most one timer is
//!   active per session; elapsed time is derived from the start instant on
//!   a 1 Hz tick, never accumulated; startup reconciliation adopts a timer
//!   left running by a previous session or another device.
//! - **Task Store**: in-memory cache of the remote task collection,
//!   mutated only with server-confirmed records.
//! - **API Client**: one `reqwest`-based client owning bearer-token
//!   attachment, the 401 sign-out policy, and envelope-tolerant decoding.
//! - **Tracker**: the composition root wiring the above together for one
//!   authenticated session.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: active-timer state machine
//! - [`TaskStore`]: task cache and CRUD
//! - [`ApiClient`]: remote service client
//! - [`Tracker`]: per-session composition root

pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod store;
pub mod task;
pub mod timer;
pub mod tracker;

pub use api::ApiClient;
pub use auth::{CredentialProvider, KeyringCredentials, StaticCredentials};
pub use config::Config;
pub use error::{ApiError, AuthError, ConfigError, CoreError, ValidationError};
pub use notify::{Notice, NoticeCenter};
pub use store::{StoreResult, TaskStore};
pub use task::{Task, TaskDraft, TaskPatch, TaskPriority, TaskStatus};
pub use timer::{ActiveTimer, StartAction, TaskRef, TimerEngine, TimerPhase, TimerSnapshot};
pub use tracker::Tracker;

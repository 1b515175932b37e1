//! Transient user-visible notices.
//!
//! Recoverable failures surface as auto-dismissing messages, never as modal
//! or blocking errors. The presentation layer polls `active()` and renders
//! whatever is still alive; expired notices are pruned on read.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// How long a notice stays visible.
pub const DEFAULT_TTL_SECS: i64 = 5;

/// A single transient message.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Shared, clonable collection of live notices.
#[derive(Clone)]
pub struct NoticeCenter {
    inner: Arc<Mutex<Vec<Notice>>>,
    ttl: Duration,
}

impl NoticeCenter {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            ttl,
        }
    }

    /// Record a message. Returns its id for early dismissal.
    pub fn push(&self, message: impl Into<String>) -> Uuid {
        let notice = Notice {
            id: Uuid::new_v4(),
            message: message.into(),
            created_at: Utc::now(),
        };
        let id = notice.id;
        self.inner.lock().push(notice);
        id
    }

    /// Live notices as of `now`. Expired ones are dropped.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Notice> {
        let mut notices = self.inner.lock();
        notices.retain(|n| now.signed_duration_since(n.created_at) < self.ttl);
        notices.clone()
    }

    /// Dismiss a notice before its TTL elapses.
    pub fn dismiss(&self, id: Uuid) {
        self.inner.lock().retain(|n| n.id != id);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for NoticeCenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_read() {
        let center = NoticeCenter::new();
        center.push("Failed to start timer");
        let live = center.active(Utc::now());
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].message, "Failed to start timer");
    }

    #[test]
    fn notices_expire() {
        let center = NoticeCenter::with_ttl(Duration::seconds(5));
        center.push("gone soon");
        let later = Utc::now() + Duration::seconds(6);
        assert!(center.active(later).is_empty());
    }

    #[test]
    fn dismiss_removes_early() {
        let center = NoticeCenter::new();
        let keep = center.push("keep");
        let drop = center.push("drop");
        center.dismiss(drop);
        let live = center.active(Utc::now());
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, keep);
    }
}

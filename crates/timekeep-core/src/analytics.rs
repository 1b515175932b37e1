//! Read-only session history and its client-side shaping.
//!
//! Aggregation math happens server-side; this module only reshapes what the
//! sessions endpoints return into render-ready series. Shaping functions are
//! pure and take the reference day as a parameter.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session lifecycle status, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Running,
}

/// A recorded (or still running) work session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub task_id: String,
    pub task_title: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Length in seconds; absent while the session is still running.
    #[serde(default)]
    pub duration: Option<u64>,
    pub status: SessionStatus,
}

/// Per-task slice of the server-side aggregation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBreakdownEntry {
    #[serde(default)]
    pub task_title: String,
    /// Seconds spent on the task over the queried period.
    #[serde(default)]
    pub total_duration: u64,
}

/// Server-side aggregate over a period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub task_breakdown: Vec<TaskBreakdownEntry>,
}

/// One day of activity in a zero-filled series.
#[derive(Debug, Clone, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub hours: f64,
    pub sessions: u32,
}

/// Percentage-and-hours slice for a task breakdown chart.
#[derive(Debug, Clone, Serialize)]
pub struct BreakdownSlice {
    pub name: String,
    pub share_pct: u32,
    pub hours: f64,
}

/// Headline numbers for a period.
#[derive(Debug, Clone, Serialize)]
pub struct ProductivitySummary {
    pub total_hours: f64,
    pub avg_daily_hours: f64,
    pub longest_session_hours: f64,
    pub total_sessions: u64,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn secs_to_hours(secs: u64) -> f64 {
    secs as f64 / 3600.0
}

/// Group sessions per day over the trailing `days` ending at `today`,
/// zero-filling days without activity.
pub fn daily_activity(sessions: &[SessionRecord], days: u32, today: NaiveDate) -> Vec<DailyActivity> {
    let mut series: Vec<DailyActivity> = (0..days)
        .rev()
        .map(|back| DailyActivity {
            date: today - Duration::days(back as i64),
            hours: 0.0,
            sessions: 0,
        })
        .collect();

    for session in sessions {
        let date = session.start_time.date_naive();
        if let Some(day) = series.iter_mut().find(|d| d.date == date) {
            day.hours += secs_to_hours(session.duration.unwrap_or(0));
            day.sessions += 1;
        }
    }

    for day in &mut series {
        day.hours = round1(day.hours);
    }
    series
}

/// Share of the period per task. Empty when the server reports no time.
pub fn task_breakdown(stats: &SessionStats) -> Vec<BreakdownSlice> {
    if stats.total_duration == 0 {
        return Vec::new();
    }
    stats
        .task_breakdown
        .iter()
        .map(|entry| BreakdownSlice {
            name: entry.task_title.clone(),
            share_pct: ((entry.total_duration as f64 / stats.total_duration as f64) * 100.0)
                .round() as u32,
            hours: round1(secs_to_hours(entry.total_duration)),
        })
        .collect()
}

/// Headline numbers over the trailing `days`.
pub fn productivity_summary(
    sessions: &[SessionRecord],
    stats: &SessionStats,
    days: u32,
) -> ProductivitySummary {
    let total_hours = secs_to_hours(stats.total_duration);
    let longest_secs = sessions
        .iter()
        .filter_map(|s| s.duration)
        .max()
        .unwrap_or(0);
    ProductivitySummary {
        total_hours: round1(total_hours),
        avg_daily_hours: round1(total_hours / days.max(1) as f64),
        longest_session_hours: round1(secs_to_hours(longest_secs)),
        total_sessions: stats.total_sessions,
    }
}

fn as_array<'a>(v: &'a Value) -> Option<&'a Value> {
    v.is_array().then_some(v)
}

/// Locate the session array in a list response. Unrecognized bodies shape
/// to an empty history, matching the read-only, best-effort contract.
pub(crate) fn extract_sessions(body: &Value) -> Vec<SessionRecord> {
    let candidates = [
        as_array(body),
        as_array(&body["data"]),
        as_array(&body["sessions"]),
        as_array(&body["data"]["sessions"]),
    ];
    let Some(array) = candidates.into_iter().flatten().next() else {
        tracing::debug!("no session array in response");
        return Vec::new();
    };
    match serde_json::from_value(array.clone()) {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::warn!(error = %e, "session history failed to decode");
            Vec::new()
        }
    }
}

/// Locate the stats object in a stats response.
pub(crate) fn extract_stats(body: &Value) -> SessionStats {
    const STAT_KEYS: [&str; 3] = ["totalDuration", "totalSessions", "taskBreakdown"];
    let candidates = [&body["data"]["stats"], &body["stats"], &body["data"], body];
    for candidate in candidates {
        if candidate.is_object() && STAT_KEYS.iter().any(|k| candidate.get(k).is_some()) {
            return serde_json::from_value(candidate.clone()).unwrap_or_default();
        }
    }
    SessionStats::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(id: &str, start: &str, duration: u64) -> SessionRecord {
        SessionRecord {
            session_id: id.into(),
            task_id: "t-1".into(),
            task_title: "Deep work".into(),
            start_time: start.parse().unwrap(),
            end_time: None,
            duration: Some(duration),
            status: SessionStatus::Completed,
        }
    }

    #[test]
    fn daily_activity_zero_fills() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let sessions = vec![
            session("s-1", "2024-03-10T09:00:00Z", 3600),
            session("s-2", "2024-03-10T14:00:00Z", 1800),
            session("s-3", "2024-03-08T09:00:00Z", 7200),
        ];

        let series = daily_activity(&sessions, 7, today);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(series[6].date, today);
        assert_eq!(series[6].hours, 1.5);
        assert_eq!(series[6].sessions, 2);
        assert_eq!(series[4].hours, 2.0);
        assert_eq!(series[5].sessions, 0);
    }

    #[test]
    fn daily_activity_ignores_out_of_window_sessions() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let sessions = vec![session("s-old", "2024-01-01T09:00:00Z", 3600)];
        let series = daily_activity(&sessions, 7, today);
        assert!(series.iter().all(|d| d.sessions == 0));
    }

    #[test]
    fn breakdown_shares() {
        let stats = SessionStats {
            total_duration: 10_800,
            total_sessions: 3,
            task_breakdown: vec![
                TaskBreakdownEntry {
                    task_title: "Deep work".into(),
                    total_duration: 7200,
                },
                TaskBreakdownEntry {
                    task_title: "Email".into(),
                    total_duration: 3600,
                },
            ],
        };
        let slices = task_breakdown(&stats);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].share_pct, 67);
        assert_eq!(slices[0].hours, 2.0);
        assert_eq!(slices[1].share_pct, 33);
    }

    #[test]
    fn breakdown_empty_on_zero_total() {
        assert!(task_breakdown(&SessionStats::default()).is_empty());
    }

    #[test]
    fn summary_on_empty_history() {
        let summary = productivity_summary(&[], &SessionStats::default(), 30);
        assert_eq!(summary.total_hours, 0.0);
        assert_eq!(summary.longest_session_hours, 0.0);
        assert_eq!(summary.total_sessions, 0);
    }

    #[test]
    fn summary_numbers() {
        let sessions = vec![
            session("s-1", "2024-03-10T09:00:00Z", 5400),
            session("s-2", "2024-03-09T09:00:00Z", 1800),
        ];
        let stats = SessionStats {
            total_duration: 7200,
            total_sessions: 2,
            task_breakdown: Vec::new(),
        };
        let summary = productivity_summary(&sessions, &stats, 30);
        assert_eq!(summary.total_hours, 2.0);
        assert_eq!(summary.avg_daily_hours, 0.1);
        assert_eq!(summary.longest_session_hours, 1.5);
        assert_eq!(summary.total_sessions, 2);
    }

    #[test]
    fn session_envelope_shapes() {
        let record = json!({
            "sessionId": "s-1",
            "taskId": "t-1",
            "taskTitle": "Deep work",
            "startTime": "2024-03-10T09:00:00Z",
            "duration": 3600,
            "status": "completed"
        });
        for body in [
            json!([record.clone()]),
            json!({"data": [record.clone()]}),
            json!({"sessions": [record.clone()]}),
            json!({"data": {"sessions": [record.clone()]}}),
        ] {
            assert_eq!(extract_sessions(&body).len(), 1);
        }
        assert!(extract_sessions(&json!({"nope": 1})).is_empty());
    }

    #[test]
    fn stats_envelope_shapes() {
        let stats = json!({"totalDuration": 3600, "totalSessions": 1, "taskBreakdown": []});
        for body in [
            stats.clone(),
            json!({"stats": stats.clone()}),
            json!({"data": stats.clone()}),
            json!({"data": {"stats": stats.clone()}}),
        ] {
            assert_eq!(extract_stats(&body).total_duration, 3600);
        }
        assert_eq!(extract_stats(&json!({})).total_duration, 0);
    }
}

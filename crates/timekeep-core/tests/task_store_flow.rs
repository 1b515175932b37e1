//! Task store CRUD and tracker cross-component flows against a mocked
//! remote service.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use timekeep_core::{
    ApiClient, CredentialProvider, StartAction, StaticCredentials, TaskDraft, TaskPatch, TaskStore,
    TimerPhase, Tracker,
};

fn client(server: &mockito::ServerGuard) -> ApiClient {
    ApiClient::new(&server.url(), Arc::new(StaticCredentials::new("tok-test"))).unwrap()
}

fn task_json(id: &str, title: &str, total: u64) -> serde_json::Value {
    json!({
        "taskId": id,
        "title": title,
        "priority": "medium",
        "status": "pending",
        "totalTimeSpent": total
    })
}

#[tokio::test]
async fn load_accepts_nested_envelope() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/tasks")
        .with_body(json!({"data": {"tasks": [task_json("t-1", "Deep work", 3600)]}}).to_string())
        .create_async()
        .await;

    let store = TaskStore::new(client(&server));
    assert!(!store.is_loaded());

    store.load().await.unwrap();
    assert!(store.is_loaded());
    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Deep work");
    assert_eq!(tasks[0].total_time_secs, 3600);
}

#[tokio::test]
async fn create_appends_server_confirmed_record() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/tasks")
        .match_body(mockito::Matcher::PartialJson(json!({"title": "Write report"})))
        .with_body(json!({"task": task_json("t-9", "Write report", 0)}).to_string())
        .expect(1)
        .create_async()
        .await;

    let store = TaskStore::new(client(&server));
    let result = store.create(TaskDraft::new("Write report")).await;

    assert!(result.success);
    // the server-assigned id is what lands in the cache
    assert_eq!(store.get("t-9").unwrap().name, "Write report");
}

#[tokio::test]
async fn create_rejects_empty_name_locally() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/tasks")
        .expect(0)
        .create_async()
        .await;

    let store = TaskStore::new(client(&server));
    let result = store.create(TaskDraft::new("   ")).await;

    assert!(!result.success);
    assert!(result.message.unwrap().contains("must not be empty"));
    create.assert_async().await;
}

#[tokio::test]
async fn create_failure_reports_without_mutating() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/tasks")
        .with_status(500)
        .create_async()
        .await;

    let store = TaskStore::new(client(&server));
    let result = store.create(TaskDraft::new("Write report")).await;

    assert!(!result.success);
    assert!(store.tasks().is_empty());
    assert!(!store.is_busy());
}

#[tokio::test]
async fn update_applies_server_record() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Old name", 100)]).to_string())
        .create_async()
        .await;
    server
        .mock("PUT", "/tasks/t-1")
        // server confirms the rename and bumps the status on its own
        .with_body(
            json!({"data": {"taskId": "t-1", "title": "New name", "status": "active", "totalTimeSpent": 100}})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let store = TaskStore::new(client(&server));
    store.load().await.unwrap();

    let patch = TaskPatch {
        name: Some("New name".into()),
        ..Default::default()
    };
    let result = store.update("t-1", patch).await;

    assert!(result.success);
    let updated = store.get("t-1").unwrap();
    assert_eq!(updated.name, "New name");
    assert_eq!(
        updated.status,
        Some(timekeep_core::TaskStatus::Active),
        "server-confirmed fields win over the local patch"
    );
}

#[tokio::test]
async fn delete_removes_from_cache() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Deep work", 0)]).to_string())
        .create_async()
        .await;
    server
        .mock("DELETE", "/tasks/t-1")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let store = TaskStore::new(client(&server));
    store.load().await.unwrap();

    let result = store.delete("t-1").await;
    assert!(result.success);
    assert!(store.tasks().is_empty());
}

#[tokio::test]
async fn tracker_init_loads_and_reconciles() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Deep work", 0)]).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/timer/active")
        .with_body("{}")
        .create_async()
        .await;

    let tracker = Tracker::new(client(&server));
    tracker.init().await.unwrap();

    assert!(tracker.store().is_loaded());
    assert_eq!(tracker.engine().phase(), TimerPhase::Idle);
}

#[tokio::test]
async fn stopping_refreshes_task_totals() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/timer/active")
        .with_body("{}")
        .create_async()
        .await;
    // first load: 0 seconds recorded; refresh after stop: server total grew
    let loads = server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Deep work", 0)]).to_string())
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/timer/start")
        .with_body(json!({"startTime": Utc::now().to_rfc3339()}).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/timer/stop")
        .with_body("{}")
        .create_async()
        .await;

    let tracker = Tracker::new(client(&server));
    tracker.init().await.unwrap();
    loads.assert_async().await;

    let refreshed = server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Deep work", 1500)]).to_string())
        .expect(1)
        .create_async()
        .await;

    tracker.press("t-1").await.unwrap();
    let stopped = tracker.stop().await.unwrap();
    assert!(stopped);

    refreshed.assert_async().await;
    assert_eq!(tracker.store().get("t-1").unwrap().total_time_secs, 1500);
    assert_eq!(tracker.engine().phase(), TimerPhase::Idle);
}

#[tokio::test]
async fn deleting_active_task_stops_timer_first() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/timer/active")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Deep work", 0)]).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/timer/start")
        .with_body(json!({"startTime": Utc::now().to_rfc3339()}).to_string())
        .create_async()
        .await;
    let stop = server
        .mock("POST", "/timer/stop")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/tasks/t-1")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let tracker = Tracker::new(client(&server));
    tracker.init().await.unwrap();
    tracker.press("t-1").await.unwrap();
    assert_eq!(tracker.engine().phase(), TimerPhase::Active);

    let result = tracker.delete_task("t-1").await;
    assert!(result.success);

    // no dangling active timer referencing a deleted id
    assert_eq!(tracker.engine().phase(), TimerPhase::Idle);
    assert!(tracker.engine().active_task_id().is_none());
    assert!(tracker.store().get("t-1").is_none());

    stop.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn delete_aborts_when_stop_fails() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/timer/active")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Deep work", 0)]).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/timer/start")
        .with_body(json!({"startTime": Utc::now().to_rfc3339()}).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/timer/stop")
        .with_status(500)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/tasks/t-1")
        .expect(0)
        .create_async()
        .await;

    let tracker = Tracker::new(client(&server));
    tracker.init().await.unwrap();
    tracker.press("t-1").await.unwrap();

    let result = tracker.delete_task("t-1").await;
    assert!(!result.success);

    // the timer is presumed still running and the task survives
    assert_eq!(tracker.engine().phase(), TimerPhase::Active);
    assert_eq!(tracker.store().get("t-1").unwrap().name, "Deep work");
    delete.assert_async().await;
}

#[tokio::test]
async fn failed_start_surfaces_a_notice() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/timer/active")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/tasks")
        .with_body(json!([task_json("t-1", "Deep work", 0)]).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/timer/start")
        .with_status(500)
        .create_async()
        .await;

    let tracker = Tracker::new(client(&server));
    tracker.init().await.unwrap();

    assert!(tracker.press("t-1").await.is_err());
    assert_eq!(tracker.engine().phase(), TimerPhase::Idle);

    let notices = tracker.notices().active(Utc::now());
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("Failed to start timer"));
}

#[tokio::test]
async fn pressing_unknown_task_is_rejected_locally() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/timer/active")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/tasks")
        .with_body("[]")
        .create_async()
        .await;
    let begin = server
        .mock("POST", "/timer/start")
        .expect(0)
        .create_async()
        .await;

    let tracker = Tracker::new(client(&server));
    tracker.init().await.unwrap();

    assert!(tracker.press("t-missing").await.is_err());
    begin.assert_async().await;
}

#[tokio::test]
async fn switch_through_tracker_keeps_single_timer() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/timer/active")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/tasks")
        .with_body(
            json!([
                task_json("t-1", "Deep work", 0),
                task_json("t-2", "Code review", 0)
            ])
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", "/timer/start")
        .with_body(json!({"startTime": Utc::now().to_rfc3339()}).to_string())
        .expect(1)
        .create_async()
        .await;
    let switch = server
        .mock("POST", "/timer/switch")
        .with_body(json!({"startTime": Utc::now().to_rfc3339()}).to_string())
        .expect(1)
        .create_async()
        .await;

    let tracker = Tracker::new(client(&server));
    tracker.init().await.unwrap();

    assert_eq!(tracker.press("t-1").await.unwrap(), StartAction::Started);
    assert_eq!(tracker.press("t-2").await.unwrap(), StartAction::Switched);
    assert_eq!(tracker.engine().active_task_id().as_deref(), Some("t-2"));
    switch.assert_async().await;
}

#[tokio::test]
async fn auth_expiry_during_load_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/tasks")
        .with_status(401)
        .create_async()
        .await;

    let credentials = Arc::new(StaticCredentials::new("tok-stale"));
    let api = ApiClient::new(&server.url(), credentials.clone()).unwrap();
    let tracker = Tracker::new(api);

    let result = tracker.init().await;
    assert!(result.is_err());
    assert!(!credentials.is_signed_in());
}

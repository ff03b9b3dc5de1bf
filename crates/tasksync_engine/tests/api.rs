use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tasksync_core::{PrepareOptions, TaskStatus};
use tasksync_engine::{ApiSettings, DeviceId, FailureKind, ReqwestTaskApi, TaskApi};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> ReqwestTaskApi {
    let settings = ApiSettings {
        base_url: format!("{}/api", server.uri()),
        ..ApiSettings::default()
    };
    ReqwestTaskApi::new(&settings, DeviceId::parse("device-1").unwrap()).expect("client")
}

#[tokio::test]
async fn list_tasks_sends_device_id_and_decodes_partial_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("X-Device-ID", "device-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "1712345678000",
                "status": "preparing",
                "progress": 0,
                "message": null,
                "playlist": {"url": "https://example.com/playlist/1"},
                "options": {},
                "created_at": "2024-04-05T10:00:00Z",
                "updated_at": "2024-04-05T10:00:01Z",
                "status_updated_at": "2024-04-05T10:00:01Z"
            },
            {
                "id": "1712345600000",
                "status": "downloading",
                "progress": 42.5,
                "message": "Downloading 3/7",
                "title": "Road Trip",
                "provider": "youtube",
                "track_count": 7
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = api_for(&server).list_tasks().await.expect("tasks");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].status, TaskStatus::Preparing);
    assert_eq!(
        tasks[0].playlist.as_ref().and_then(|p| p.url.as_deref()),
        Some("https://example.com/playlist/1")
    );
    assert_eq!(tasks[1].progress, 42.5);
    assert_eq!(tasks[1].display_name(), "Road Trip");
}

#[tokio::test]
async fn prepare_posts_url_with_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/prepare"))
        .and(header("X-Device-ID", "device-1"))
        .and(body_json(json!({
            "url": "https://example.com/playlist/1",
            "options": {"format": "mp3", "quality": "320"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t1"})))
        .expect(1)
        .mount(&server)
        .await;

    let options = PrepareOptions {
        format: Some("mp3".to_string()),
        quality: Some("320".to_string()),
        filename: None,
    };
    let task_id = api_for(&server)
        .prepare("https://example.com/playlist/1", &options)
        .await
        .expect("prepare");
    assert_eq!(task_id, "t1");
}

#[tokio::test]
async fn start_forwards_partial_selection_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/start/t1"))
        .and(body_json(json!({"selected_indices": [0, 2]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/start/t2"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    api.start("t1", Some(&[0, 2][..])).await.expect("partial start");
    api.start("t2", None).await.expect("full start");
}

#[tokio::test]
async fn server_detail_becomes_the_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/prepare"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"detail": "Too many queued downloads for this device"})),
        )
        .mount(&server)
        .await;

    let err = api_for(&server)
        .prepare("https://example.com/playlist/1", &PrepareOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(429));
    assert_eq!(err.user_message(), "Too many queued downloads for this device");
}

#[tokio::test]
async fn cancel_and_delete_hit_their_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cancel/t1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "cancel_requested"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "deleted"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Task not found"})))
        .mount(&server)
        .await;

    let api = api_for(&server);
    api.cancel("t1").await.expect("cancel");
    api.delete("t1").await.expect("delete");
    let err = api.delete("ghost").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.message, "Task not found");
}

#[tokio::test]
async fn download_token_composes_a_signed_file_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/download_token/t1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "abc", "expires_in": 600})),
        )
        .mount(&server)
        .await;

    let api = api_for(&server);
    let token = api.download_token("t1").await.expect("token");
    assert_eq!(
        api.download_file_url("t1", &token),
        format!("{}/api/download_file/t1?token=abc", server.uri())
    );
    assert_eq!(
        api.download_file_url("t1", "a+b/c="),
        format!("{}/api/download_file/t1?token=a%2Bb%2Fc%3D", server.uri())
    );
}

#[tokio::test]
async fn history_decodes_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "task_id": "t1",
                "title": "Road Trip",
                "provider": "youtube",
                "track_count": 7,
                "zip_path": "/srv/downloads/t1.zip",
                "timestamp": "2024-04-05T10:00:00.123456"
            }
        ])))
        .mount(&server)
        .await;

    let history = api_for(&server).history().await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].title, "Road Trip");
    assert_eq!(history[0].track_count, 7);
    assert!(history[0].timestamp.is_some());
}

#[tokio::test]
async fn unexpected_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server).list_tasks().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let settings = ApiSettings {
        base_url: format!("{}/api", server.uri()),
        request_timeout: Duration::from_millis(50),
        ..ApiSettings::default()
    };
    let api = ReqwestTaskApi::new(&settings, DeviceId::generate()).unwrap();
    let err = api.list_tasks().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[test]
fn invalid_base_url_is_rejected_up_front() {
    let settings = ApiSettings {
        base_url: "not a url".to_string(),
        ..ApiSettings::default()
    };
    let err = ReqwestTaskApi::new(&settings, DeviceId::generate()).unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

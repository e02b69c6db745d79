//! Integration tests for soft delete, restore and purge.

mod helpers;

use axum::http::StatusCode;
use serde_json::{Value, json};

use helpers::TestApp;

fn ids_of(body: &Value) -> Vec<String> {
    body["data"]["succeeded"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_trash_and_restore_round_trip() {
    let app = TestApp::new().await;
    app.seed_file("docs/report.txt", "numbers");

    let (status, body) = app
        .post_as("alice", "/api/delete", json!({ "paths": ["docs/report.txt"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let trashed = &body["data"]["succeeded"][0];
    let id = trashed["id"].as_str().unwrap().to_string();
    assert_eq!(trashed["originalRelativePath"], "docs/report.txt");
    assert_eq!(trashed["deletedBy"], "alice");
    assert_eq!(trashed["sizeBytes"], 7);
    assert!(!app.exists("docs/report.txt"));

    let (status, body) = app.get("/api/trash").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["count"], 1);
    assert_eq!(body["data"]["summary"]["total_size_bytes"], 7);

    // The parent is gone too by the time of restore.
    std::fs::remove_dir(app.path("docs")).unwrap();

    let (status, body) = app.post("/api/trash/restore", json!({ "ids": [id] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["succeeded"][0]["path"], "docs/report.txt");
    assert_eq!(std::fs::read_to_string(app.path("docs/report.txt")).unwrap(), "numbers");

    let (_, body) = app.get("/api/trash").await;
    assert_eq!(body["data"]["summary"]["count"], 0);
}

#[tokio::test]
async fn test_anonymous_delete_and_restore_clash() {
    let app = TestApp::new().await;
    app.seed_file("a.txt", "first");

    let (_, body) = app.post("/api/delete", json!({ "paths": ["a.txt"] })).await;
    assert_eq!(body["data"]["succeeded"][0]["deletedBy"], "anonymous");
    let ids = ids_of(&body);

    app.seed_file("a.txt", "second");
    let (status, body) = app.post("/api/trash/restore", json!({ "ids": ids })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["succeeded"][0]["name"], "a_restored_1.txt");
    assert_eq!(std::fs::read_to_string(app.path("a.txt")).unwrap(), "second");
    assert_eq!(
        std::fs::read_to_string(app.path("a_restored_1.txt")).unwrap(),
        "first"
    );
}

#[tokio::test]
async fn test_partial_delete_is_multi_status() {
    let app = TestApp::new().await;
    app.seed_file("keep/a.txt", "a");

    let (status, body) = app
        .post("/api/delete", json!({ "paths": ["keep/a.txt", "ghost.txt"] }))
        .await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["data"]["failed"][0]["item"], "ghost.txt");

    let (status, body) = app.post("/api/delete", json!({ "paths": ["ghost.txt"] })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, body) = app.post("/api/delete", json!({ "paths": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");
}

#[tokio::test]
async fn test_restore_rejects_unknown_ids() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/trash/restore", json!({ "ids": ["../../etc"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");

    let (status, body) = app
        .post(
            "/api/trash/restore",
            json!({ "ids": ["0123456789abcdef0123456789abcdef"] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_permanently_and_empty() {
    let app = TestApp::new().await;
    app.seed_file("a.txt", "a");
    app.seed_file("b.txt", "b");
    app.seed_dir("c/d");

    let (_, body) = app
        .post("/api/delete", json!({ "paths": ["a.txt", "b.txt", "c"] }))
        .await;
    let ids = ids_of(&body);
    assert_eq!(ids.len(), 3);

    let (status, body) = app
        .post("/api/trash/delete", json!({ "ids": [ids[0]] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["succeeded"][0], ids[0].as_str());

    let (status, body) = app.post("/api/trash/empty", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["succeeded"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/api/trash").await;
    assert_eq!(body["data"]["summary"]["count"], 0);
    let quarantine = app.path(".webfm/trash");
    assert_eq!(std::fs::read_dir(quarantine).unwrap().count(), 0);
}

#[tokio::test]
async fn test_cleanup_keeps_recent_items() {
    let app = TestApp::new().await;
    app.seed_file("a.txt", "a");
    app.post("/api/delete", json!({ "paths": ["a.txt"] })).await;

    let (status, body) = app.post("/api/trash/cleanup", json!({ "days": 30 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["succeeded"].as_array().unwrap().len(), 0);

    let (status, body) = app.post("/api/trash/cleanup", json!({ "days": 0 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["succeeded"].as_array().unwrap().len(), 1);

    let (status, _) = app.post("/api/trash/cleanup", json!({ "days": 99999 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

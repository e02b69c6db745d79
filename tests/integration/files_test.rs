//! Integration tests for browsing, editing, renaming, moving and downloading.

mod helpers;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use helpers::TestApp;

#[tokio::test]
async fn test_health_reports_root() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["root_reachable"], true);
}

#[tokio::test]
async fn test_create_edit_and_list() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/api/folders", json!({ "path": "docs" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "folder");

    let (status, body) = app
        .post("/api/files", json!({ "path": "docs/notes.txt", "content": "hello" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["path"], "docs/notes.txt");
    assert_eq!(body["data"]["size_bytes"], 5);

    let (status, _) = app
        .put("/api/write", json!({ "path": "docs/notes.txt", "content": "hello, world" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/read?path=docs/notes.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "hello, world");
    assert_eq!(body["data"]["encoding"], "utf8");

    app.seed_file("docs/file10.txt", "x");
    app.seed_file("docs/file2.txt", "x");
    app.seed_dir("docs/zz");

    let (status, body) = app.get("/api/list?path=docs").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["zz", "file2.txt", "file10.txt", "notes.txt"]);
    assert_eq!(body["data"]["breadcrumbs"][0]["name"], "Root");
    assert_eq!(body["data"]["breadcrumbs"][1]["path"], "docs");
}

#[tokio::test]
async fn test_root_listing_hides_system_area() {
    let app = TestApp::new().await;
    app.seed_file("a.txt", "a");

    let (status, body) = app.get("/api/list").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "a.txt");
}

#[tokio::test]
async fn test_system_area_is_forbidden() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/list?path=.webfm").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PATH_ESCAPE");

    let (status, _) = app.get("/api/read?path=.webfm/trash.json").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_traversal_is_clamped_to_root() {
    let app = TestApp::new().await;
    app.seed_file("etc/passwd", "inside");

    let (status, body) = app.get("/api/info?path=../../etc/passwd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["path"], "etc/passwd");

    let (status, body) = app.get("/api/info?path=%2E%2E%2F%2E%2E%2Fmissing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_is_forbidden() {
    let app = TestApp::new().await;
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), app.path("link")).unwrap();

    let (status, body) = app.get("/api/read?path=link/secret.txt").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PATH_ESCAPE");
}

#[tokio::test]
async fn test_editor_limits() {
    let app = TestApp::with_config(|c| c.editor.max_bytes = 4).await;
    app.seed_file("image.png", "png");
    app.seed_file("big.txt", "too large");

    let (status, body) = app.get("/api/read?path=image.png").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "UNSUPPORTED_TYPE");

    let (status, body) = app.get("/api/read?path=big.txt").await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "TOO_LARGE");

    let (status, _) = app.put("/api/write", json!({ "path": "missing.txt", "content": "" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rename_errors() {
    let app = TestApp::new().await;
    app.seed_file("a.txt", "a");
    app.seed_file("b.txt", "b");

    let (status, body) = app
        .post("/api/rename", json!({ "path": "a.txt", "new_name": "b.txt" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NAME_IN_USE");

    let (status, body) = app
        .post("/api/rename", json!({ "path": "a.txt", "new_name": "x/y.txt" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_NAME");

    let (status, body) = app
        .post("/api/rename", json!({ "path": "a.txt", "new_name": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");

    let (status, body) = app
        .post("/api/rename", json!({ "path": "a.txt", "new_name": "c.txt" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["path"], "c.txt");
    assert!(!app.exists("a.txt"));
}

#[tokio::test]
async fn test_create_conflicts() {
    let app = TestApp::new().await;
    app.seed_file("a.txt", "a");

    let (status, body) = app.post("/api/files", json!({ "path": "a.txt" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_EXISTS");

    let (status, body) = app.post("/api/folders", json!({ "path": "missing/child" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PARENT_MISSING");

    let (status, body) = app.post("/api/folders", json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");
}

#[tokio::test]
async fn test_move_partial_success_is_multi_status() {
    let app = TestApp::new().await;
    app.seed_file("a.txt", "a");
    app.seed_file("b.txt", "b");
    app.seed_file("dest/b.txt", "existing");

    let (status, body) = app
        .post(
            "/api/move",
            json!({ "paths": ["a.txt", "b.txt", "ghost.txt"], "destination": "dest" }),
        )
        .await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["data"]["succeeded"][0]["path"], "dest/a.txt");
    let failed: Vec<&str> = body["data"]["failed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["item"].as_str().unwrap())
        .collect();
    assert_eq!(failed, vec!["b.txt", "ghost.txt"]);
    assert!(app.exists("b.txt"));
    assert_eq!(std::fs::read_to_string(app.path("dest/b.txt")).unwrap(), "existing");
}

#[tokio::test]
async fn test_recursive_move_is_rejected() {
    let app = TestApp::new().await;
    app.seed_dir("a/b");

    let (status, body) = app
        .post("/api/move", json!({ "paths": ["a"], "destination": "a/b" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "RECURSIVE_MOVE");
    assert!(app.exists("a/b"));
}

#[tokio::test]
async fn test_download_streams_file() {
    let app = TestApp::new().await;
    app.seed_file("reports/q1.txt", "quarterly numbers");

    let request = Request::builder()
        .uri("/api/download?path=reports/q1.txt")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"q1.txt\""));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"quarterly numbers");

    let (status, body) = app.get("/api/download?path=reports").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");
}

//! Integration tests for chunked and folder uploads.

mod helpers;

use axum::http::StatusCode;

use helpers::TestApp;

#[tokio::test]
async fn test_out_of_order_chunks_assemble_in_index_order() {
    let app = TestApp::new().await;
    app.seed_dir("incoming");

    let parts: [(&str, &[u8]); 3] = [("2", b"CC"), ("0", b"AA"), ("1", b"BB")];
    let mut last = None;
    for (index, data) in parts {
        let fields = [
            ("original_name", "joined.bin"),
            ("chunk_index", index),
            ("total_chunks", "3"),
            ("path", "incoming"),
        ];
        let (status, body) = app.upload(&fields, data).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        last = Some(body);
    }

    let body = last.unwrap();
    assert_eq!(body["data"]["state"], "finished");
    assert_eq!(body["data"]["entry"]["path"], "incoming/joined.bin");
    assert_eq!(std::fs::read(app.path("incoming/joined.bin")).unwrap(), b"AABBCC");
}

#[tokio::test]
async fn test_pending_progress_counts_distinct_chunks() {
    let app = TestApp::new().await;
    let fields = [
        ("original_name", "big.bin"),
        ("chunk_index", "0"),
        ("total_chunks", "2"),
    ];

    let (_, body) = app.upload(&fields, b"x").await;
    assert_eq!(body["data"]["state"], "pending");
    assert_eq!(body["data"]["received"], 1);

    // A retried chunk replaces the staged copy.
    let (_, body) = app.upload(&fields, b"y").await;
    assert_eq!(body["data"]["received"], 1);
    assert_eq!(body["data"]["total"], 2);
    assert!(!app.exists("big.bin"));
}

#[tokio::test]
async fn test_chunk_after_completion_starts_a_new_upload() {
    let app = TestApp::new().await;
    let first = [
        ("original_name", "d.bin"),
        ("chunk_index", "0"),
        ("total_chunks", "2"),
    ];
    let second = [
        ("original_name", "d.bin"),
        ("chunk_index", "1"),
        ("total_chunks", "2"),
    ];

    app.upload(&first, b"12").await;
    let (_, done) = app.upload(&second, b"34").await;
    assert_eq!(done["data"]["state"], "finished");

    let (status, again) = app.upload(&second, b"xx").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["data"]["state"], "pending");
    assert_eq!(again["data"]["received"], 1);

    let (status, body) = app.upload(&first, b"yy").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_EXISTS");
    assert_eq!(std::fs::read(app.path("d.bin")).unwrap(), b"1234");
}

#[tokio::test]
async fn test_upload_again_after_delete_writes_new_content() {
    let app = TestApp::new().await;
    let (_, body) = app.upload(&[("original_name", "a.txt")], b"v1").await;
    assert_eq!(body["data"]["state"], "finished");
    std::fs::remove_file(app.path("a.txt")).unwrap();

    let (status, body) = app.upload(&[("original_name", "a.txt")], b"v2").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["state"], "finished");
    assert_eq!(std::fs::read_to_string(app.path("a.txt")).unwrap(), "v2");
}

#[tokio::test]
async fn test_single_file_upload_does_not_overwrite() {
    let app = TestApp::new().await;
    app.seed_file("taken.txt", "original");

    let (status, body) = app.upload(&[("original_name", "taken.txt")], b"new").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_EXISTS");
    assert_eq!(std::fs::read_to_string(app.path("taken.txt")).unwrap(), "original");
}

#[tokio::test]
async fn test_folder_upload_creates_dirs_and_renames_on_clash() {
    let app = TestApp::new().await;
    app.seed_file("photos/2024/a.jpg", "old");

    let fields = [
        ("original_name", "a.jpg"),
        ("relative_path", "photos/2024/a.jpg"),
    ];
    let (status, body) = app.upload(&fields, b"new").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["entry"]["path"], "photos/2024/a_1.jpg");
    assert_eq!(std::fs::read_to_string(app.path("photos/2024/a.jpg")).unwrap(), "old");

    let fields = [
        ("original_name", "b.txt"),
        ("relative_path", "deep/er/b.txt"),
    ];
    let (status, body) = app.upload(&fields, b"b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entry"]["path"], "deep/er/b.txt");

    let (status, body) = app.upload(&fields, b"again").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entry"]["path"], "deep/er/b_1.txt");
    assert_eq!(std::fs::read_to_string(app.path("deep/er/b_1.txt")).unwrap(), "again");
}

#[tokio::test]
async fn test_upload_limits_and_validation() {
    let app = TestApp::with_config(|c| c.upload.max_chunk_bytes = 4).await;

    let (status, body) = app.upload(&[("original_name", "a.bin")], b"12345").await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "TOO_LARGE");

    let fields = [
        ("original_name", "a.bin"),
        ("chunk_index", "3"),
        ("total_chunks", "2"),
    ];
    let (status, _) = app.upload(&fields, b"1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.upload(&[("chunk_index", "x")], b"1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");

    let (status, body) = app
        .upload(&[("original_name", "a.bin"), ("path", ".webfm/chunks")], b"1")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PATH_ESCAPE");
}

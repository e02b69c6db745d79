//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use webfm_api::{AppState, build_app};
use webfm_core::config::AppConfig;
use webfm_storage::RootContext;

const BOUNDARY: &str = "webfm-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for reaching the stores directly
    pub state: AppState,
    /// Canonical root directory
    pub root: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    /// Create a new test application over an empty temporary root
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application after adjusting the default config
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = AppConfig::default();
        config.storage.root_path = dir.path().join("root").display().to_string();
        config.worker.enabled = false;
        adjust(&mut config);

        let root = RootContext::open(&config.storage.root_path, &config.storage.system_dir)
            .await
            .expect("Failed to open root");
        let state = AppState::new(config, root);
        let root = state.files.resolver().root().to_path_buf();
        let router = build_app(state.clone());

        Self {
            router,
            state,
            root,
            _dir: dir,
        }
    }

    /// Absolute path of a root-relative path
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file directly into the root, creating parents
    pub fn seed_file(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent");
        }
        std::fs::write(path, content).expect("Failed to seed file");
    }

    /// Create a folder directly in the root
    pub fn seed_dir(&self, rel: &str) {
        std::fs::create_dir_all(self.path(rel)).expect("Failed to seed dir");
    }

    pub fn exists(&self, rel: &str) -> bool {
        Path::new(&self.path(rel)).symlink_metadata().is_ok()
    }

    /// Send a raw request
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed")
    }

    /// GET a JSON endpoint
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        json_of(self.send(request).await).await
    }

    /// POST a JSON body
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("POST", uri, body, None).await
    }

    /// POST a JSON body as a named user
    pub async fn post_as(&self, user: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("POST", uri, body, Some(user)).await
    }

    /// PUT a JSON body
    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("PUT", uri, body, None).await
    }

    async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Value,
        user: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header("X-User", user);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        json_of(self.send(request).await).await
    }

    /// POST one upload chunk as multipart form data
    pub async fn upload(&self, fields: &[(&str, &str)], data: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"blob\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");
        json_of(self.send(request).await).await
    }
}

/// Read a response as status plus JSON body
pub async fn json_of(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    };
    (status, value)
}

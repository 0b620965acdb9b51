use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use tokio::sync::Mutex;

use todo_server::task::web::{TaskState, create_task_router};
use todo_server::task::{DEFAULT_DATE_FORMATS, TaskService};

pub fn default_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS
        .iter()
        .map(|format| format.to_string())
        .collect()
}

pub fn tasks_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("tasks.json")
}

/// Builds the task router backed by a store inside `dir`.
pub fn setup_router(dir: &tempfile::TempDir) -> Router {
    let service = TaskService::load(tasks_file(dir), default_formats()).unwrap();
    create_task_router(Arc::new(TaskState {
        service: Mutex::new(service),
    }))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn form_post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// Form encoding for the characters used in these tests.
pub fn form_encode(value: &str) -> String {
    value.replace(' ', "+").replace(':', "%3A")
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

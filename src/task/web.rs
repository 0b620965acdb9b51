use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Local;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeFile;

use crate::task::{Schedule, SortMode, Task, TaskFilter, TaskService, TaskServiceError, TaskView};

/// Shared router state. The mutex serializes every read-modify-write
/// sequence against the store, persistence included.
#[derive(Debug)]
pub struct TaskState {
    pub service: Mutex<TaskService>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    #[serde(default)]
    filter: TaskFilter,
    #[serde(default)]
    sort: SortMode,
}

#[derive(Debug, Deserialize)]
pub struct AddTaskForm {
    #[serde(default)]
    task: String,
    #[serde(default)]
    due_date: String,
    #[serde(default)]
    priority: String,
}

#[derive(Debug, Deserialize)]
pub struct EditTaskForm {
    #[serde(default)]
    task: String,
    #[serde(default)]
    due_date: String,
}

/// Custom error type for task handler operations.
#[derive(Debug, thiserror::Error)]
enum TaskError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a task service error.
    #[error("Task service error")]
    Service(#[from] TaskServiceError),
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let user_facing_error_message =
            "An unexpected error occurred while processing your request. Please try again later.";
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!(
                "<h1>Internal Server Error</h1><p>{}</p>",
                user_facing_error_message
            )),
        )
            .into_response()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    overdue: Vec<TaskView>,
    today: Vec<TaskView>,
    tomorrow: Vec<TaskView>,
    later: Vec<TaskView>,
    filter: TaskFilter,
    sort: SortMode,
}

impl IndexTemplate {
    pub fn new(schedule: Schedule, filter: TaskFilter, sort: SortMode) -> Self {
        Self {
            overdue: schedule.overdue,
            today: schedule.today,
            tomorrow: schedule.tomorrow,
            later: schedule.later,
            filter,
            sort,
        }
    }
}

#[derive(Template)]
#[template(path = "edit.html")]
struct EditTemplate {
    task: Task,
}

impl EditTemplate {
    pub fn new(task: Task) -> Self {
        Self { task }
    }
}

/// Handler for the read view: classifies the collection into the four
/// buckets and renders the full page.
#[tracing::instrument(skip(state))]
async fn tasks_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Html<String>, TaskError> {
    let mut service = state.service.lock().await;
    let schedule = service.schedule(query.filter, query.sort, Local::now().naive_local())?;
    let template = IndexTemplate::new(schedule, query.filter, query.sort);
    template.render().map(Html).map_err(TaskError::from)
}

/// Handler for creating a new task. An empty task text or due date
/// skips creation; either way the client is sent back to the read view.
#[tracing::instrument(skip(state))]
async fn add_task_handler(
    State(state): State<Arc<TaskState>>,
    Form(form): Form<AddTaskForm>,
) -> Result<Redirect, TaskError> {
    let mut service = state.service.lock().await;
    service.add_task(&form.task, &form.due_date, &form.priority)?;
    Ok(Redirect::to("/"))
}

/// Handler for deleting a task. Unknown ids redirect as if deleted.
#[tracing::instrument(skip(state))]
async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<u32>,
) -> Result<Redirect, TaskError> {
    let mut service = state.service.lock().await;
    service.delete_task(id)?;
    Ok(Redirect::to("/"))
}

/// Handler for toggling a task's completion flag. Unknown ids redirect
/// as if toggled.
#[tracing::instrument(skip(state))]
async fn toggle_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<u32>,
) -> Result<Redirect, TaskError> {
    let mut service = state.service.lock().await;
    service.toggle_task(id)?;
    Ok(Redirect::to("/"))
}

/// Handler for serving the edit form with the task's current values.
/// Unknown ids redirect to the read view.
#[tracing::instrument(skip(state))]
async fn edit_task_form_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<u32>,
) -> Result<Response, TaskError> {
    let service = state.service.lock().await;
    match service.get_task(id) {
        Some(task) => {
            let template = EditTemplate::new(task.clone());
            let html = template.render().map_err(TaskError::from)?;
            Ok(Html(html).into_response())
        }
        None => Ok(Redirect::to("/").into_response()),
    }
}

/// Handler for submitting the edit form. Overwrites text and due date
/// only; unknown ids redirect without changing anything.
#[tracing::instrument(skip(state))]
async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<u32>,
    Form(form): Form<EditTaskForm>,
) -> Result<Redirect, TaskError> {
    let mut service = state.service.lock().await;
    service.edit_task(id, &form.task, &form.due_date)?;
    Ok(Redirect::to("/"))
}

/// Creates and returns the task router with all task-related routes.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/", get(tasks_handler))
        .route("/add", post(add_task_handler))
        .route("/delete/{id}", post(delete_task_handler))
        .route("/toggle/{id}", post(toggle_task_handler))
        .route(
            "/edit/{id}",
            get(edit_task_form_handler).post(update_task_handler),
        )
        .route_service(
            "/service-worker.js",
            ServeFile::new("static/service-worker.js"),
        )
        .with_state(state)
}

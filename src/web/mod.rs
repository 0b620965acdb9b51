use std::sync::Arc;

use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config;
use crate::task::TaskService;
use crate::task::web::{TaskState, create_task_router};

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    use axum::Router;

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let service = TaskService::load(&config.tasks_file, config.date_formats)?;
    tracing::info!(
        tasks = service.len(),
        "Task list loaded from {}",
        config.tasks_file
    );

    let task_state = Arc::new(TaskState {
        service: Mutex::new(service),
    });

    let app = Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_task_router(task_state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

use crate::{
    fetch::Fetcher,
    generator::Generator,
    job::generate_to_file,
    template::{DEFAULT_TEMPLATE, TemplateStore, Templates},
};
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tasks::{REAP_INTERVAL, RETENTION, TaskStatus, TaskStore, spawn_reaper};
use tokio_util::io::ReaderStream;

const DOWNLOAD_NAME: &str = "openclash_config.yaml";
const YAML_MIME: &str = "application/x-yaml";

pub struct AppState<F, T> {
    generator: Arc<Generator<Templates>>,
    fetcher: Arc<F>,
    tasks: Arc<T>,
    output_dir: Arc<PathBuf>,
}

impl<F, T> Clone for AppState<F, T> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            fetcher: Arc::clone(&self.fetcher),
            tasks: Arc::clone(&self.tasks),
            output_dir: Arc::clone(&self.output_dir),
        }
    }
}

impl<F, T> AppState<F, T> {
    pub fn new(generator: Generator<Templates>, fetcher: F, tasks: T, output_dir: PathBuf) -> Self {
        Self {
            generator: Arc::new(generator),
            fetcher: Arc::new(fetcher),
            tasks: Arc::new(tasks),
            output_dir: Arc::new(output_dir),
        }
    }
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_owned()
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    subscription_url: String,
    #[serde(default = "default_template")]
    template: String,
}

#[derive(Debug, Serialize)]
struct TemplateInfo {
    id: String,
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

async fn generate<F, T>(
    State(state): State<AppState<F, T>>,
    request: Result<Json<GenerateRequest>, JsonRejection>,
) -> Json<serde_json::Value>
where
    F: Fetcher + Send + Sync + 'static,
    T: TaskStore + 'static,
{
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Json(json!({ "success": false, "error": rejection.body_text() }));
        }
    };
    let url = request.subscription_url.trim().to_owned();
    if url.is_empty() {
        return Json(json!({ "success": false, "error": "subscription_url is empty" }));
    }

    let task_id = state.tasks.create("generation queued").await;
    log::info!("task {} for {}", task_id, url);
    tokio::spawn(run_task(state, task_id.clone(), url, request.template));

    Json(json!({ "success": true, "task_id": task_id }))
}

async fn run_task<F, T>(state: AppState<F, T>, task_id: String, url: String, template: String)
where
    F: Fetcher + Send + Sync + 'static,
    T: TaskStore + 'static,
{
    state
        .tasks
        .update(&task_id, |record| {
            record.progress = 20;
            record.message = "fetching subscription".to_owned();
        })
        .await;

    let path = state.output_dir.join(format!("{}.yaml", task_id));
    let outcome = generate_to_file(
        state.fetcher.as_ref(),
        state.generator.as_ref(),
        &url,
        &template,
        &path,
    )
    .await;
    match outcome {
        Ok(_) => {
            state
                .tasks
                .update(&task_id, |record| {
                    record.complete("configuration generated", path)
                })
                .await;
        }
        Err(err) => {
            log::error!("task {}: {:#}", task_id, err);
            state
                .tasks
                .update(&task_id, |record| {
                    record.fail(format!("generation failed: {:#}", err))
                })
                .await;
        }
    }
}

async fn status<F, T>(State(state): State<AppState<F, T>>, Path(task_id): Path<String>) -> Response
where
    T: TaskStore,
{
    match state.tasks.get(&task_id).await {
        Some(record) => Json(record).into_response(),
        None => Json(json!({ "status": "not_found", "message": "task not found" })).into_response(),
    }
}

async fn download<F, T>(
    State(state): State<AppState<F, T>>,
    Path(task_id): Path<String>,
) -> Response
where
    T: TaskStore,
{
    let Some(path) = state
        .tasks
        .get(&task_id)
        .await
        .filter(|record| record.status == TaskStatus::Completed)
        .and_then(|record| record.file_path)
    else {
        return not_found("file missing or generation unfinished");
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(err) => {
            log::warn!("open {}: {}", path.display(), err);
            return not_found("file missing");
        }
    };

    (
        [
            (header::CONTENT_TYPE, YAML_MIME.to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_NAME),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

async fn templates<F, T>(State(state): State<AppState<F, T>>) -> Json<Vec<TemplateInfo>> {
    Json(
        state
            .generator
            .templates()
            .names()
            .into_iter()
            .map(|id| TemplateInfo { id })
            .collect(),
    )
}

pub fn router<F, T>(state: AppState<F, T>) -> Router
where
    F: Fetcher + Send + Sync + 'static,
    T: TaskStore + 'static,
{
    Router::new()
        .route("/api/generate", post(generate::<F, T>))
        .route("/api/status/{task_id}", get(status::<F, T>))
        .route("/api/download/{task_id}", get(download::<F, T>))
        .route("/api/templates", get(templates::<F, T>))
        .with_state(state)
}

/// Serve the API on `listen` with a reaper cleaning up old tasks.
pub async fn serve<F, T>(listen: SocketAddr, state: AppState<F, T>) -> anyhow::Result<()>
where
    F: Fetcher + Send + Sync + 'static,
    T: TaskStore + 'static,
{
    tokio::fs::create_dir_all(state.output_dir.as_ref()).await?;
    let reaper = spawn_reaper(Arc::clone(&state.tasks), RETENTION, REAP_INTERVAL);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    reaper.abort();
    Ok(())
}

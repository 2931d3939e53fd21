//! HTTP surface for the paper explainer.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Single-page UI: PDF upload, per-stage status messages, the summary, and a
//!   download link.
//! - `GET /status` – Credential warnings and the models in use, fetched by the page on load.
//! - `POST /summaries` – Multipart upload (field `file`, one `.pdf`). Runs the pipeline and
//!   returns the [`RunReport`]. Stage failures are reported in the body with `200`; only a
//!   malformed upload (`400`) or a crashed run (`500`) changes the status code.
//! - `GET /summary.txt` – Summary of the latest upload as a `text/plain` attachment.
//! - `GET /metrics` – Run counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::config::{CHAT_MODEL, EMBEDDING_MODEL, MAX_UPLOAD_BYTES};
use crate::metrics::MetricsSnapshot;
use crate::processing::{PipelineApi, RunReport, UploadedDocument};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::RwLock;

/// Multipart field carrying the PDF.
pub const UPLOAD_FIELD: &str = "file";

const INDEX_HTML: &str = include_str!("api/index.html");

struct AppState<S> {
    service: Arc<S>,
    /// Sequence number of the most recent upload to arrive.
    uploads: AtomicU64,
    last_summary: RwLock<Option<String>>,
}

/// Build the HTTP router exposing the explainer UI and API.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    let state = Arc::new(AppState {
        service,
        uploads: AtomicU64::new(0),
        last_summary: RwLock::new(None),
    });
    Router::new()
        .route("/", get(index_page))
        .route("/status", get(get_status::<S>))
        .route("/summaries", post(create_summary::<S>))
        .route("/summary.txt", get(download_summary::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Response body for `GET /status`.
#[derive(Serialize)]
struct StatusResponse {
    /// Whether every provider credential is configured.
    ready: bool,
    warnings: Vec<String>,
    embedding_model: &'static str,
    chat_model: &'static str,
}

async fn get_status<S>(State(state): State<Arc<AppState<S>>>) -> Json<StatusResponse>
where
    S: PipelineApi,
{
    let warnings = state.service.credential_warnings();
    Json(StatusResponse {
        ready: warnings.is_empty(),
        warnings,
        embedding_model: EMBEDDING_MODEL,
        chat_model: CHAT_MODEL,
    })
}

/// Run the pipeline on an uploaded PDF.
///
/// Each upload takes a sequence number on arrival and clears the previous summary. When the run
/// ends, its outcome replaces the downloadable summary only if no newer upload has arrived, so
/// `/summary.txt` never serves a summary for a different document than the last upload and
/// serves nothing after that upload fails.
async fn create_summary<S>(
    State(state): State<Arc<AppState<S>>>,
    mut multipart: Multipart,
) -> Result<Json<RunReport>, AppError>
where
    S: PipelineApi + 'static,
{
    let upload = read_upload(&mut multipart).await?;
    if !upload.has_pdf_extension() {
        return Err(AppError::BadRequest(format!(
            "{} is not a PDF; upload a file with a .pdf extension",
            upload.filename
        )));
    }

    let ticket = state.uploads.fetch_add(1, Ordering::SeqCst) + 1;
    state.last_summary.write().await.take();

    let service = Arc::clone(&state.service);
    let report = tokio::spawn(async move { service.summarize_upload(upload).await })
        .await
        .map_err(|error| AppError::Unexpected(describe_join_error(error)))?;

    {
        let mut last_summary = state.last_summary.write().await;
        if state.uploads.load(Ordering::SeqCst) == ticket {
            *last_summary = report.summary.clone();
        } else {
            tracing::debug!(
                run_id = %report.run_id,
                "Newer upload arrived; leaving the download to it"
            );
        }
    }
    tracing::info!(
        run_id = %report.run_id,
        file = %report.filename,
        succeeded = report.succeeded(),
        "Summary request completed"
    );
    Ok(Json(report))
}

async fn read_upload(multipart: &mut Multipart) -> Result<UploadedDocument, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("the uploaded file has no name".into()))?;
        let bytes = field.bytes().await?;
        tracing::debug!(file = %filename, bytes = bytes.len(), "Received upload");
        return Ok(UploadedDocument::new(filename, bytes.to_vec()));
    }
    Err(AppError::BadRequest(format!(
        "no file uploaded; send the PDF in the `{UPLOAD_FIELD}` field"
    )))
}

fn describe_join_error(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "the run panicked".to_string()
    }
}

async fn download_summary<S>(State(state): State<Arc<AppState<S>>>) -> Response
where
    S: PipelineApi,
{
    match state.last_summary.read().await.clone() {
        Some(summary) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"summary.txt\"",
                ),
            ],
            summary,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "No summary has been generated yet.").into_response(),
    }
}

async fn get_metrics<S>(State(state): State<Arc<AppState<S>>>) -> Json<MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(state.service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summaries",
                description: "Upload one research paper PDF as multipart field `file`. Extracts the text, indexes it, and returns a run report with per-stage status and the blog-style summary.",
            },
            CommandDescriptor {
                name: "download_summary",
                method: "GET",
                path: "/summary.txt",
                description: "Download the most recent summary as summary.txt.",
            },
            CommandDescriptor {
                name: "status",
                method: "GET",
                path: "/status",
                description: "Report credential warnings and the models in use.",
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return run counters: runs started, summaries generated, and failures per stage.",
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Upload(MultipartError),
    Unexpected(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Upload(error) => (error.status(), error.body_text()).into_response(),
            Self::Unexpected(message) => {
                tracing::error!(error = %message, "Summary run crashed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("An error occurred: {message}"),
                )
                    .into_response()
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Upload(inner)
    }
}

//! HTTP API for the tasklog server

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::export;
use crate::extractor::AppJson;
use crate::filter::LogQuery;
use crate::models::{
    CreateLogRequest, IncomingFile, PdfExportResponse, ReportLog, UpdateLogRequest,
    UploadResponse,
};
use crate::reports::ReportLogService;
use crate::session::{GateDecision, RouteGate};

/// Application state shared across handlers
pub struct AppState {
    pub reports: ReportLogService,
    pub gate: RouteGate,
    pub config: Config,
}

impl AppState {
    pub fn new(reports: ReportLogService, config: Config) -> Arc<Self> {
        let gate = RouteGate::new(&config.auth);
        Arc::new(Self {
            reports,
            gate,
            config,
        })
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads_route = format!(
        "{}/{{name}}",
        state.config.storage.uploads_url_prefix.trim_end_matches('/')
    );

    Router::new()
        .route("/health", get(health))
        .route("/reports/logs", get(list_logs).post(create_log))
        .route("/reports/logs/departments", get(departments))
        .route("/reports/logs/export", get(export_csv))
        .route("/reports/logs/export/pdf", get(export_pdf))
        .route(
            "/reports/logs/files",
            axum::routing::post(upload_files)
                .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes)),
        )
        .route(
            "/reports/logs/files/{file_id}",
            get(download_file).delete(delete_file),
        )
        .route(
            "/reports/logs/{id}",
            get(get_log).patch(update_log).delete(delete_log),
        )
        .route(&uploads_route, get(serve_upload))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), gate_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tasklog",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

/// Role gate - redirects users away from pages meant for another role
async fn gate_middleware(
    State(state): State<Arc<AppState>>,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let decision = state.gate.check(
        request.uri().path(),
        state.gate.token_from_headers(request.headers()),
    );

    match decision {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(target) => {
            tracing::debug!(
                path = %request.uri().path(),
                target = %target,
                "Redirecting gated request"
            );
            Redirect::temporary(&target).into_response()
        }
    }
}

async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<ReportLog>>> {
    let filter = query.parse()?;
    Ok(Json(state.reports.list(&filter).await?))
}

async fn create_log(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<CreateLogRequest>,
) -> Result<(StatusCode, Json<ReportLog>)> {
    let log = state.reports.create(request).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReportLog>> {
    Ok(Json(state.reports.get(&id).await?))
}

async fn update_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateLogRequest>,
) -> Result<Json<ReportLog>> {
    Ok(Json(state.reports.update(&id, request).await?))
}

async fn delete_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.reports.delete(&id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn departments() -> Json<Vec<&'static str>> {
    Json(ReportLogService::departments())
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Response> {
    let filter = query.parse()?;
    let csv = state.reports.export_csv(&filter).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::csv_filename(Utc::now())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

async fn export_pdf(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<PdfExportResponse>> {
    let filter = query.parse()?;
    let logs = state.reports.export_pdf_data(&filter).await?;
    Ok(Json(PdfExportResponse { logs }))
}

/// Multipart upload: a `logId` text field plus one or more `files` parts
async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut log_id: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "logId" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read logId field: {}", e))
                })?;
                log_id = Some(text);
            }
            "files" | "file" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                files.push(IncomingFile {
                    file_name,
                    data: data.to_vec(),
                });
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown upload field");
            }
        }
    }

    let files = state
        .reports
        .upload_files(log_id.as_deref(), files)
        .await?;
    Ok(Json(UploadResponse {
        success: true,
        files,
    }))
}

fn attachment_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"",
        file_name.replace(['"', '\\', '\r', '\n'], "_")
    )
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let (attachment, data) = state.reports.download_file(&file_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment_disposition(&attachment.file_name),
            ),
        ],
        data,
    )
        .into_response())
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.reports.delete_file(&file_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response> {
    let data = state.reports.read_upload(&name).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response())
}

//! Axum route handlers for the Resume API.

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::analysis::job_search::job_search_url;
use crate::analysis::orchestrator::Submission;
use crate::document::UploadedDocument;
use crate::errors::AppError;
use crate::models::resume::ResumeRecord;
use crate::state::AppState;
use crate::storage::codec::RECORD_KEY_PREFIX;
use crate::storage::s3::UPLOAD_PREFIX;
use crate::storage::DirectoryEntry;

const DEFAULT_FILE_NAME: &str = "resume.pdf";

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub id: Uuid,
    pub status: String,
    pub status_history: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResumeDetailResponse {
    pub resume: ResumeRecord,
    pub job_search_url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes
///
/// Multipart form: `file` (required), `company_name`, `job_title`, `job_description`.
/// Runs the whole analysis before responding. The run is spawned so it still
/// reaches a terminal state if the client disconnects first.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let submission = read_submission(multipart, state.config.max_upload_bytes).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = state.orchestrator.clone();
    let result = tokio::spawn(async move { orchestrator.analyze(submission, Some(tx)).await })
        .await
        .map_err(|e| AppError::Internal(format!("analysis task failed: {e}")))?;

    let mut status_history = Vec::new();
    while let Ok(update) = rx.try_recv() {
        status_history.push(update.message);
    }

    let id = result.map_err(|failure| AppError::Analysis {
        failure,
        status_history: status_history.clone(),
    })?;

    Ok(Json(AnalyzeResponse {
        id,
        status: status_history.last().cloned().unwrap_or_default(),
        status_history,
    }))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    Ok(Json(state.storage.list_records(RECORD_KEY_PREFIX).await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDetailResponse>, AppError> {
    let resume = load_record(&state, id).await?;
    let job_search_url = job_search_url(&resume.job_title);
    Ok(Json(ResumeDetailResponse {
        resume,
        job_search_url,
    }))
}

/// GET /api/v1/resumes/:id/document
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let resume = load_record(&state, id).await?;
    blob_response(&state, &resume.resume_path).await
}

/// GET /api/v1/resumes/:id/preview
pub async fn handle_get_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let resume = load_record(&state, id).await?;
    blob_response(&state, &resume.image_path).await
}

/// GET /api/v1/uploads
pub async fn handle_list_uploads(
    State(state): State<AppState>,
) -> Result<Json<Vec<DirectoryEntry>>, AppError> {
    Ok(Json(state.storage.list_blobs(UPLOAD_PREFIX).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn load_record(state: &AppState, id: Uuid) -> Result<ResumeRecord, AppError> {
    state
        .storage
        .get_record(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

async fn blob_response(
    state: &AppState,
    path: &str,
) -> Result<([(header::HeaderName, String); 1], Bytes), AppError> {
    let bytes = state.storage.read_blob(path).await?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

async fn read_submission(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<Submission, AppError> {
    let mut document: Option<UploadedDocument> = None;
    let mut company_name = String::new();
    let mut job_title = String::new();
    let mut job_description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(DEFAULT_FILE_NAME)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                document = Some(UploadedDocument { file_name, bytes });
            }
            "company_name" | "job_title" | "job_description" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read {name}: {e}")))?;
                match name.as_str() {
                    "company_name" => company_name = value,
                    "job_title" => job_title = value,
                    _ => job_description = value,
                }
            }
            _ => {}
        }
    }

    let document =
        document.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    if document.bytes.is_empty() {
        return Err(AppError::Validation("file cannot be empty".to_string()));
    }
    if document.bytes.len() > max_upload_bytes {
        return Err(AppError::Validation(format!(
            "file exceeds the {max_upload_bytes} byte upload limit"
        )));
    }

    Ok(Submission {
        document,
        company_name,
        job_title,
        job_description,
    })
}

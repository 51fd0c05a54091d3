//! Material progress of a student and its CSV/PDF exports.

use crate::domain::{MaterialProgress, ProgressUpdate};
use crate::error::AppError;
use crate::extractors::{JsonBody, PathIds};
use crate::response;
use crate::service::{progress_rows, render_pdf, write_csv, ExportError, ProgressRow};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub area_id: Uuid,
    pub material_name: String,
    pub material_id: Uuid,
    pub stage: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<MaterialProgress> for ProgressResponse {
    fn from(p: MaterialProgress) -> Self {
        ProgressResponse {
            area_id: p.area_id,
            material_name: p.material_name,
            material_id: p.material_id,
            stage: p.stage,
            updated_at: p.updated_at,
        }
    }
}

pub async fn get_progress(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state
        .students
        .get_progress(student_id)
        .await
        .map_err(|e| AppError::internal("Failed querying material", e))?;
    Ok(Json(progress.into_iter().map(ProgressResponse::from).collect::<Vec<_>>()))
}

#[derive(Deserialize, Debug)]
pub struct PatchProgressBody {
    pub stage: i32,
}

pub async fn patch_progress(
    State(state): State<AppState>,
    PathIds((student_id, material_id)): PathIds<(Uuid, Uuid)>,
    JsonBody(body): JsonBody<PatchProgressBody>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state
        .students
        .update_progress(ProgressUpdate {
            student_id,
            material_id,
            stage: body.stage,
            updated_at: Utc::now(),
        })
        .await
        .map_err(|e| AppError::store("Failed updating progress", e))?;
    Ok(Json(ProgressResponse::from(progress)))
}

/// Curriculum name and one row per curriculum material.
async fn export_rows(state: &AppState, student_id: Uuid) -> Result<(String, Vec<ProgressRow>), AppError> {
    let progress = state
        .students
        .get_progress(student_id)
        .await
        .map_err(|e| AppError::internal("failed querying material", e))?;
    let curriculum = state
        .students
        .find_curriculum(student_id)
        .await
        .map_err(|e| AppError::internal("failed querying material", e))?;
    Ok((curriculum.name.clone(), progress_rows(&curriculum, &progress)))
}

/// Runs an export writer on the blocking pool.
async fn render<F>(message: &'static str, write: F) -> Result<Vec<u8>, AppError>
where
    F: FnOnce() -> Result<Vec<u8>, ExportError> + Send + 'static,
{
    tokio::task::spawn_blocking(write)
        .await
        .map_err(|e| AppError::internal(message, e))?
        .map_err(|e| AppError::internal(message, e))
}

pub async fn export_csv(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (_, rows) = export_rows(&state, student_id).await?;
    let bytes = render("failed to write csv response", move || write_csv(&rows)).await?;
    Ok(response::csv(bytes))
}

pub async fn export_pdf(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (name, rows) = export_rows(&state, student_id).await?;
    let title = if name.is_empty() { "Progress".to_string() } else { name };
    let bytes = render("failed to write pdf response", move || render_pdf(&title, &rows)).await?;
    Ok(response::pdf(bytes))
}

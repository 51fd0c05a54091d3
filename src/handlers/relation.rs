//! Guardian and class link rows of a student.

use crate::domain::GuardianRelationship;
use crate::error::AppError;
use crate::extractors::{JsonBody, PathIds};
use crate::response::empty;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
pub struct PostGuardianRelationBody {
    pub id: Uuid,
    #[serde(default)]
    pub relationship: GuardianRelationship,
}

pub async fn post_guardian_relation(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PostGuardianRelationBody>,
) -> Result<impl IntoResponse, AppError> {
    state
        .students
        .insert_guardian_relation(student_id, body.id, body.relationship)
        .await
        .map_err(|e| AppError::internal("Failed creating guardian relation", e))?;
    Ok(empty(StatusCode::CREATED))
}

pub async fn delete_guardian_relation(
    State(state): State<AppState>,
    PathIds((student_id, guardian_id)): PathIds<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .students
        .delete_guardian_relation(student_id, guardian_id)
        .await
        .map_err(|e| AppError::internal("Failed deleting guardian relation", e))?;
    Ok(empty(StatusCode::NO_CONTENT))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ClassRelationBody {
    pub class_id: Uuid,
}

pub async fn post_class_relation(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<ClassRelationBody>,
) -> Result<impl IntoResponse, AppError> {
    state
        .students
        .new_class_relation(student_id, body.class_id)
        .await
        .map_err(|e| AppError::internal("Failed adding class", e))?;
    Ok(empty(StatusCode::OK))
}

pub async fn delete_class_relation(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<ClassRelationBody>,
) -> Result<impl IntoResponse, AppError> {
    state
        .students
        .delete_class_relation(student_id, body.class_id)
        .await
        .map_err(|e| AppError::internal("Failed removing class", e))?;
    Ok(empty(StatusCode::OK))
}

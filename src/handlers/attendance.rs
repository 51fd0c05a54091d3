//! Attendance of a student in a class.

use crate::domain::Attendance;
use crate::error::AppError;
use crate::extractors::{JsonBody, PathIds};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The student comes from the path; a `studentId` in the body is ignored.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostAttendanceBody {
    pub class_id: Uuid,
    pub date: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub date: DateTime<Utc>,
}

impl From<Attendance> for AttendanceResponse {
    fn from(a: Attendance) -> Self {
        AttendanceResponse {
            id: a.id,
            student_id: a.student_id,
            class_id: a.class_id,
            date: a.date,
        }
    }
}

pub async fn post_attendance(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PostAttendanceBody>,
) -> Result<impl IntoResponse, AppError> {
    let attendance = state
        .students
        .insert_attendance(student_id, body.class_id, body.date)
        .await
        .map_err(|e| AppError::internal("Can't create attendance", e))?;
    Ok(Json(AttendanceResponse::from(attendance)))
}

pub async fn get_attendance(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attendance = state
        .students
        .get_attendance(student_id)
        .await
        .map_err(|e| AppError::internal("Can't find attendance", e))?;
    Ok(Json(
        attendance.into_iter().map(AttendanceResponse::from).collect::<Vec<_>>(),
    ))
}

//! Student record: read with guardians and classes, partial update, delete.

use super::THUMBNAIL_SMALL;
use crate::auth::STUDENT_NOT_FOUND;
use crate::domain::{Gender, StudentDetails};
use crate::error::AppError;
use crate::extractors::{JsonBody, PathIds};
use crate::response::empty;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GuardianResponse {
    pub id: Uuid,
    pub name: String,
    pub relationship: i32,
    pub email: String,
}

#[derive(Serialize, Debug)]
pub struct ClassResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_entry: Option<DateTime<Utc>>,
    pub gender: Gender,
    pub note: String,
    pub custom_id: String,
    pub active: bool,
    /// Empty when the student has no profile image.
    pub profile_pic: String,
    pub classes: Vec<ClassResponse>,
    pub guardians: Vec<GuardianResponse>,
}

pub async fn get_student(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let StudentDetails {
        student,
        guardians,
        classes,
        profile_image,
    } = state
        .students
        .get(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(STUDENT_NOT_FOUND.into()))?;

    let mut guardian_responses = Vec::with_capacity(guardians.len());
    for guardian in guardians {
        let relation = state
            .students
            .get_guardian_relation(student_id, guardian.id)
            .await?
            .ok_or_else(|| {
                AppError::internal(
                    "Internal Server Error",
                    format!("guardian {} has no relation to student {}", guardian.id, student_id),
                )
            })?;
        guardian_responses.push(GuardianResponse {
            id: guardian.id,
            name: guardian.name,
            relationship: relation.relationship.into(),
            email: guardian.email,
        });
    }

    let profile_pic = profile_image
        .map(|image| {
            state
                .imgproxy
                .thumbnail_url(&image.object_key, THUMBNAIL_SMALL, THUMBNAIL_SMALL)
        })
        .unwrap_or_default();

    Ok(Json(StudentResponse {
        id: student.id,
        name: student.name,
        date_of_birth: student.date_of_birth,
        date_of_entry: student.date_of_entry,
        gender: student.gender,
        note: student.note,
        custom_id: student.custom_id,
        active: student.active,
        profile_pic,
        classes: classes
            .into_iter()
            .map(|c| ClassResponse { id: c.id, name: c.name })
            .collect(),
        guardians: guardian_responses,
    }))
}

pub async fn delete_student(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.students.delete_student(student_id).await?;
    Ok(empty(StatusCode::OK))
}

/// `Some(None)` for an explicit `null`, `None` when the key is absent.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Fields left out of the body keep their stored value; `null` clears the nullable ones.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatchStudentBody {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_of_birth: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_of_entry: Option<Option<DateTime<Utc>>>,
    pub custom_id: Option<String>,
    pub gender: Option<Gender>,
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub profile_image_id: Option<Option<Uuid>>,
    pub note: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PatchStudentResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    pub active: bool,
}

pub async fn patch_student(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PatchStudentBody>,
) -> Result<impl IntoResponse, AppError> {
    let mut student = state
        .students
        .get(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(STUDENT_NOT_FOUND.into()))?
        .student;

    if let Some(name) = body.name {
        student.name = name;
    }
    if let Some(date_of_birth) = body.date_of_birth {
        student.date_of_birth = date_of_birth;
    }
    if let Some(date_of_entry) = body.date_of_entry {
        student.date_of_entry = date_of_entry;
    }
    if let Some(custom_id) = body.custom_id {
        student.custom_id = custom_id;
    }
    if let Some(gender) = body.gender {
        student.gender = gender;
    }
    if let Some(active) = body.active {
        student.active = active;
    }
    if let Some(profile_image_id) = body.profile_image_id {
        student.profile_image_id = profile_image_id;
    }
    if let Some(note) = body.note {
        student.note = note;
    }

    state
        .students
        .update_student(&student)
        .await
        .map_err(|e| AppError::internal("Failed updating student", e))?;

    Ok(Json(PatchStudentResponse {
        id: student.id,
        name: student.name,
        date_of_birth: student.date_of_birth,
        active: student.active,
    }))
}

//! Session middleware and per-resource authorization gates.
//!
//! Denied access to a student or curriculum resource answers 404 so callers cannot
//! discover which ids exist.

use crate::domain::Session;
use crate::error::AppError;
use crate::extractors::SessionCookie;
use crate::state::AppState;
use crate::store::StoreError;
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use uuid::Uuid;

pub const STUDENT_NOT_FOUND: &str = "We can't find the specified student";
pub const RESOURCE_NOT_FOUND: &str = "We can't find the specified resource";

/// Resolve the `session` cookie and store the `Session` in request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    SessionCookie(token): SessionCookie,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = token else {
        return Err(AppError::Unauthorized("unauthorized".into()));
    };
    match state.sessions.find_session(&token).await? {
        Some(session) => {
            req.extensions_mut().insert(session);
            Ok(next.run(req).await)
        }
        None => {
            tracing::warn!("rejected unknown session token");
            Err(AppError::Unauthorized("unauthorized".into()))
        }
    }
}

/// Gate for every `/{studentId}` route.
pub async fn authorize_student(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(STUDENT_NOT_FOUND.into());
    let student_id = params
        .get("studentId")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(not_found)?;
    let Some(session) = req.extensions().get::<Session>() else {
        return Err(not_found());
    };
    let allowed = state
        .students
        .check_permissions(student_id, session.user_id)
        .await
        .map_err(internal)?;
    if !allowed {
        tracing::debug!(%student_id, user_id = %session.user_id, "student access denied");
        return Err(not_found());
    }
    Ok(next.run(req).await)
}

/// Gate for curriculum routes. The innermost id present in the path decides which check runs.
pub async fn authorize_curriculum(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(RESOURCE_NOT_FOUND.into());
    let Some(session) = req.extensions().get::<Session>() else {
        return Err(not_found());
    };
    let user_id = session.user_id;
    let id = |key: &str| params.get(key).and_then(|raw| Uuid::parse_str(raw).ok());
    let store = &state.curriculum;

    let allowed = if let Some(material_id) = id("materialId") {
        store.check_material_permission(material_id, user_id).await
    } else if let Some(subject_id) = id("subjectId") {
        store.check_subject_permissions(subject_id, user_id).await
    } else if let Some(area_id) = id("areaId") {
        store.check_area_permissions(area_id, user_id).await
    } else if let Some(curriculum_id) = id("curriculumId") {
        store.check_curriculum_permission(curriculum_id, user_id).await
    } else {
        Ok(false)
    }
    .map_err(internal)?;

    if !allowed {
        tracing::debug!(user_id = %user_id, ?params, "curriculum access denied");
        return Err(not_found());
    }
    Ok(next.run(req).await)
}

fn internal(err: StoreError) -> AppError {
    AppError::internal("Internal Server Error", err)
}

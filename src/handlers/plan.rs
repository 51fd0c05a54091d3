//! Lesson plans of a student for one day.

use super::{parse_time, NamedRefResponse};
use crate::domain::LessonPlan;
use crate::error::AppError;
use crate::extractors::PathIds;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct LessonPlanResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<NamedRefResponse>,
    pub user: NamedRefResponse,
}

impl From<LessonPlan> for LessonPlanResponse {
    fn from(plan: LessonPlan) -> Self {
        LessonPlanResponse {
            id: plan.id,
            title: plan.title,
            description: plan.description,
            date: plan.date,
            area: plan.area.map(NamedRefResponse::from),
            user: plan.user.into(),
        }
    }
}

/// Lesson plans of the student on the day starting at `?date=`.
pub async fn get_plans(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_time("date", params.get("date"))?
        .ok_or_else(|| AppError::bad_request("date needs to be in ISO format"))?;
    let plans = state
        .students
        .get_lesson_plans(student_id, date)
        .await
        .map_err(|e| AppError::internal("Failed querying lesson plans", e))?;
    Ok(Json(plans.into_iter().map(LessonPlanResponse::from).collect::<Vec<_>>()))
}

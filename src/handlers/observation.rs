//! Observations recorded about a student, with search and date filters.

use super::{parse_time, ImageRef, NamedRefResponse};
use crate::domain::{NewObservation, Observation, ObservationFilter, Session};
use crate::error::AppError;
use crate::extractors::{JsonBody, PathIds};
use crate::imgproxy::ImgProxy;
use crate::response::created;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PostObservationBody {
    pub short_desc: String,
    pub long_desc: String,
    pub category_id: String,
    /// Defaults to the time the request is handled.
    pub event_time: Option<DateTime<Utc>>,
    pub images: Vec<Uuid>,
    pub area_id: Option<Uuid>,
    pub visible_to_guardians: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ObservationResponse {
    pub id: Uuid,
    pub student_name: String,
    pub short_desc: String,
    pub long_desc: String,
    pub category_id: String,
    pub created_date: DateTime<Utc>,
    pub event_time: DateTime<Utc>,
    pub images: Vec<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<NamedRefResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    pub visible_to_guardians: bool,
}

impl ObservationResponse {
    pub fn new(observation: Observation, imgproxy: &ImgProxy) -> Self {
        let (creator_id, creator_name) = match observation.creator {
            Some(creator) => (Some(creator.id), Some(creator.name)),
            None => (None, None),
        };
        ObservationResponse {
            id: observation.id,
            student_name: observation.student_name,
            short_desc: observation.short_desc,
            long_desc: observation.long_desc,
            category_id: observation.category_id,
            created_date: observation.created_date,
            event_time: observation.event_time,
            images: observation.images.iter().map(|i| ImageRef::new(i, imgproxy)).collect(),
            area: observation.area.map(NamedRefResponse::from),
            creator_id,
            creator_name,
            visible_to_guardians: observation.visible_to_guardians,
        }
    }
}

pub async fn post_observation(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathIds(student_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PostObservationBody>,
) -> Result<impl IntoResponse, AppError> {
    let observation = state
        .students
        .insert_observation(NewObservation {
            student_id,
            creator_id: session.user_id,
            short_desc: body.short_desc,
            long_desc: body.long_desc,
            category_id: body.category_id,
            event_time: body.event_time.unwrap_or_else(Utc::now),
            images: body.images,
            area_id: body.area_id.filter(|id| !id.is_nil()),
            visible_to_guardians: body.visible_to_guardians,
        })
        .await
        .map_err(|e| AppError::store("Failed inserting observation", e))?;
    Ok(created(ObservationResponse::new(observation, &state.imgproxy)))
}

pub async fn get_observations(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ObservationFilter {
        search: params.get("search").cloned(),
        start_date: parse_time("startDate", params.get("startDate"))?,
        end_date: parse_time("endDate", params.get("endDate"))?,
    };
    let observations = state
        .students
        .get_observations(student_id, &filter)
        .await
        .map_err(|e| AppError::internal("Failed querying observations", e))?;
    Ok(Json(
        observations
            .into_iter()
            .map(|o| ObservationResponse::new(o, &state.imgproxy))
            .collect::<Vec<_>>(),
    ))
}

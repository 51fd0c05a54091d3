//! Curriculum hierarchy: areas, subjects and materials.
//!
//! Moving a subject or material under another parent requires access to the new parent as well.

use crate::auth::RESOURCE_NOT_FOUND;
use crate::domain::{Area, Curriculum, CurriculumUpdate, Material, MaterialUpdate, Session, Subject, SubjectMaterial, SubjectUpdate};
use crate::error::AppError;
use crate::extractors::{JsonBody, PathIds};
use crate::response::{created, empty};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn not_found() -> AppError {
    AppError::NotFound(RESOURCE_NOT_FOUND.into())
}

#[derive(Serialize, Debug)]
pub struct CurriculumResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<Curriculum> for CurriculumResponse {
    fn from(c: Curriculum) -> Self {
        CurriculumResponse {
            id: c.id,
            name: c.name,
            description: c.description,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AreaResponse {
    pub id: Uuid,
    pub curriculum_id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<Area> for AreaResponse {
    fn from(a: Area) -> Self {
        AreaResponse {
            id: a.id,
            curriculum_id: a.curriculum_id,
            name: a.name,
            description: a.description,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MaterialResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub name: String,
    pub order: i32,
    pub description: String,
}

impl From<Material> for MaterialResponse {
    fn from(m: Material) -> Self {
        MaterialResponse {
            id: m.id,
            subject_id: m.subject_id,
            name: m.name,
            order: m.order,
            description: m.description,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub id: Uuid,
    pub area_id: Uuid,
    pub name: String,
    pub order: i32,
    pub description: String,
    pub materials: Vec<MaterialResponse>,
}

impl From<Subject> for SubjectResponse {
    fn from(s: Subject) -> Self {
        SubjectResponse {
            id: s.id,
            area_id: s.area_id,
            name: s.name,
            order: s.order,
            description: s.description,
            materials: s.materials.into_iter().map(MaterialResponse::from).collect(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct PatchCurriculumBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn patch_curriculum(
    State(state): State<AppState>,
    PathIds(curriculum_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PatchCurriculumBody>,
) -> Result<impl IntoResponse, AppError> {
    let update = CurriculumUpdate {
        name: body.name,
        description: body.description,
    };
    let curriculum = state
        .curriculum
        .update_curriculum(curriculum_id, &update)
        .await
        .map_err(|e| AppError::internal("Failed updating curriculum", e))?
        .ok_or_else(not_found)?;
    Ok(Json(CurriculumResponse::from(curriculum)))
}

#[derive(Deserialize, Debug)]
pub struct PostAreaBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn post_area(
    State(state): State<AppState>,
    PathIds(curriculum_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PostAreaBody>,
) -> Result<impl IntoResponse, AppError> {
    let area = state
        .curriculum
        .new_area(curriculum_id, &body.name, &body.description)
        .await
        .map_err(|e| AppError::internal("Failed creating area", e))?;
    Ok(created(AreaResponse::from(area)))
}

pub async fn get_area(
    State(state): State<AppState>,
    PathIds(area_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let area = state.curriculum.get_area(area_id).await?.ok_or_else(not_found)?;
    Ok(Json(AreaResponse::from(area)))
}

#[derive(Deserialize, Debug)]
pub struct PatchAreaBody {
    pub name: String,
}

pub async fn patch_area(
    State(state): State<AppState>,
    PathIds(area_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PatchAreaBody>,
) -> Result<impl IntoResponse, AppError> {
    state
        .curriculum
        .update_area(area_id, &body.name)
        .await
        .map_err(|e| AppError::internal("Failed updating area", e))?;
    let area = state.curriculum.get_area(area_id).await?.ok_or_else(not_found)?;
    Ok(Json(AreaResponse::from(area)))
}

pub async fn delete_area(
    State(state): State<AppState>,
    PathIds(area_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .curriculum
        .delete_area(area_id)
        .await
        .map_err(|e| AppError::internal("Failed deleting area", e))?;
    Ok(empty(StatusCode::OK))
}

pub async fn get_area_subjects(
    State(state): State<AppState>,
    PathIds(area_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let subjects = state.curriculum.get_area_subjects(area_id).await?;
    Ok(Json(subjects.into_iter().map(SubjectResponse::from).collect::<Vec<_>>()))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMaterialBody {
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub description: String,
}

impl From<SubjectMaterialBody> for SubjectMaterial {
    fn from(m: SubjectMaterialBody) -> Self {
        SubjectMaterial {
            id: m.id,
            name: m.name,
            order: m.order,
            description: m.description,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PostSubjectBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub materials: Vec<SubjectMaterialBody>,
}

pub async fn post_subject(
    State(state): State<AppState>,
    PathIds(area_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PostSubjectBody>,
) -> Result<impl IntoResponse, AppError> {
    let materials: Vec<SubjectMaterial> = body.materials.into_iter().map(SubjectMaterial::from).collect();
    let subject = state
        .curriculum
        .new_subject(area_id, &body.name, &materials, &body.description)
        .await
        .map_err(|e| AppError::internal("Failed creating subject", e))?;
    Ok(created(SubjectResponse::from(subject)))
}

pub async fn get_subject(
    State(state): State<AppState>,
    PathIds(subject_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let subject = state.curriculum.get_subject(subject_id).await?.ok_or_else(not_found)?;
    Ok(Json(SubjectResponse::from(subject)))
}

/// A new parent area must be one the caller can access.
async fn ensure_area_access(state: &AppState, area_id: Uuid, session: &Session) -> Result<(), AppError> {
    if state.curriculum.check_area_permissions(area_id, session.user_id).await? {
        Ok(())
    } else {
        Err(not_found())
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutSubjectBody {
    pub name: String,
    pub area_id: Uuid,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub materials: Vec<SubjectMaterialBody>,
}

pub async fn put_subject(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathIds(subject_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PutSubjectBody>,
) -> Result<impl IntoResponse, AppError> {
    ensure_area_access(&state, body.area_id, &session).await?;
    let materials: Vec<SubjectMaterial> = body.materials.into_iter().map(SubjectMaterial::from).collect();
    let subject = state
        .curriculum
        .replace_subject(subject_id, &body.name, body.area_id, body.order, &materials)
        .await
        .map_err(|e| AppError::store("Failed replacing subject", e))?;
    Ok(Json(SubjectResponse::from(subject)))
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PatchSubjectBody {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub description: Option<String>,
    pub area_id: Option<Uuid>,
}

pub async fn patch_subject(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathIds(subject_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PatchSubjectBody>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(area_id) = body.area_id {
        ensure_area_access(&state, area_id, &session).await?;
    }
    let update = SubjectUpdate {
        name: body.name,
        order: body.order,
        description: body.description,
        area_id: body.area_id,
    };
    let subject = state
        .curriculum
        .update_subject(subject_id, &update)
        .await
        .map_err(|e| AppError::internal("Failed updating subject", e))?
        .ok_or_else(not_found)?;
    Ok(Json(SubjectResponse::from(subject)))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    PathIds(subject_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .curriculum
        .delete_subject(subject_id)
        .await
        .map_err(|e| AppError::internal("Failed deleting subject", e))?;
    Ok(empty(StatusCode::OK))
}

pub async fn get_subject_materials(
    State(state): State<AppState>,
    PathIds(subject_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let materials = state.curriculum.get_subject_materials(subject_id).await?;
    Ok(Json(materials.into_iter().map(MaterialResponse::from).collect::<Vec<_>>()))
}

#[derive(Deserialize, Debug)]
pub struct PostMaterialBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn post_material(
    State(state): State<AppState>,
    PathIds(subject_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PostMaterialBody>,
) -> Result<impl IntoResponse, AppError> {
    let material = state
        .curriculum
        .new_material(subject_id, &body.name, &body.description)
        .await
        .map_err(|e| AppError::internal("Failed creating material", e))?;
    Ok(created(MaterialResponse::from(material)))
}

pub async fn get_material(
    State(state): State<AppState>,
    PathIds(material_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let material = state.curriculum.get_material(material_id).await?.ok_or_else(not_found)?;
    Ok(Json(MaterialResponse::from(material)))
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PatchMaterialBody {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub description: Option<String>,
    pub subject_id: Option<Uuid>,
}

pub async fn patch_material(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathIds(material_id): PathIds<Uuid>,
    JsonBody(body): JsonBody<PatchMaterialBody>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(subject_id) = body.subject_id {
        if !state
            .curriculum
            .check_subject_permissions(subject_id, session.user_id)
            .await?
        {
            return Err(not_found());
        }
    }
    let update = MaterialUpdate {
        name: body.name,
        order: body.order,
        description: body.description,
        subject_id: body.subject_id,
    };
    state
        .curriculum
        .update_material(material_id, &update)
        .await
        .map_err(|e| AppError::internal("Failed updating material", e))?;
    let material = state.curriculum.get_material(material_id).await?.ok_or_else(not_found)?;
    Ok(Json(MaterialResponse::from(material)))
}

pub async fn delete_material(
    State(state): State<AppState>,
    PathIds(material_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .curriculum
        .delete_material(material_id)
        .await
        .map_err(|e| AppError::internal("Failed deleting material", e))?;
    Ok(empty(StatusCode::OK))
}

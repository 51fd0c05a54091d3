//! Entity records shared by the store ports and the handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved `session` cookie.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Gender {
    #[default]
    NotSet,
    Male,
    Female,
}

impl TryFrom<i32> for Gender {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Gender::NotSet),
            1 => Ok(Gender::Male),
            2 => Ok(Gender::Female),
            other => Err(format!("unknown gender code {}", other)),
        }
    }
}

impl From<Gender> for i32 {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::NotSet => 0,
            Gender::Male => 1,
            Gender::Female => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum GuardianRelationship {
    #[default]
    Other,
    Mother,
    Father,
}

impl TryFrom<i32> for GuardianRelationship {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(GuardianRelationship::Other),
            1 => Ok(GuardianRelationship::Mother),
            2 => Ok(GuardianRelationship::Father),
            other => Err(format!("unknown relationship code {}", other)),
        }
    }
}

impl From<GuardianRelationship> for i32 {
    fn from(relationship: GuardianRelationship) -> Self {
        match relationship {
            GuardianRelationship::Other => 0,
            GuardianRelationship::Mother => 1,
            GuardianRelationship::Father => 2,
        }
    }
}

/// Display label of a progress stage; unknown stages have no label.
pub fn assessment_name(stage: i32) -> &'static str {
    match stage {
        0 => "Presented",
        1 => "Practiced",
        2 => "Mastered",
        _ => "",
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub custom_id: String,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub date_of_entry: Option<DateTime<Utc>>,
    pub gender: Gender,
    pub note: String,
    pub active: bool,
    pub profile_image_id: Option<Uuid>,
}

/// Student joined with its guardians, classes and profile image.
#[derive(Clone, Debug)]
pub struct StudentDetails {
    pub student: Student,
    pub guardians: Vec<Guardian>,
    pub classes: Vec<Class>,
    pub profile_image: Option<Image>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Guardian {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuardianToStudent {
    pub student_id: Uuid,
    pub guardian_id: Uuid,
    pub relationship: GuardianRelationship,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub date: DateTime<Utc>,
}

/// `{id, name}` reference to a related row.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Image {
    pub id: Uuid,
    pub object_key: String,
    pub created_at: DateTime<Utc>,
}

/// Raw image upload taken from the multipart body.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Video {
    pub id: Uuid,
    pub playback_url: String,
    pub thumbnail_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub category_id: String,
    pub short_desc: String,
    pub long_desc: String,
    pub created_date: DateTime<Utc>,
    pub event_time: DateTime<Utc>,
    pub creator: Option<NamedRef>,
    pub area: Option<NamedRef>,
    pub images: Vec<Image>,
    pub visible_to_guardians: bool,
}

#[derive(Clone, Debug)]
pub struct NewObservation {
    pub student_id: Uuid,
    pub creator_id: Uuid,
    pub short_desc: String,
    pub long_desc: String,
    pub category_id: String,
    pub event_time: DateTime<Utc>,
    pub images: Vec<Uuid>,
    pub area_id: Option<Uuid>,
    pub visible_to_guardians: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ObservationFilter {
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LessonPlan {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub area: Option<NamedRef>,
    pub user: NamedRef,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Curriculum {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub areas: Vec<Area>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Area {
    pub id: Uuid,
    pub curriculum_id: Uuid,
    pub name: String,
    pub description: String,
    #[sqlx(skip)]
    pub subjects: Vec<Subject>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub area_id: Uuid,
    pub name: String,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub description: String,
    #[sqlx(skip)]
    pub materials: Vec<Material>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Material {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub name: String,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub description: String,
}

/// Material in a new or replaced subject. `id` is kept when it names an existing material.
#[derive(Clone, Debug, PartialEq)]
pub struct SubjectMaterial {
    pub id: Option<Uuid>,
    pub name: String,
    pub order: i32,
    pub description: String,
}

#[derive(Clone, Debug, Default)]
pub struct CurriculumUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct SubjectUpdate {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub description: Option<String>,
    pub area_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default)]
pub struct MaterialUpdate {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub description: Option<String>,
    pub subject_id: Option<Uuid>,
}

/// Progress row joined through material → subject → area.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct MaterialProgress {
    pub student_id: Uuid,
    pub material_id: Uuid,
    pub material_name: String,
    pub area_id: Uuid,
    pub stage: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    pub student_id: Uuid,
    pub material_id: Uuid,
    pub stage: i32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_json() {
        let gender: Gender = serde_json::from_str("2").unwrap();
        assert_eq!(gender, Gender::Female);
        assert_eq!(serde_json::to_string(&GuardianRelationship::Mother).unwrap(), "1");
        assert!(serde_json::from_str::<Gender>("7").is_err());
    }

    #[test]
    fn unknown_stage_has_blank_label() {
        assert_eq!(assessment_name(1), "Practiced");
        assert_eq!(assessment_name(9), "");
    }
}

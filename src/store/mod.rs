//! Store ports, one per resource, and their PostgreSQL implementation.

pub mod postgres;
pub mod schema;

use crate::domain::*;
use crate::storage::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use postgres::{nest_curriculum, PgStore};
pub use schema::{ensure_database_exists, ensure_tables};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Invalid(String),
    /// A referenced row does not exist or lies outside the caller's school.
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Short category for health reporting; never carries row data.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Db(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => "pool_unavailable",
            StoreError::Db(sqlx::Error::Io(_) | sqlx::Error::Tls(_)) => "connection_failed",
            StoreError::Db(_) => "database_error",
            StoreError::Storage(_) => "storage_error",
            StoreError::Invalid(_) => "invalid_data",
            StoreError::NotFound(_) => "not_found",
        }
    }
}

/// Student record and everything hanging off a student id.
#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn insert_observation(&self, observation: NewObservation) -> Result<Observation, StoreError>;
    async fn get_observations(
        &self,
        student_id: Uuid,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>, StoreError>;
    async fn get_progress(&self, student_id: Uuid) -> Result<Vec<MaterialProgress>, StoreError>;
    async fn update_progress(&self, progress: ProgressUpdate) -> Result<MaterialProgress, StoreError>;
    async fn get(&self, student_id: Uuid) -> Result<Option<StudentDetails>, StoreError>;
    async fn update_student(&self, student: &Student) -> Result<(), StoreError>;
    async fn delete_student(&self, student_id: Uuid) -> Result<(), StoreError>;
    async fn check_permissions(&self, student_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn insert_attendance(
        &self,
        student_id: Uuid,
        class_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Attendance, StoreError>;
    async fn get_attendance(&self, student_id: Uuid) -> Result<Vec<Attendance>, StoreError>;
    async fn insert_guardian_relation(
        &self,
        student_id: Uuid,
        guardian_id: Uuid,
        relationship: GuardianRelationship,
    ) -> Result<(), StoreError>;
    async fn delete_guardian_relation(&self, student_id: Uuid, guardian_id: Uuid) -> Result<(), StoreError>;
    async fn get_guardian_relation(
        &self,
        student_id: Uuid,
        guardian_id: Uuid,
    ) -> Result<Option<GuardianToStudent>, StoreError>;
    async fn new_class_relation(&self, student_id: Uuid, class_id: Uuid) -> Result<(), StoreError>;
    async fn delete_class_relation(&self, student_id: Uuid, class_id: Uuid) -> Result<(), StoreError>;
    async fn get_lesson_plans(&self, student_id: Uuid, date: DateTime<Utc>) -> Result<Vec<LessonPlan>, StoreError>;
    async fn create_image(&self, student_id: Uuid, upload: ImageUpload) -> Result<Image, StoreError>;
    async fn find_student_images(&self, student_id: Uuid) -> Result<Vec<Image>, StoreError>;
    async fn find_student_videos(&self, student_id: Uuid) -> Result<Vec<Video>, StoreError>;
    /// Curriculum of the student's school with areas, subjects and materials in export order.
    async fn find_curriculum(&self, student_id: Uuid) -> Result<Curriculum, StoreError>;
}

/// Curriculum hierarchy: curriculum → area → subject → material.
#[async_trait]
pub trait CurriculumStore: Send + Sync {
    async fn get_area(&self, area_id: Uuid) -> Result<Option<Area>, StoreError>;
    async fn get_area_subjects(&self, area_id: Uuid) -> Result<Vec<Subject>, StoreError>;
    async fn get_subject_materials(&self, subject_id: Uuid) -> Result<Vec<Material>, StoreError>;
    async fn get_material(&self, material_id: Uuid) -> Result<Option<Material>, StoreError>;
    async fn new_area(&self, curriculum_id: Uuid, name: &str, description: &str) -> Result<Area, StoreError>;
    async fn new_subject(
        &self,
        area_id: Uuid,
        name: &str,
        materials: &[SubjectMaterial],
        description: &str,
    ) -> Result<Subject, StoreError>;
    async fn new_material(&self, subject_id: Uuid, name: &str, description: &str) -> Result<Material, StoreError>;
    async fn get_subject(&self, subject_id: Uuid) -> Result<Option<Subject>, StoreError>;
    async fn update_material(&self, material_id: Uuid, update: &MaterialUpdate) -> Result<(), StoreError>;
    async fn delete_area(&self, area_id: Uuid) -> Result<(), StoreError>;
    async fn delete_subject(&self, subject_id: Uuid) -> Result<(), StoreError>;
    /// Overwrites the subject and its material list; listed materials without an id are created, unlisted ones removed.
    async fn replace_subject(
        &self,
        subject_id: Uuid,
        name: &str,
        area_id: Uuid,
        order: i32,
        materials: &[SubjectMaterial],
    ) -> Result<Subject, StoreError>;
    async fn update_area(&self, area_id: Uuid, name: &str) -> Result<(), StoreError>;
    async fn check_subject_permissions(&self, subject_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn check_area_permissions(&self, area_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn check_curriculum_permission(&self, curriculum_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn check_material_permission(&self, material_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn update_curriculum(
        &self,
        curriculum_id: Uuid,
        update: &CurriculumUpdate,
    ) -> Result<Option<Curriculum>, StoreError>;
    async fn update_subject(&self, subject_id: Uuid, update: &SubjectUpdate) -> Result<Option<Subject>, StoreError>;
    async fn delete_material(&self, material_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError>;
}

/// Readiness check against the backing database.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

//! `CurriculumStore` over PostgreSQL and the nesting of flat rows into a curriculum tree.

use super::{exists, PgStore};
use crate::domain::*;
use crate::store::{CurriculumStore, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct CurriculumRow {
    id: Uuid,
    name: String,
    description: String,
}

/// Assemble a curriculum tree from flat rows. Areas are sorted by name; subjects and
/// materials by order, then name, then id. Rows whose parent is missing are dropped.
pub fn nest_curriculum(
    id: Uuid,
    name: String,
    description: String,
    mut areas: Vec<Area>,
    mut subjects: Vec<Subject>,
    mut materials: Vec<Material>,
) -> Curriculum {
    materials.sort_by(|a, b| (a.order, &a.name, a.id).cmp(&(b.order, &b.name, b.id)));
    subjects.sort_by(|a, b| (a.order, &a.name, a.id).cmp(&(b.order, &b.name, b.id)));
    areas.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));

    let mut by_subject: HashMap<Uuid, Vec<Material>> = HashMap::new();
    for material in materials {
        by_subject.entry(material.subject_id).or_default().push(material);
    }
    let mut by_area: HashMap<Uuid, Vec<Subject>> = HashMap::new();
    for mut subject in subjects {
        subject.materials = by_subject.remove(&subject.id).unwrap_or_default();
        by_area.entry(subject.area_id).or_default().push(subject);
    }
    for area in areas.iter_mut() {
        area.subjects = by_area.remove(&area.id).unwrap_or_default();
    }
    Curriculum {
        id,
        name,
        description,
        areas,
    }
}

impl PgStore {
    /// Full curriculum tree. Missing curriculum rows yield an empty curriculum.
    pub(super) async fn load_curriculum(&self, curriculum_id: Uuid) -> Result<Curriculum, StoreError> {
        let row = sqlx::query_as::<_, CurriculumRow>("SELECT id, name, description FROM curriculums WHERE id = $1")
            .bind(curriculum_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(Curriculum::default());
        };
        let areas = sqlx::query_as::<_, Area>(
            "SELECT id, curriculum_id, name, description FROM areas WHERE curriculum_id = $1",
        )
        .bind(curriculum_id)
        .fetch_all(&self.pool)
        .await?;
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT s.id, s.area_id, s.name, s.sort_order, s.description
            FROM subjects s
            JOIN areas a ON a.id = s.area_id
            WHERE a.curriculum_id = $1
            "#,
        )
        .bind(curriculum_id)
        .fetch_all(&self.pool)
        .await?;
        let materials = sqlx::query_as::<_, Material>(
            r#"
            SELECT m.id, m.subject_id, m.name, m.sort_order, m.description
            FROM materials m
            JOIN subjects s ON s.id = m.subject_id
            JOIN areas a ON a.id = s.area_id
            WHERE a.curriculum_id = $1
            "#,
        )
        .bind(curriculum_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nest_curriculum(row.id, row.name, row.description, areas, subjects, materials))
    }
}

const SUBJECT_COLUMNS: &str = "id, area_id, name, sort_order, description";
const MATERIAL_COLUMNS: &str = "id, subject_id, name, sort_order, description";

#[async_trait]
impl CurriculumStore for PgStore {
    async fn get_area(&self, area_id: Uuid) -> Result<Option<Area>, StoreError> {
        let area = sqlx::query_as::<_, Area>("SELECT id, curriculum_id, name, description FROM areas WHERE id = $1")
            .bind(area_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(area)
    }

    async fn get_area_subjects(&self, area_id: Uuid) -> Result<Vec<Subject>, StoreError> {
        let subjects = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {} FROM subjects WHERE area_id = $1 ORDER BY sort_order, name, id",
            SUBJECT_COLUMNS
        ))
        .bind(area_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    async fn get_subject_materials(&self, subject_id: Uuid) -> Result<Vec<Material>, StoreError> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE subject_id = $1 ORDER BY sort_order, name, id",
            MATERIAL_COLUMNS
        ))
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    async fn get_material(&self, material_id: Uuid) -> Result<Option<Material>, StoreError> {
        let material = sqlx::query_as::<_, Material>(&format!("SELECT {} FROM materials WHERE id = $1", MATERIAL_COLUMNS))
            .bind(material_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(material)
    }

    async fn new_area(&self, curriculum_id: Uuid, name: &str, description: &str) -> Result<Area, StoreError> {
        let area = sqlx::query_as::<_, Area>(
            r#"
            INSERT INTO areas (id, curriculum_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, curriculum_id, name, description
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(curriculum_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(area)
    }

    async fn new_subject(
        &self,
        area_id: Uuid,
        name: &str,
        materials: &[SubjectMaterial],
        description: &str,
    ) -> Result<Subject, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut subject = sqlx::query_as::<_, Subject>(&format!(
            r#"
            INSERT INTO subjects (id, area_id, name, sort_order, description)
            VALUES ($1, $2, $3, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM subjects WHERE area_id = $2), $4)
            RETURNING {}
            "#,
            SUBJECT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(area_id)
        .bind(name)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;
        for material in materials {
            let inserted = sqlx::query_as::<_, Material>(&format!(
                r#"
                INSERT INTO materials (id, subject_id, name, sort_order, description)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                MATERIAL_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(subject.id)
            .bind(&material.name)
            .bind(material.order)
            .bind(&material.description)
            .fetch_one(&mut *tx)
            .await?;
            subject.materials.push(inserted);
        }
        tx.commit().await?;
        Ok(subject)
    }

    async fn new_material(&self, subject_id: Uuid, name: &str, description: &str) -> Result<Material, StoreError> {
        let material = sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO materials (id, subject_id, name, sort_order, description)
            VALUES ($1, $2, $3, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM materials WHERE subject_id = $2), $4)
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(subject_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(material)
    }

    async fn get_subject(&self, subject_id: Uuid) -> Result<Option<Subject>, StoreError> {
        let subject = sqlx::query_as::<_, Subject>(&format!("SELECT {} FROM subjects WHERE id = $1", SUBJECT_COLUMNS))
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await?;
        match subject {
            Some(mut subject) => {
                subject.materials = self.get_subject_materials(subject_id).await?;
                Ok(Some(subject))
            }
            None => Ok(None),
        }
    }

    async fn update_material(&self, material_id: Uuid, update: &MaterialUpdate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE materials
            SET name = COALESCE($2, name),
                sort_order = COALESCE($3, sort_order),
                description = COALESCE($4, description),
                subject_id = COALESCE($5, subject_id)
            WHERE id = $1
            "#,
        )
        .bind(material_id)
        .bind(update.name.as_deref())
        .bind(update.order)
        .bind(update.description.as_deref())
        .bind(update.subject_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_area(&self, area_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM areas WHERE id = $1")
            .bind(area_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_subject(&self, subject_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(subject_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_subject(
        &self,
        subject_id: Uuid,
        name: &str,
        area_id: Uuid,
        order: i32,
        materials: &[SubjectMaterial],
    ) -> Result<Subject, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut subject = sqlx::query_as::<_, Subject>(&format!(
            "UPDATE subjects SET name = $2, area_id = $3, sort_order = $4 WHERE id = $1 RETURNING {}",
            SUBJECT_COLUMNS
        ))
        .bind(subject_id)
        .bind(name)
        .bind(area_id)
        .bind(order)
        .fetch_one(&mut *tx)
        .await?;

        let kept: Vec<Uuid> = materials.iter().filter_map(|m| m.id).collect();
        let current: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM materials WHERE subject_id = $1")
            .bind(subject_id)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(foreign) = kept.iter().find(|id| !current.iter().any(|(c,)| c == *id)) {
            return Err(StoreError::NotFound(format!(
                "material {} is not part of subject {}",
                foreign, subject_id
            )));
        }
        sqlx::query("DELETE FROM materials WHERE subject_id = $1 AND NOT (id = ANY($2))")
            .bind(subject_id)
            .bind(&kept)
            .execute(&mut *tx)
            .await?;

        let mut seen = HashSet::new();
        for material in materials {
            let id = match material.id {
                Some(id) if seen.insert(id) => id,
                Some(id) => {
                    return Err(StoreError::Invalid(format!("material {} listed twice", id)));
                }
                None => Uuid::new_v4(),
            };
            let saved = sqlx::query_as::<_, Material>(&format!(
                r#"
                INSERT INTO materials (id, subject_id, name, sort_order, description)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, sort_order = EXCLUDED.sort_order, description = EXCLUDED.description
                WHERE materials.subject_id = EXCLUDED.subject_id
                RETURNING {}
                "#,
                MATERIAL_COLUMNS
            ))
            .bind(id)
            .bind(subject_id)
            .bind(&material.name)
            .bind(material.order)
            .bind(&material.description)
            .fetch_one(&mut *tx)
            .await?;
            subject.materials.push(saved);
        }
        tx.commit().await?;
        subject
            .materials
            .sort_by(|a, b| (a.order, &a.name, a.id).cmp(&(b.order, &b.name, b.id)));
        Ok(subject)
    }

    async fn update_area(&self, area_id: Uuid, name: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE areas SET name = $2 WHERE id = $1")
            .bind(area_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn check_subject_permissions(&self, subject_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        exists(
            &self.pool,
            r#"
            SELECT EXISTS(
                SELECT 1 FROM subjects s
                JOIN areas a ON a.id = s.area_id
                JOIN schools sc ON sc.curriculum_id = a.curriculum_id
                JOIN user_to_schools us ON us.school_id = sc.id
                WHERE s.id = $1 AND us.user_id = $2
            )
            "#,
            subject_id,
            user_id,
        )
        .await
    }

    async fn check_area_permissions(&self, area_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        exists(
            &self.pool,
            r#"
            SELECT EXISTS(
                SELECT 1 FROM areas a
                JOIN schools sc ON sc.curriculum_id = a.curriculum_id
                JOIN user_to_schools us ON us.school_id = sc.id
                WHERE a.id = $1 AND us.user_id = $2
            )
            "#,
            area_id,
            user_id,
        )
        .await
    }

    async fn check_curriculum_permission(&self, curriculum_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        exists(
            &self.pool,
            r#"
            SELECT EXISTS(
                SELECT 1 FROM schools sc
                JOIN user_to_schools us ON us.school_id = sc.id
                WHERE sc.curriculum_id = $1 AND us.user_id = $2
            )
            "#,
            curriculum_id,
            user_id,
        )
        .await
    }

    async fn check_material_permission(&self, material_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        exists(
            &self.pool,
            r#"
            SELECT EXISTS(
                SELECT 1 FROM materials m
                JOIN subjects s ON s.id = m.subject_id
                JOIN areas a ON a.id = s.area_id
                JOIN schools sc ON sc.curriculum_id = a.curriculum_id
                JOIN user_to_schools us ON us.school_id = sc.id
                WHERE m.id = $1 AND us.user_id = $2
            )
            "#,
            material_id,
            user_id,
        )
        .await
    }

    async fn update_curriculum(
        &self,
        curriculum_id: Uuid,
        update: &CurriculumUpdate,
    ) -> Result<Option<Curriculum>, StoreError> {
        let row = sqlx::query_as::<_, CurriculumRow>(
            r#"
            UPDATE curriculums
            SET name = COALESCE($2, name), description = COALESCE($3, description)
            WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(curriculum_id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| Curriculum {
            id: row.id,
            name: row.name,
            description: row.description,
            areas: Vec::new(),
        }))
    }

    async fn update_subject(&self, subject_id: Uuid, update: &SubjectUpdate) -> Result<Option<Subject>, StoreError> {
        let subject = sqlx::query_as::<_, Subject>(&format!(
            r#"
            UPDATE subjects
            SET name = COALESCE($2, name),
                sort_order = COALESCE($3, sort_order),
                description = COALESCE($4, description),
                area_id = COALESCE($5, area_id)
            WHERE id = $1
            RETURNING {}
            "#,
            SUBJECT_COLUMNS
        ))
        .bind(subject_id)
        .bind(update.name.as_deref())
        .bind(update.order)
        .bind(update.description.as_deref())
        .bind(update.area_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subject)
    }

    async fn delete_material(&self, material_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(material_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

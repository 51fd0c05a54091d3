//! `StudentStore` over PostgreSQL. Referenced rows are checked against the student's school.

use super::{exists, PgStore};
use crate::domain::*;
use crate::storage::{image_object_key, put_then_commit};
use crate::store::{StoreError, StudentStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: Uuid,
    school_id: Uuid,
    name: String,
    custom_id: String,
    date_of_birth: Option<DateTime<Utc>>,
    date_of_entry: Option<DateTime<Utc>>,
    gender: i32,
    note: String,
    active: bool,
    profile_image_id: Option<Uuid>,
}

impl TryFrom<StudentRow> for Student {
    type Error = StoreError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(Student {
            id: row.id,
            school_id: row.school_id,
            name: row.name,
            custom_id: row.custom_id,
            date_of_birth: row.date_of_birth,
            date_of_entry: row.date_of_entry,
            gender: Gender::try_from(row.gender).map_err(StoreError::Invalid)?,
            note: row.note,
            active: row.active,
            profile_image_id: row.profile_image_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ObservationRow {
    id: Uuid,
    student_id: Uuid,
    student_name: String,
    category_id: String,
    short_desc: String,
    long_desc: String,
    created_date: DateTime<Utc>,
    event_time: DateTime<Utc>,
    creator_id: Option<Uuid>,
    creator_name: Option<String>,
    area_id: Option<Uuid>,
    area_name: Option<String>,
    visible_to_guardians: bool,
}

#[derive(sqlx::FromRow)]
struct ObservationImageRow {
    observation_id: Uuid,
    id: Uuid,
    object_key: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LessonPlanRow {
    id: Uuid,
    date: DateTime<Utc>,
    title: String,
    description: String,
    area_id: Option<Uuid>,
    area_name: Option<String>,
    user_id: Uuid,
    user_name: String,
}

fn named_ref(id: Option<Uuid>, name: Option<String>) -> Option<NamedRef> {
    id.map(|id| NamedRef {
        id,
        name: name.unwrap_or_default(),
    })
}

const OBSERVATION_SELECT: &str = r#"
    SELECT o.id, o.student_id, s.name AS student_name, o.category_id, o.short_desc, o.long_desc,
           o.created_date, o.event_time, o.creator_id, u.name AS creator_name,
           o.area_id, a.name AS area_name, o.visible_to_guardians
    FROM observations o
    JOIN students s ON s.id = o.student_id
    LEFT JOIN users u ON u.id = o.creator_id
    LEFT JOIN areas a ON a.id = o.area_id
"#;

const PROGRESS_SELECT: &str = r#"
    SELECT p.student_id, p.material_id, m.name AS material_name, sub.area_id, p.stage, p.updated_at
    FROM student_material_progresses p
    JOIN materials m ON m.id = p.material_id
    JOIN subjects sub ON sub.id = m.subject_id
"#;

/// Area ($1) belongs to the curriculum of the student's ($2) school.
const AREA_IN_SCHOOL: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM areas a
        JOIN schools sc ON sc.curriculum_id = a.curriculum_id
        JOIN students s ON s.school_id = sc.id
        WHERE a.id = $1 AND s.id = $2
    )
"#;

/// Attach images to observation rows, keeping row order.
async fn load_observations(pool: &PgPool, rows: Vec<ObservationRow>) -> Result<Vec<Observation>, StoreError> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut images: HashMap<Uuid, Vec<Image>> = HashMap::new();
    if !ids.is_empty() {
        let image_rows = sqlx::query_as::<_, ObservationImageRow>(
            r#"
            SELECT oi.observation_id, i.id, i.object_key, i.created_at
            FROM observation_to_images oi
            JOIN images i ON i.id = oi.image_id
            WHERE oi.observation_id = ANY($1)
            ORDER BY i.created_at
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;
        for row in image_rows {
            images.entry(row.observation_id).or_default().push(Image {
                id: row.id,
                object_key: row.object_key,
                created_at: row.created_at,
            });
        }
    }
    Ok(rows
        .into_iter()
        .map(|row| Observation {
            images: images.remove(&row.id).unwrap_or_default(),
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            category_id: row.category_id,
            short_desc: row.short_desc,
            long_desc: row.long_desc,
            created_date: row.created_date,
            event_time: row.event_time,
            creator: named_ref(row.creator_id, row.creator_name),
            area: named_ref(row.area_id, row.area_name),
            visible_to_guardians: row.visible_to_guardians,
        })
        .collect())
}

/// `%term%` for ILIKE with the pattern metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl StudentStore for PgStore {
    async fn insert_observation(&self, observation: NewObservation) -> Result<Observation, StoreError> {
        if let Some(area_id) = observation.area_id {
            if !exists(&self.pool, AREA_IN_SCHOOL, area_id, observation.student_id).await? {
                return Err(StoreError::NotFound(format!("area {} outside the student's school", area_id)));
            }
        }
        let mut images: Vec<Uuid> = Vec::with_capacity(observation.images.len());
        for image_id in &observation.images {
            if !images.contains(image_id) {
                images.push(*image_id);
            }
        }
        if !images.is_empty() {
            let (owned,): (i64,) = sqlx::query_as(
                r#"
                SELECT COUNT(*) FROM images i
                JOIN students s ON s.school_id = i.school_id
                WHERE s.id = $1 AND i.id = ANY($2)
                "#,
            )
            .bind(observation.student_id)
            .bind(&images)
            .fetch_one(&self.pool)
            .await?;
            if owned != images.len() as i64 {
                return Err(StoreError::NotFound("image outside the student's school".into()));
            }
        }

        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO observations
                (id, student_id, creator_id, category_id, short_desc, long_desc, created_date, event_time, area_id, visible_to_guardians)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(observation.student_id)
        .bind(observation.creator_id)
        .bind(&observation.category_id)
        .bind(&observation.short_desc)
        .bind(&observation.long_desc)
        .bind(observation.event_time)
        .bind(observation.area_id)
        .bind(observation.visible_to_guardians)
        .execute(&mut *tx)
        .await?;
        for image_id in &images {
            sqlx::query("INSERT INTO observation_to_images (observation_id, image_id) VALUES ($1, $2)")
                .bind(id)
                .bind(image_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        let row = sqlx::query_as::<_, ObservationRow>(&format!("{} WHERE o.id = $1", OBSERVATION_SELECT))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        let mut observations = load_observations(&self.pool, vec![row]).await?;
        observations
            .pop()
            .ok_or_else(|| StoreError::Invalid("inserted observation vanished".into()))
    }

    async fn get_observations(
        &self,
        student_id: Uuid,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>, StoreError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let sql = format!(
            r#"{}
            WHERE o.student_id = $1
              AND ($2::text IS NULL OR o.short_desc ILIKE $2 OR o.long_desc ILIKE $2)
              AND ($3::timestamptz IS NULL OR o.event_time >= $3)
              AND ($4::timestamptz IS NULL OR o.event_time <= $4)
            ORDER BY o.event_time DESC
            "#,
            OBSERVATION_SELECT
        );
        let rows = sqlx::query_as::<_, ObservationRow>(&sql)
            .bind(student_id)
            .bind(search)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_all(&self.pool)
            .await?;
        load_observations(&self.pool, rows).await
    }

    async fn get_progress(&self, student_id: Uuid) -> Result<Vec<MaterialProgress>, StoreError> {
        let rows = sqlx::query_as::<_, MaterialProgress>(&format!(
            "{} WHERE p.student_id = $1 ORDER BY p.updated_at DESC",
            PROGRESS_SELECT
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_progress(&self, progress: ProgressUpdate) -> Result<MaterialProgress, StoreError> {
        let written = sqlx::query(
            r#"
            INSERT INTO student_material_progresses (student_id, material_id, stage, updated_at)
            SELECT s.id, m.id, $3, $4
            FROM students s
            JOIN schools sc ON sc.id = s.school_id
            JOIN areas a ON a.curriculum_id = sc.curriculum_id
            JOIN subjects sub ON sub.area_id = a.id
            JOIN materials m ON m.subject_id = sub.id
            WHERE s.id = $1 AND m.id = $2
            ON CONFLICT (student_id, material_id)
            DO UPDATE SET stage = EXCLUDED.stage, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(progress.student_id)
        .bind(progress.material_id)
        .bind(progress.stage)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await?;
        if written.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "material {} outside the curriculum of student {}",
                progress.material_id, progress.student_id
            )));
        }
        let row = sqlx::query_as::<_, MaterialProgress>(&format!(
            "{} WHERE p.student_id = $1 AND p.material_id = $2",
            PROGRESS_SELECT
        ))
        .bind(progress.student_id)
        .bind(progress.material_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get(&self, student_id: Uuid) -> Result<Option<StudentDetails>, StoreError> {
        let row = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT id, school_id, name, custom_id, date_of_birth, date_of_entry, gender, note, active, profile_image_id
            FROM students WHERE id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        let student = match row {
            Some(row) => Student::try_from(row)?,
            None => return Ok(None),
        };

        let guardians = sqlx::query_as::<_, Guardian>(
            r#"
            SELECT g.id, g.name, g.email
            FROM guardians g
            JOIN guardian_to_students gs ON gs.guardian_id = g.id
            WHERE gs.student_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        let classes = sqlx::query_as::<_, Class>(
            r#"
            SELECT c.id, c.name
            FROM classes c
            JOIN class_to_students cs ON cs.class_id = c.id
            WHERE cs.student_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        let profile_image = match student.profile_image_id {
            Some(image_id) => {
                sqlx::query_as::<_, Image>("SELECT id, object_key, created_at FROM images WHERE id = $1")
                    .bind(image_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        Ok(Some(StudentDetails {
            student,
            guardians,
            classes,
            profile_image,
        }))
    }

    async fn update_student(&self, student: &Student) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE students
            SET name = $2, custom_id = $3, date_of_birth = $4, date_of_entry = $5,
                gender = $6, note = $7, active = $8, profile_image_id = $9
            WHERE id = $1
            "#,
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(&student.custom_id)
        .bind(student.date_of_birth)
        .bind(student.date_of_entry)
        .bind(i32::from(student.gender))
        .bind(&student.note)
        .bind(student.active)
        .bind(student.profile_image_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_student(&self, student_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn check_permissions(&self, student_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        exists(
            &self.pool,
            r#"
            SELECT EXISTS(
                SELECT 1 FROM students s
                JOIN user_to_schools us ON us.school_id = s.school_id
                WHERE s.id = $1 AND us.user_id = $2
            )
            "#,
            student_id,
            user_id,
        )
        .await
    }

    async fn insert_attendance(
        &self,
        student_id: Uuid,
        class_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Attendance, StoreError> {
        let attendance = sqlx::query_as::<_, Attendance>(
            r#"
            INSERT INTO attendances (id, student_id, class_id, date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, student_id, class_id, date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(class_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(attendance)
    }

    async fn get_attendance(&self, student_id: Uuid) -> Result<Vec<Attendance>, StoreError> {
        let rows = sqlx::query_as::<_, Attendance>(
            "SELECT id, student_id, class_id, date FROM attendances WHERE student_id = $1 ORDER BY date DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_guardian_relation(
        &self,
        student_id: Uuid,
        guardian_id: Uuid,
        relationship: GuardianRelationship,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO guardian_to_students (student_id, guardian_id, relationship) VALUES ($1, $2, $3)")
            .bind(student_id)
            .bind(guardian_id)
            .bind(i32::from(relationship))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_guardian_relation(&self, student_id: Uuid, guardian_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM guardian_to_students WHERE student_id = $1 AND guardian_id = $2")
            .bind(student_id)
            .bind(guardian_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_guardian_relation(
        &self,
        student_id: Uuid,
        guardian_id: Uuid,
    ) -> Result<Option<GuardianToStudent>, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT relationship FROM guardian_to_students WHERE student_id = $1 AND guardian_id = $2",
        )
        .bind(student_id)
        .bind(guardian_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(code,)| {
            Ok(GuardianToStudent {
                student_id,
                guardian_id,
                relationship: GuardianRelationship::try_from(code).map_err(StoreError::Invalid)?,
            })
        })
        .transpose()
    }

    async fn new_class_relation(&self, student_id: Uuid, class_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO class_to_students (class_id, student_id) VALUES ($1, $2)")
            .bind(class_id)
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_class_relation(&self, student_id: Uuid, class_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM class_to_students WHERE class_id = $1 AND student_id = $2")
            .bind(class_id)
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_lesson_plans(&self, student_id: Uuid, date: DateTime<Utc>) -> Result<Vec<LessonPlan>, StoreError> {
        let rows = sqlx::query_as::<_, LessonPlanRow>(
            r#"
            SELECT lp.id, lp.date, lp.title, lp.description, lp.area_id, a.name AS area_name,
                   lp.user_id, u.name AS user_name
            FROM lesson_plans lp
            JOIN lesson_plan_to_students ls ON ls.lesson_plan_id = lp.id
            JOIN users u ON u.id = lp.user_id
            LEFT JOIN areas a ON a.id = lp.area_id
            WHERE ls.student_id = $1 AND lp.date >= $2 AND lp.date < $3
            ORDER BY lp.date
            "#,
        )
        .bind(student_id)
        .bind(date)
        .bind(date + Duration::days(1))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| LessonPlan {
                id: row.id,
                date: row.date,
                title: row.title,
                description: row.description,
                area: named_ref(row.area_id, row.area_name),
                user: NamedRef {
                    id: row.user_id,
                    name: row.user_name,
                },
            })
            .collect())
    }

    async fn create_image(&self, student_id: Uuid, upload: ImageUpload) -> Result<Image, StoreError> {
        let school: Option<(Uuid,)> = sqlx::query_as("SELECT school_id FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        let (school_id,) = school.ok_or_else(|| StoreError::Invalid(format!("student {} not found", student_id)))?;

        let id = Uuid::new_v4();
        let object_key = image_object_key(school_id, id, upload.file_name.as_deref());

        // Rows go in first; the upload happens before commit and is removed if the commit fails.
        let mut tx = self.pool.begin().await?;
        let image = sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (id, school_id, object_key, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, object_key, created_at
            "#,
        )
        .bind(id)
        .bind(school_id)
        .bind(&object_key)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO image_to_students (image_id, student_id) VALUES ($1, $2)")
            .bind(id)
            .bind(student_id)
            .execute(&mut *tx)
            .await?;
        put_then_commit(
            self.storage.as_ref(),
            &object_key,
            upload.data,
            upload.content_type.as_deref(),
            async move { tx.commit().await.map_err(StoreError::from) },
        )
        .await?;
        Ok(image)
    }

    async fn find_student_images(&self, student_id: Uuid) -> Result<Vec<Image>, StoreError> {
        let rows = sqlx::query_as::<_, Image>(
            r#"
            SELECT i.id, i.object_key, i.created_at
            FROM images i
            JOIN image_to_students its ON its.image_id = i.id
            WHERE its.student_id = $1
            ORDER BY i.created_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_student_videos(&self, student_id: Uuid) -> Result<Vec<Video>, StoreError> {
        let rows = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, playback_url, thumbnail_url, status, created_at
            FROM videos WHERE student_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_curriculum(&self, student_id: Uuid) -> Result<Curriculum, StoreError> {
        let curriculum_id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT sc.curriculum_id
            FROM students s
            JOIN schools sc ON sc.id = s.school_id
            WHERE s.id = $1 AND sc.curriculum_id IS NOT NULL
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        match curriculum_id {
            Some((id,)) => self.load_curriculum(id).await,
            None => Ok(Curriculum::default()),
        }
    }
}

//! Table DDL and database bootstrap. Every statement is idempotent so startup can run it unconditionally.

use crate::store::StoreError;
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Tables in dependency order; foreign keys only point to earlier entries.
const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL DEFAULT ''
        "#,
    ),
    (
        "sessions",
        r#"
        token TEXT PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE
        "#,
    ),
    (
        "curriculums",
        r#"
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
        "#,
    ),
    (
        "schools",
        r#"
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        curriculum_id UUID REFERENCES curriculums (id) ON DELETE SET NULL
        "#,
    ),
    (
        "user_to_schools",
        r#"
        school_id UUID NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        PRIMARY KEY (school_id, user_id)
        "#,
    ),
    (
        "areas",
        r#"
        id UUID PRIMARY KEY,
        curriculum_id UUID NOT NULL REFERENCES curriculums (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
        "#,
    ),
    (
        "subjects",
        r#"
        id UUID PRIMARY KEY,
        area_id UUID NOT NULL REFERENCES areas (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT ''
        "#,
    ),
    (
        "materials",
        r#"
        id UUID PRIMARY KEY,
        subject_id UUID NOT NULL REFERENCES subjects (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT ''
        "#,
    ),
    (
        "images",
        r#"
        id UUID PRIMARY KEY,
        school_id UUID NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
        object_key TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "students",
        r#"
        id UUID PRIMARY KEY,
        school_id UUID NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        custom_id TEXT NOT NULL DEFAULT '',
        date_of_birth TIMESTAMPTZ,
        date_of_entry TIMESTAMPTZ,
        gender INTEGER NOT NULL DEFAULT 0,
        note TEXT NOT NULL DEFAULT '',
        active BOOLEAN NOT NULL DEFAULT TRUE,
        profile_image_id UUID REFERENCES images (id) ON DELETE SET NULL
        "#,
    ),
    (
        "image_to_students",
        r#"
        image_id UUID NOT NULL REFERENCES images (id) ON DELETE CASCADE,
        student_id UUID NOT NULL REFERENCES students (id) ON DELETE CASCADE,
        PRIMARY KEY (image_id, student_id)
        "#,
    ),
    (
        "videos",
        r#"
        id UUID PRIMARY KEY,
        school_id UUID NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
        student_id UUID REFERENCES students (id) ON DELETE CASCADE,
        playback_url TEXT NOT NULL DEFAULT '',
        thumbnail_url TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'waiting',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "guardians",
        r#"
        id UUID PRIMARY KEY,
        school_id UUID NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        email TEXT NOT NULL DEFAULT ''
        "#,
    ),
    (
        "guardian_to_students",
        r#"
        student_id UUID NOT NULL REFERENCES students (id) ON DELETE CASCADE,
        guardian_id UUID NOT NULL REFERENCES guardians (id) ON DELETE CASCADE,
        relationship INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (student_id, guardian_id)
        "#,
    ),
    (
        "classes",
        r#"
        id UUID PRIMARY KEY,
        school_id UUID NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
        name TEXT NOT NULL
        "#,
    ),
    (
        "class_to_students",
        r#"
        class_id UUID NOT NULL REFERENCES classes (id) ON DELETE CASCADE,
        student_id UUID NOT NULL REFERENCES students (id) ON DELETE CASCADE,
        PRIMARY KEY (class_id, student_id)
        "#,
    ),
    (
        "attendances",
        r#"
        id UUID PRIMARY KEY,
        student_id UUID NOT NULL REFERENCES students (id) ON DELETE CASCADE,
        class_id UUID NOT NULL REFERENCES classes (id) ON DELETE CASCADE,
        date TIMESTAMPTZ NOT NULL
        "#,
    ),
    (
        "observations",
        r#"
        id UUID PRIMARY KEY,
        student_id UUID NOT NULL REFERENCES students (id) ON DELETE CASCADE,
        creator_id UUID REFERENCES users (id) ON DELETE SET NULL,
        category_id TEXT NOT NULL DEFAULT '',
        short_desc TEXT NOT NULL DEFAULT '',
        long_desc TEXT NOT NULL DEFAULT '',
        created_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        event_time TIMESTAMPTZ NOT NULL,
        area_id UUID REFERENCES areas (id) ON DELETE SET NULL,
        visible_to_guardians BOOLEAN NOT NULL DEFAULT FALSE
        "#,
    ),
    (
        "observation_to_images",
        r#"
        observation_id UUID NOT NULL REFERENCES observations (id) ON DELETE CASCADE,
        image_id UUID NOT NULL REFERENCES images (id) ON DELETE CASCADE,
        PRIMARY KEY (observation_id, image_id)
        "#,
    ),
    (
        "lesson_plans",
        r#"
        id UUID PRIMARY KEY,
        school_id UUID NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        area_id UUID REFERENCES areas (id) ON DELETE SET NULL,
        date TIMESTAMPTZ NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
        "#,
    ),
    (
        "lesson_plan_to_students",
        r#"
        lesson_plan_id UUID NOT NULL REFERENCES lesson_plans (id) ON DELETE CASCADE,
        student_id UUID NOT NULL REFERENCES students (id) ON DELETE CASCADE,
        PRIMARY KEY (lesson_plan_id, student_id)
        "#,
    ),
    (
        "student_material_progresses",
        r#"
        student_id UUID NOT NULL REFERENCES students (id) ON DELETE CASCADE,
        material_id UUID NOT NULL REFERENCES materials (id) ON DELETE CASCADE,
        stage INTEGER NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (student_id, material_id)
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS observations_student_event_idx ON observations (student_id, event_time DESC)",
    "CREATE INDEX IF NOT EXISTS attendances_student_idx ON attendances (student_id)",
    "CREATE INDEX IF NOT EXISTS lesson_plans_date_idx ON lesson_plans (date)",
    "CREATE INDEX IF NOT EXISTS videos_student_idx ON videos (student_id)",
];

/// Create every table and index if missing.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), StoreError> {
    for (table, columns) in TABLES {
        let ddl = format!("CREATE TABLE IF NOT EXISTS {} ({})", table, columns);
        sqlx::query(&ddl).execute(pool).await?;
    }
    for index in INDEXES {
        sqlx::query(index).execute(pool).await?;
    }
    tracing::info!("schema ready ({} tables)", TABLES.len());
    Ok(())
}

/// Create the database named in `database_url` when the server does not have it yet.
/// Runs against the `postgres` maintenance database, before the main pool is built.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (maintenance, target) = maintenance_options(database_url)?;
    let Some(target) = target.filter(|name| name != "postgres") else {
        return Ok(());
    };
    let mut conn = maintenance.connect().await?;
    let (present,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&target)
        .fetch_one(&mut conn)
        .await?;
    if !present {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&target)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %target, "created database");
    }
    Ok(())
}

/// Options for the `postgres` database on the same server, and the target database name if the URL has one.
fn maintenance_options(database_url: &str) -> Result<(PgConnectOptions, Option<String>), StoreError> {
    let options = PgConnectOptions::from_str(database_url)?;
    let target = options
        .get_database()
        .map(str::to_string)
        .filter(|name| !name.is_empty());
    Ok((options.database("postgres"), target))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_options_point_at_postgres() {
        let (maintenance, target) =
            maintenance_options("postgres://u:p@localhost:5432/vor?sslmode=disable").unwrap();
        assert_eq!(target.as_deref(), Some("vor"));
        assert_eq!(maintenance.get_database(), Some("postgres"));
        assert_eq!(maintenance.get_host(), "localhost");
        assert_eq!(maintenance.get_port(), 5432);
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn tables_only_reference_earlier_tables() {
        for (i, (table, columns)) in TABLES.iter().enumerate() {
            for (other, _) in &TABLES[i + 1..] {
                assert!(
                    !columns.contains(&format!("REFERENCES {} ", other)),
                    "{} references later table {}",
                    table,
                    other
                );
            }
        }
    }
}

//! sqlx/PostgreSQL implementation of every store port.

mod curriculum;
mod student;

use crate::domain::Session;
use crate::storage::ObjectStorage;
use crate::store::{HealthCheck, SessionStore, StoreError};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

pub use curriculum::nest_curriculum;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    storage: Arc<dyn ObjectStorage>,
}

impl PgStore {
    pub fn new(pool: PgPool, storage: Arc<dyn ObjectStorage>) -> Self {
        PgStore { pool, storage }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>("SELECT token, user_id FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Run one `EXISTS(...)` query bound to (resource id, owner id), e.g. the calling user or a student.
async fn exists(pool: &PgPool, sql: &str, resource_id: uuid::Uuid, user_id: uuid::Uuid) -> Result<bool, StoreError> {
    let (allowed,): (bool,) = sqlx::query_as(sql)
        .bind(resource_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(allowed)
}

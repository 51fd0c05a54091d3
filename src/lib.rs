//! Vor API: REST backend for student records, curricula, observations and progress tracking.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod extractors;
pub mod frontend;
pub mod handlers;
pub mod imgproxy;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;
pub mod store;

pub use config::ServerConfig;
pub use error::{AppError, ConfigError};
pub use imgproxy::ImgProxy;
pub use routes::{api_routes, app, common_routes};
pub use state::AppState;
pub use storage::{ObjectStorage, S3Storage, StorageError};
pub use store::{
    ensure_database_exists, ensure_tables, CurriculumStore, HealthCheck, PgStore, SessionStore, StoreError,
    StudentStore,
};

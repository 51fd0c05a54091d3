//! Shared application state for all routes. Store ports are trait objects so tests can swap in memory stores.

use crate::imgproxy::ImgProxy;
use crate::store::{CurriculumStore, HealthCheck, SessionStore, StudentStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub students: Arc<dyn StudentStore>,
    pub curriculum: Arc<dyn CurriculumStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub health: Arc<dyn HealthCheck>,
    pub imgproxy: Arc<ImgProxy>,
    /// Request body cap for image uploads.
    pub upload_limit: usize,
}

impl AppState {
    /// State backed by one store implementing every port, e.g. `PgStore`.
    pub fn from_store<S>(store: S, imgproxy: ImgProxy, upload_limit: usize) -> Self
    where
        S: StudentStore + CurriculumStore + SessionStore + HealthCheck + 'static,
    {
        let store = Arc::new(store);
        AppState {
            students: store.clone(),
            curriculum: store.clone(),
            sessions: store.clone(),
            health: store,
            imgproxy: Arc::new(imgproxy),
            upload_limit,
        }
    }
}

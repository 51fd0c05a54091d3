//! Router assembly.

pub mod common;
pub mod curriculum;
pub mod student;

pub use common::common_routes;
pub use curriculum::curriculum_routes;
pub use student::student_routes;

use crate::auth::require_session;
use crate::frontend::frontend_router;
use crate::state::AppState;
use axum::{middleware, Router};
use std::path::PathBuf;
use tower_http::trace::TraceLayer;

pub const API_PREFIX: &str = "/api/v1";

/// Session-protected API routes, before state is attached.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/students", student_routes(state))
        .nest("/curriculums", curriculum_routes(state))
        .layer(middleware::from_fn_with_state(state.clone(), require_session))
}

/// Full application: common routes, the API under `/api/v1`, and the frontend bundle as fallback when configured.
pub fn app(state: AppState, frontend_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .merge(common_routes())
        .nest(API_PREFIX, api_routes(&state));
    let router = match frontend_dir {
        Some(dir) => router.fallback_service(frontend_router(state.clone(), dir)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

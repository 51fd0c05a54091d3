//! Routes under `/api/v1/curriculums`, all behind the curriculum gate.

use crate::auth::authorize_curriculum;
use crate::handlers::curriculum::*;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

pub fn curriculum_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/:curriculumId", patch(patch_curriculum))
        .route("/:curriculumId/areas", post(post_area))
        .route("/areas/:areaId", get(get_area).patch(patch_area).delete(delete_area))
        .route("/areas/:areaId/subjects", get(get_area_subjects).post(post_subject))
        .route(
            "/subjects/:subjectId",
            get(get_subject)
                .put(put_subject)
                .patch(patch_subject)
                .delete(delete_subject),
        )
        .route(
            "/subjects/:subjectId/materials",
            get(get_subject_materials).post(post_material),
        )
        .route(
            "/materials/:materialId",
            get(get_material).patch(patch_material).delete(delete_material),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize_curriculum))
}

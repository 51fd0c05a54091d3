//! Routes under `/api/v1/students`, all behind the student gate.

use crate::auth::authorize_student;
use crate::handlers::{attendance, media, observation, plan, progress, relation, student};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

pub fn student_routes(state: &AppState) -> Router<AppState> {
    let uploads = Router::new()
        .route("/:studentId/images", get(media::get_images).post(media::post_image))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.upload_limit));

    Router::new()
        .route(
            "/:studentId",
            get(student::get_student)
                .patch(student::patch_student)
                .delete(student::delete_student),
        )
        .route(
            "/:studentId/observations",
            get(observation::get_observations).post(observation::post_observation),
        )
        .route(
            "/:studentId/attendances",
            get(attendance::get_attendance).post(attendance::post_attendance),
        )
        .route(
            "/:studentId/guardianRelations",
            axum::routing::post(relation::post_guardian_relation),
        )
        .route(
            "/:studentId/guardianRelations/:guardianId",
            delete(relation::delete_guardian_relation),
        )
        .route(
            "/:studentId/classes",
            axum::routing::post(relation::post_class_relation).delete(relation::delete_class_relation),
        )
        .route("/:studentId/plans", get(plan::get_plans))
        .route("/:studentId/videos", get(media::get_videos))
        .route("/:studentId/materialsProgress", get(progress::get_progress))
        .route(
            "/:studentId/materialsProgress/:materialId",
            patch(progress::patch_progress),
        )
        .route("/:studentId/materialsProgress/export/pdf", get(progress::export_pdf))
        .route("/:studentId/materialsProgress/export/csv", get(progress::export_csv))
        .merge(uploads)
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize_student))
}

pub mod admin;
pub mod exam;
pub mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};

use crate::middleware::auth::require_admin;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let exam_api = Router::new()
        .route("/api/exam/verify", post(exam::verify))
        .route("/api/exam/start", post(exam::start))
        .route("/api/exam/:exam_id/violations", post(exam::report_violation))
        .route("/api/exam/:exam_id/modules/:module", post(exam::save_module_score))
        .route("/api/exam/:exam_id/complete", post(exam::complete_exam))
        .route("/api/exam/:exam_id/results", get(exam::get_results));

    let admin_api = Router::new()
        .route(
            "/api/admin/candidates",
            get(admin::list_candidates).post(admin::create_candidate),
        )
        .route(
            "/api/admin/candidates/:id",
            get(admin::get_candidate)
                .patch(admin::update_candidate)
                .delete(admin::delete_candidate),
        )
        .route(
            "/api/admin/candidates/:id/modules/:module/reset",
            post(admin::reset_module),
        )
        .route(
            "/api/admin/candidates/:id/modules/:module/score",
            put(admin::update_score),
        )
        .route("/api/admin/candidates/:id/scores", patch(admin::update_all_scores))
        .route("/api/admin/candidates/:id/publish", post(admin::publish_results))
        .route(
            "/api/admin/candidates/:id/answers/:module",
            get(admin::get_answer_sheet),
        )
        .route("/api/admin/exams/:exam_id/reset", post(admin::reset_exam))
        .route("/api/admin/statistics", get(admin::get_statistics))
        .layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health::health))
        .merge(exam_api)
        .merge(admin_api)
        .with_state(state)
}

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::exam_dto::{
    ReportViolationRequest, SaveModuleScoreRequest, StartExamRequest, VerifyExamRequest,
};
use crate::error::Result;
use crate::models::exam_module::ExamModule;
use crate::services::score_service::BulkCompletion;
use crate::AppState;

/// First hop of `x-forwarded-for`, else `x-real-ip`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyExamRequest>,
) -> Result<Response> {
    payload.validate()?;
    let result = state.session_service.verify(&payload.exam_id).await?;
    Ok(Json(result).into_response())
}

#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartExamRequest>,
) -> Result<Response> {
    payload.validate()?;
    let session = state
        .session_service
        .start(&payload.exam_id, client_ip(&headers), payload.fingerprint)
        .await?;
    Ok(Json(session).into_response())
}

#[axum::debug_handler]
pub async fn report_violation(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Json(payload): Json<ReportViolationRequest>,
) -> Result<Response> {
    let outcome = state
        .violation_service
        .report(&exam_id, payload.violation_type)
        .await?;
    Ok(Json(outcome).into_response())
}

#[axum::debug_handler]
pub async fn save_module_score(
    State(state): State<AppState>,
    Path((exam_id, module)): Path<(String, String)>,
    Json(payload): Json<SaveModuleScoreRequest>,
) -> Result<Response> {
    payload.validate()?;
    let module: ExamModule = module.parse()?;
    let result = state
        .score_service
        .save(&exam_id, module, payload.into())
        .await?;
    Ok(Json(result).into_response())
}

#[axum::debug_handler]
pub async fn complete_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Json(payload): Json<BulkCompletion>,
) -> Result<Response> {
    let result = state.score_service.complete_exam(&exam_id, payload).await?;
    Ok(Json(result).into_response())
}

#[axum::debug_handler]
pub async fn get_results(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Response> {
    let results = state.session_service.get_results(&exam_id).await?;
    Ok(Json(results).into_response())
}

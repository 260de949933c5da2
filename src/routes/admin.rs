use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::admin_dto::{
    CreateCandidateRequest, CreateCandidateResponse, ListCandidatesQuery, PublishResultsRequest,
    UpdateAllScoresRequest, UpdateCandidateRequest, UpdateScoreRequest,
};
use crate::error::Result;
use crate::models::exam_module::ExamModule;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCandidateRequest>,
) -> Result<Response> {
    payload.validate()?;
    let created = state.candidate_service.create(payload.into()).await?;
    let response = CreateCandidateResponse {
        login: created.account.login,
        password: created.account.password,
        candidate: created.candidate,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<ListCandidatesQuery>,
) -> Result<Response> {
    let candidates = state.candidate_service.list(&query.into()).await?;
    Ok(Json(candidates).into_response())
}

#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let candidate = state.candidate_service.get(id).await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn update_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCandidateRequest>,
) -> Result<Response> {
    payload.validate()?;
    let candidate = state.candidate_service.update(id, payload.into()).await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    state.candidate_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn reset_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Response> {
    let candidate = state.correction_service.reset_exam(&exam_id).await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn reset_module(
    State(state): State<AppState>,
    Path((id, module)): Path<(Uuid, String)>,
) -> Result<Response> {
    let module: ExamModule = module.parse()?;
    let candidate = state.correction_service.reset_module(id, module).await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn update_score(
    State(state): State<AppState>,
    Path((id, module)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateScoreRequest>,
) -> Result<Response> {
    let module: ExamModule = module.parse()?;
    let candidate = state
        .correction_service
        .update_score(id, module, payload.band)
        .await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn update_all_scores(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAllScoresRequest>,
) -> Result<Response> {
    payload.validate()?;
    let candidate = state
        .correction_service
        .update_all_scores(id, payload.into())
        .await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn publish_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PublishResultsRequest>,
) -> Result<Response> {
    let candidate = state.correction_service.publish(id, payload.publish).await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn get_answer_sheet(
    State(state): State<AppState>,
    Path((id, module)): Path<(Uuid, String)>,
) -> Result<Response> {
    let module: ExamModule = module.parse()?;
    let sheet = state.candidate_service.get_answer_sheet(id, module).await?;
    Ok(Json(sheet).into_response())
}

#[axum::debug_handler]
pub async fn get_statistics(State(state): State<AppState>) -> Result<Response> {
    let stats = state.candidate_service.get_statistics().await?;
    Ok(Json(stats).into_response())
}

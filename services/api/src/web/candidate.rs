//! services/api/src/web/candidate.rs
//!
//! Token-gated endpoints for invited candidates. There are no identity headers
//! here; the invitation token in the path is the credential.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::error::ApiError;
use crate::web::answers::{read_answer, submit_answer};
use crate::web::dto::{
    CandidateStartPayload, CandidateStartResponse, CandidateSubmitResponse,
    QuestionPromptResponse,
};
use crate::web::state::AppState;

/// Redeem an invitation and start the interview.
#[utoipa::path(
    post,
    path = "/candidate/{token}/start",
    request_body = CandidateStartPayload,
    params(("token" = String, Path, description = "Invitation token from the candidate link.")),
    responses(
        (status = 201, description = "Interview started", body = CandidateStartResponse),
        (status = 400, description = "Missing or malformed email"),
        (status = 403, description = "Email does not match the invitation"),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Link already used or interview closed")
    ),
    tag = "Candidate"
)]
pub async fn start_interview_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<CandidateStartPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let redeemed = state.platform.candidate_start(&token, &payload.email).await?;
    info!("Candidate session {} opened.", redeemed.session.id);
    Ok((
        StatusCode::CREATED,
        Json(CandidateStartResponse::from(redeemed)),
    ))
}

/// The next unanswered question of the candidate's session.
#[utoipa::path(
    get,
    path = "/candidate/{token}/next-question",
    params(("token" = String, Path, description = "Invitation token from the candidate link.")),
    responses(
        (status = 200, description = "Next question", body = QuestionPromptResponse),
        (status = 404, description = "Unknown or unredeemed token"),
        (status = 409, description = "Every question has been answered")
    ),
    tag = "Candidate"
)]
pub async fn next_question_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<QuestionPromptResponse>, ApiError> {
    let prompt = state.platform.candidate_next_question(&token).await?;
    Ok(Json(prompt.into()))
}

/// Submit an answer as a transcript or an audio recording.
#[utoipa::path(
    post,
    path = "/candidate/{token}/responses",
    request_body(content_type = "multipart/form-data", description = "Parts: `order`, and `transcript` or `audio`."),
    params(("token" = String, Path, description = "Invitation token from the candidate link.")),
    responses(
        (status = 201, description = "Answer recorded", body = CandidateSubmitResponse),
        (status = 400, description = "No answer, or malformed order"),
        (status = 404, description = "Unknown or unredeemed token"),
        (status = 409, description = "Answered out of order, twice, or after completion")
    ),
    tag = "Candidate"
)]
pub async fn submit_response_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.platform.invitations.resolve_candidate(&token).await?;
    let upload = read_answer(multipart).await?;
    let receipt = submit_answer(&state, &actor, actor.id, upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CandidateSubmitResponse::from(receipt)),
    ))
}

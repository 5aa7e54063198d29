//! services/api/src/web/practice.rs
//!
//! Practice sessions of regular users against the public question bank.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use interview_core::Actor;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::answers::{read_answer, submit_answer};
use crate::web::dto::{
    PracticeSessionResponse, QuestionPromptResponse, ResultsResponse, StartPracticePayload,
    StartedSessionResponse, SubmitResponse,
};
use crate::web::state::AppState;

/// Start a practice session in a domain.
#[utoipa::path(
    post,
    path = "/user/sessions",
    request_body = StartPracticePayload,
    responses(
        (status = 201, description = "Session started", body = StartedSessionResponse),
        (status = 400, description = "The domain has no questions"),
        (status = 404, description = "Unknown domain")
    ),
    tag = "Practice"
)]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<StartPracticePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let started = state
        .platform
        .sessions
        .start_practice(&actor, payload.domain_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(StartedSessionResponse::from(started)),
    ))
}

/// The caller's practice sessions, newest first.
#[utoipa::path(
    get,
    path = "/user/sessions",
    responses((status = 200, description = "Practice sessions", body = [PracticeSessionResponse])),
    tag = "Practice"
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<PracticeSessionResponse>>, ApiError> {
    let sessions = state.platform.sessions.list_my_sessions(&actor).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/user/sessions/{id}/next-question",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Next question", body = QuestionPromptResponse),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Every question has been answered")
    ),
    tag = "Practice"
)]
pub async fn next_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuestionPromptResponse>, ApiError> {
    let prompt = state
        .platform
        .sessions
        .next_question(&actor, session_id)
        .await?;
    Ok(Json(prompt.into()))
}

/// Submit an answer as a transcript or an audio recording.
#[utoipa::path(
    post,
    path = "/user/sessions/{id}/responses",
    request_body(content_type = "multipart/form-data", description = "Parts: `order`, and `transcript` or `audio`."),
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 201, description = "Answer recorded", body = SubmitResponse),
        (status = 400, description = "No answer, or malformed order"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Answered out of order, twice, or after completion")
    ),
    tag = "Practice"
)]
pub async fn submit_response_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_answer(multipart).await?;
    let receipt = submit_answer(&state, &actor, session_id, upload).await?;
    Ok((StatusCode::CREATED, Json(SubmitResponse::from(receipt))))
}

/// Per-question feedback and the aggregate score once every answer is scored.
#[utoipa::path(
    get,
    path = "/user/sessions/{id}/results",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Results, possibly still processing", body = ResultsResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Practice"
)]
pub async fn results_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let results = state.platform.sessions.results(&actor, session_id).await?;
    Ok(Json(results.into()))
}

#[utoipa::path(
    delete,
    path = "/user/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found")
    ),
    tag = "Practice"
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .platform
        .sessions
        .delete_session(&actor, session_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

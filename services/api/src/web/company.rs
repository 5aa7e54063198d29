//! services/api/src/web/company.rs
//!
//! Company interviews: authoring, invitations, results and saved candidates.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use interview_core::{company::CreateInterview, Actor};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::web::dto::{
    CandidateResultResponse, CandidateSessionResponse, CreateInterviewPayload,
    CreatedInterviewResponse, InterviewDetailResponse, InterviewResponse,
    InterviewSummaryResponse, InvitationResponse, InvitePayload, SavedCandidateResponse,
};
use crate::web::state::AppState;

//=========================================================================================
// Interviews
//=========================================================================================

/// Create an interview and invite its first candidates.
#[utoipa::path(
    post,
    path = "/company/interviews",
    request_body = CreateInterviewPayload,
    responses(
        (status = 201, description = "Interview created, with one link per candidate", body = CreatedInterviewResponse),
        (status = 400, description = "No questions, bad quotas or malformed emails")
    ),
    tag = "Company"
)]
pub async fn create_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let questions_per_tier = payload
        .questions_per_tier
        .map(|q| q.into_quotas())
        .transpose()?;
    let created = state
        .platform
        .company
        .create(
            &actor,
            CreateInterview {
                title: payload.title,
                questions: payload.questions.into_iter().map(Into::into).collect(),
                questions_per_tier,
                candidate_emails: payload.candidate_emails,
            },
        )
        .await?;
    let body = CreatedInterviewResponse::new(created, |token| state.candidate_link(token));
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/company/interviews",
    responses((status = 200, description = "The caller's interviews", body = [InterviewSummaryResponse])),
    tag = "Company"
)]
pub async fn list_interviews_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<InterviewSummaryResponse>>, ApiError> {
    let interviews = state.platform.company.list(&actor).await?;
    Ok(Json(interviews.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/company/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 200, description = "Questions and invitations", body = InterviewDetailResponse),
        (status = 404, description = "Interview not found")
    ),
    tag = "Company"
)]
pub async fn get_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(interview_id): Path<Uuid>,
) -> Result<Json<InterviewDetailResponse>, ApiError> {
    let detail = state.platform.company.get(&actor, interview_id).await?;
    Ok(Json(InterviewDetailResponse::new(detail, |token| {
        state.candidate_link(token)
    })))
}

#[utoipa::path(
    post,
    path = "/company/interviews/{id}/invitations",
    request_body = InvitePayload,
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 201, description = "Invitations issued", body = [InvitationResponse]),
        (status = 400, description = "Malformed or duplicate emails"),
        (status = 409, description = "Already invited, or interview finished")
    ),
    tag = "Company"
)]
pub async fn invite_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(interview_id): Path<Uuid>,
    Json(payload): Json<InvitePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let invitations = state
        .platform
        .company
        .invite(&actor, interview_id, &payload.emails)
        .await?;
    let body: Vec<InvitationResponse> = invitations
        .into_iter()
        .map(|inv| {
            let link = state.candidate_link(&inv.token);
            InvitationResponse::new(inv, link)
        })
        .collect();
    Ok((StatusCode::CREATED, Json(body)))
}

/// Stop accepting candidates.
#[utoipa::path(
    post,
    path = "/company/interviews/{id}/finish",
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 200, description = "Interview finished", body = InterviewResponse),
        (status = 409, description = "Already finished")
    ),
    tag = "Company"
)]
pub async fn finish_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(interview_id): Path<Uuid>,
) -> Result<Json<InterviewResponse>, ApiError> {
    let interview = state.platform.company.finish(&actor, interview_id).await?;
    Ok(Json(interview.into()))
}

#[utoipa::path(
    delete,
    path = "/company/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 204, description = "Interview and everything under it deleted"),
        (status = 404, description = "Interview not found")
    ),
    tag = "Company"
)]
pub async fn delete_interview_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(interview_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.platform.company.delete(&actor, interview_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// One row per candidate session, re-checking outstanding evaluations first.
#[utoipa::path(
    get,
    path = "/company/interviews/{id}/results",
    params(("id" = Uuid, Path, description = "Interview id")),
    responses(
        (status = 200, description = "Candidate results", body = [CandidateResultResponse]),
        (status = 404, description = "Interview not found")
    ),
    tag = "Company"
)]
pub async fn interview_results_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(interview_id): Path<Uuid>,
) -> Result<Json<Vec<CandidateResultResponse>>, ApiError> {
    let results = state.platform.company.results(&actor, interview_id).await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Candidate Sessions
//=========================================================================================

#[utoipa::path(
    get,
    path = "/company/sessions/{id}",
    params(("id" = Uuid, Path, description = "Candidate session id")),
    responses(
        (status = 200, description = "Transcripts, feedback and scores", body = CandidateSessionResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Company"
)]
pub async fn session_detail_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CandidateSessionResponse>, ApiError> {
    let detail = state
        .platform
        .company
        .session_detail(&actor, session_id)
        .await?;
    Ok(Json(detail.into()))
}

#[utoipa::path(
    delete,
    path = "/company/sessions/{id}",
    params(("id" = Uuid, Path, description = "Candidate session id")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found")
    ),
    tag = "Company"
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

#[utoipa::path(
    post,
    path = "/company/sessions/{id}/save",
    params(("id" = Uuid, Path, description = "Candidate session id")),
    responses(
        (status = 201, description = "Candidate saved", body = SavedCandidateResponse),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Already saved")
    ),
    tag = "Company"
)]
pub async fn save_candidate_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state
        .platform
        .company
        .save_candidate(&actor, session_id)
        .await?;
    Ok((StatusCode::CREATED, Json(SavedCandidateResponse::from(saved))))
}

//=========================================================================================
// Saved Candidates
//=========================================================================================

#[utoipa::path(
    get,
    path = "/company/saved",
    responses((status = 200, description = "Saved candidates, newest first", body = [SavedCandidateResponse])),
    tag = "Company"
)]
pub async fn list_saved_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<SavedCandidateResponse>>, ApiError> {
    let saved = state.platform.company.list_saved(&actor).await?;
    Ok(Json(saved.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/company/saved/{id}",
    params(("id" = Uuid, Path, description = "Saved candidate id")),
    responses(
        (status = 204, description = "Bookmark removed"),
        (status = 404, description = "Saved candidate not found")
    ),
    tag = "Company"
)]
pub async fn remove_saved_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(saved_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.platform.company.remove_saved(&actor, saved_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

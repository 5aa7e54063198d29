//! services/api/src/web/rest.rs
//!
//! Contains the public REST endpoints and the master definition for the
//! OpenAPI specification.

use crate::error::{ErrorBody, FieldError};
use crate::web::dto::*;
use crate::web::state::AppState;
use crate::web::{admin, candidate, company, practice};
use axum::{extract::State, response::Json};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::ApiError;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_domains_handler,
        candidate::start_interview_handler,
        candidate::next_question_handler,
        candidate::submit_response_handler,
        practice::start_session_handler,
        practice::list_sessions_handler,
        practice::next_question_handler,
        practice::submit_response_handler,
        practice::results_handler,
        practice::delete_session_handler,
        company::create_interview_handler,
        company::list_interviews_handler,
        company::get_interview_handler,
        company::invite_handler,
        company::finish_interview_handler,
        company::delete_interview_handler,
        company::interview_results_handler,
        company::session_detail_handler,
        company::delete_session_handler,
        company::save_candidate_handler,
        company::list_saved_handler,
        company::remove_saved_handler,
        admin::create_domain_handler,
        admin::list_domains_handler,
        admin::update_domain_handler,
        admin::delete_domain_handler,
        admin::get_configuration_handler,
        admin::update_configuration_handler,
        admin::list_questions_handler,
        admin::create_question_handler,
        admin::update_question_handler,
        admin::delete_question_handler,
        admin::stats_handler,
        admin::activity_handler,
    ),
    components(
        schemas(
            ErrorBody, FieldError, HealthResponse,
            QuotasPayload, QuestionPayload, QuestionResponse, QuestionPromptResponse,
            DomainResponse, DomainPayload, ConfigurationResponse, StatsResponse, ActivityResponse,
            StartPracticePayload, StartedSessionResponse, PracticeSessionResponse, SubmitResponse,
            BreakdownResponse, ResultsResponse,
            CandidateStartPayload, CandidateStartResponse, CandidateSubmitResponse,
            CreateInterviewPayload, InvitePayload, InvitationResponse, InterviewResponse,
            CreatedInterviewResponse, InterviewSummaryResponse, InterviewDetailResponse,
            CandidateResultResponse, CandidateSessionResponse, SavedCandidateResponse,
        )
    ),
    tags(
        (name = "Interview Platform API", description = "Voice interview practice and candidate screening."),
        (name = "Candidate", description = "Token-gated endpoints for invited candidates."),
        (name = "Practice", description = "Practice sessions of regular users. Requires x-user-id and x-user-role."),
        (name = "Company", description = "Company interviews and candidate review. Requires x-user-id and x-user-role."),
        (name = "Admin", description = "Question bank curation and dashboard. Requires x-user-id and x-user-role.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Public Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "Interview Platform API"
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// The public catalog of practice domains.
#[utoipa::path(
    get,
    path = "/public/domains",
    responses((status = 200, description = "Practice domains", body = [DomainResponse])),
    tag = "Interview Platform API"
)]
pub async fn list_domains_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DomainResponse>>, ApiError> {
    let domains = state.platform.catalog.list_domains().await?;
    Ok(Json(domains.into_iter().map(Into::into).collect()))
}

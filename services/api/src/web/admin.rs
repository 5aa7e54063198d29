//! services/api/src/web/admin.rs
//!
//! Curation of the public question bank and the admin dashboard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use interview_core::{domain::QuestionUpdate, Actor};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::web::dto::{
    ActivityQuery, ActivityResponse, ConfigurationResponse, DomainPayload, DomainResponse,
    QuestionPayload, QuestionResponse, QuotasPayload, StatsResponse,
};
use crate::web::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: u32 = 20;

//=========================================================================================
// Domains
//=========================================================================================

#[utoipa::path(
    post,
    path = "/admin/domains",
    request_body = DomainPayload,
    responses(
        (status = 201, description = "Domain created", body = DomainResponse),
        (status = 400, description = "Missing name or bad logo URL"),
        (status = 409, description = "A domain with that name exists")
    ),
    tag = "Admin"
)]
pub async fn create_domain_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<DomainPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let domain = state
        .platform
        .catalog
        .create_domain(&actor, &payload.name, payload.logo_url.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(DomainResponse::from(domain))))
}

#[utoipa::path(
    get,
    path = "/admin/domains",
    responses((status = 200, description = "Domains with counters", body = [DomainResponse])),
    tag = "Admin"
)]
pub async fn list_domains_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DomainResponse>>, ApiError> {
    let domains = state.platform.catalog.list_domains().await?;
    Ok(Json(domains.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/admin/domains/{id}",
    request_body = DomainPayload,
    params(("id" = Uuid, Path, description = "Domain id")),
    responses(
        (status = 200, description = "Domain updated", body = DomainResponse),
        (status = 404, description = "Domain not found"),
        (status = 409, description = "A domain with that name exists")
    ),
    tag = "Admin"
)]
pub async fn update_domain_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(domain_id): Path<Uuid>,
    Json(payload): Json<DomainPayload>,
) -> Result<Json<DomainResponse>, ApiError> {
    payload.validate()?;
    let domain = state
        .platform
        .catalog
        .update_domain(&actor, domain_id, &payload.name, payload.logo_url.as_deref())
        .await?;
    Ok(Json(domain.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/domains/{id}",
    params(("id" = Uuid, Path, description = "Domain id")),
    responses(
        (status = 204, description = "Domain and its questions deleted"),
        (status = 404, description = "Domain not found"),
        (status = 409, description = "Practice sessions still reference the domain")
    ),
    tag = "Admin"
)]
pub async fn delete_domain_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(domain_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.platform.catalog.delete_domain(&actor, domain_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/admin/domains/{id}/configuration",
    params(("id" = Uuid, Path, description = "Domain id")),
    responses(
        (status = 200, description = "Questions drawn per tier", body = ConfigurationResponse),
        (status = 404, description = "Domain not found")
    ),
    tag = "Admin"
)]
pub async fn get_configuration_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(domain_id): Path<Uuid>,
) -> Result<Json<ConfigurationResponse>, ApiError> {
    let configuration = state
        .platform
        .catalog
        .get_configuration(&actor, domain_id)
        .await?;
    Ok(Json(configuration.into()))
}

#[utoipa::path(
    put,
    path = "/admin/domains/{id}/configuration",
    request_body = QuotasPayload,
    params(("id" = Uuid, Path, description = "Domain id")),
    responses(
        (status = 200, description = "Configuration saved", body = ConfigurationResponse),
        (status = 400, description = "Negative counts"),
        (status = 404, description = "Domain not found")
    ),
    tag = "Admin"
)]
pub async fn update_configuration_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(domain_id): Path<Uuid>,
    Json(payload): Json<QuotasPayload>,
) -> Result<Json<ConfigurationResponse>, ApiError> {
    let quotas = payload.into_quotas()?;
    let configuration = state
        .platform
        .catalog
        .update_configuration(&actor, domain_id, quotas)
        .await?;
    Ok(Json(configuration.into()))
}

//=========================================================================================
// Questions
//=========================================================================================

#[utoipa::path(
    get,
    path = "/admin/domains/{id}/questions",
    params(("id" = Uuid, Path, description = "Domain id")),
    responses(
        (status = 200, description = "The domain's questions", body = [QuestionResponse]),
        (status = 404, description = "Domain not found")
    ),
    tag = "Admin"
)]
pub async fn list_questions_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(domain_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let questions = state
        .platform
        .catalog
        .list_questions(&actor, domain_id)
        .await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

/// Add a question; its narration is generated in the background.
#[utoipa::path(
    post,
    path = "/admin/domains/{id}/questions",
    request_body = QuestionPayload,
    params(("id" = Uuid, Path, description = "Domain id")),
    responses(
        (status = 201, description = "Question added", body = QuestionResponse),
        (status = 400, description = "Blank text or ideal answer"),
        (status = 404, description = "Domain not found")
    ),
    tag = "Admin"
)]
pub async fn create_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(domain_id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .platform
        .catalog
        .create_question(&actor, domain_id, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::from(question))))
}

#[utoipa::path(
    put,
    path = "/admin/questions/{id}",
    request_body = QuestionPayload,
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question updated", body = QuestionResponse),
        (status = 404, description = "Question not found")
    ),
    tag = "Admin"
)]
pub async fn update_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let update = QuestionUpdate {
        text: payload.text,
        ideal_answer: payload.ideal_answer,
        difficulty: payload.difficulty,
    };
    let question = state
        .platform
        .catalog
        .update_question(&actor, question_id, update)
        .await?;
    Ok(Json(question.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found"),
        (status = 409, description = "The question was asked in a session")
    ),
    tag = "Admin"
)]
pub async fn delete_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(question_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .platform
        .catalog
        .delete_question(&actor, question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Dashboard
//=========================================================================================

#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Platform counters", body = StatsResponse)),
    tag = "Admin"
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.platform.catalog.dashboard_stats(&actor).await?;
    Ok(Json(stats.into()))
}

#[utoipa::path(
    get,
    path = "/admin/activity",
    params(ActivityQuery),
    responses((status = 200, description = "Most recent activity first", body = [ActivityResponse])),
    tag = "Admin"
)]
pub async fn activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityResponse>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let entries = state.platform.catalog.recent_activity(&actor, limit).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

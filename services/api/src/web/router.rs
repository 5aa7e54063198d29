//! services/api/src/web/router.rs
//!
//! Assembles the HTTP surface: public, candidate and role-gated route groups,
//! plus Swagger UI and the stored audio files.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::web::middleware::{
    require_actor, require_admin, require_company, require_regular, USER_ID_HEADER,
    USER_ROLE_HEADER,
};
use crate::web::rest::{health_handler, list_domains_handler, ApiDoc};
use crate::web::state::AppState;
use crate::web::{admin, candidate, company, practice};

/// Recorded answers are uploaded through the API.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let origin = origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
        ]))
}

/// Builds the complete application router.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ConfigError> {
    let cors = cors_layer(&state.config.cors_origin)?;

    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/public/domains", get(list_domains_handler));

    // Candidate routes: the invitation token is the credential
    let candidate_routes = Router::new()
        .route(
            "/candidate/{token}/start",
            post(candidate::start_interview_handler),
        )
        .route(
            "/candidate/{token}/next-question",
            get(candidate::next_question_handler),
        )
        .route(
            "/candidate/{token}/responses",
            post(candidate::submit_response_handler),
        );

    let user_routes = Router::new()
        .route("/user/domains", get(list_domains_handler))
        .route(
            "/user/sessions",
            post(practice::start_session_handler).get(practice::list_sessions_handler),
        )
        .route(
            "/user/sessions/{id}",
            delete(practice::delete_session_handler),
        )
        .route(
            "/user/sessions/{id}/next-question",
            get(practice::next_question_handler),
        )
        .route(
            "/user/sessions/{id}/responses",
            post(practice::submit_response_handler),
        )
        .route(
            "/user/sessions/{id}/results",
            get(practice::results_handler),
        )
        .route_layer(axum_middleware::from_fn(require_regular));

    let company_routes = Router::new()
        .route(
            "/company/interviews",
            post(company::create_interview_handler).get(company::list_interviews_handler),
        )
        .route(
            "/company/interviews/{id}",
            get(company::get_interview_handler).delete(company::delete_interview_handler),
        )
        .route(
            "/company/interviews/{id}/invitations",
            post(company::invite_handler),
        )
        .route(
            "/company/interviews/{id}/finish",
            post(company::finish_interview_handler),
        )
        .route(
            "/company/interviews/{id}/results",
            get(company::interview_results_handler),
        )
        .route(
            "/company/sessions/{id}",
            get(company::session_detail_handler).delete(company::delete_session_handler),
        )
        .route(
            "/company/sessions/{id}/save",
            post(company::save_candidate_handler),
        )
        .route("/company/saved", get(company::list_saved_handler))
        .route("/company/saved/{id}", delete(company::remove_saved_handler))
        .route_layer(axum_middleware::from_fn(require_company));

    let admin_routes = Router::new()
        .route(
            "/admin/domains",
            post(admin::create_domain_handler).get(admin::list_domains_handler),
        )
        .route(
            "/admin/domains/{id}",
            put(admin::update_domain_handler).delete(admin::delete_domain_handler),
        )
        .route(
            "/admin/domains/{id}/configuration",
            get(admin::get_configuration_handler).put(admin::update_configuration_handler),
        )
        .route(
            "/admin/domains/{id}/questions",
            get(admin::list_questions_handler).post(admin::create_question_handler),
        )
        .route(
            "/admin/questions/{id}",
            put(admin::update_question_handler).delete(admin::delete_question_handler),
        )
        .route("/admin/stats", get(admin::stats_handler))
        .route("/admin/activity", get(admin::activity_handler))
        .route_layer(axum_middleware::from_fn(require_admin));

    // Identity is resolved before any role gate runs.
    let protected_routes = Router::new()
        .merge(user_routes)
        .merge(company_routes)
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn(require_actor));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(candidate_routes)
        .merge(protected_routes)
        .nest_service("/audio", ServeDir::new(&state.config.audio_storage_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}

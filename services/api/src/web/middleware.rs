//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.
//!
//! Authentication happens upstream; the gateway forwards the caller as the
//! `x-user-id` and `x-user-role` headers, which become an explicit `Actor`.

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use interview_core::{Actor, InterviewError, Role};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Builds the actor from the identity headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("{} header is required", name)))
    };

    let id = Uuid::parse_str(header(USER_ID_HEADER)?)
        .map_err(|_| ApiError::Unauthorized(format!("Invalid {} format", USER_ID_HEADER)))?;
    let role = header(USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(ApiError::Unauthorized)?;

    Ok(Actor { id, role })
}

/// Middleware that validates the identity headers and inserts the `Actor`
/// into request extensions for handlers to use.
///
/// If missing or malformed, returns 401 Unauthorized.
pub async fn require_actor(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let actor = actor_from_headers(req.headers()).map_err(|e| {
        warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        e
    })?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn gate(req: &Request, allowed: &[Role]) -> Result<(), ApiError> {
    let actor = req
        .extensions()
        .get::<Actor>()
        .ok_or_else(|| ApiError::Unauthorized("No caller identity on request".to_string()))?;
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        warn!(
            "Actor {} with role {} refused on {}",
            actor.id,
            actor.role,
            req.uri().path()
        );
        Err(InterviewError::Forbidden.into())
    }
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    gate(&req, &[Role::Admin])?;
    Ok(next.run(req).await)
}

/// Admins may inspect company data too.
pub async fn require_company(req: Request, next: Next) -> Result<Response, ApiError> {
    gate(&req, &[Role::Company, Role::Admin])?;
    Ok(next.run(req).await)
}

pub async fn require_regular(req: Request, next: Next) -> Result<Response, ApiError> {
    gate(&req, &[Role::Regular])?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, role: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(USER_ID_HEADER, HeaderValue::from_str(id).unwrap());
        map.insert(USER_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        map
    }

    #[test]
    fn well_formed_headers_become_an_actor() {
        let id = Uuid::new_v4();
        let actor = actor_from_headers(&headers(&id.to_string(), "company")).unwrap();
        assert_eq!(actor, Actor::company(id));
    }

    #[test]
    fn malformed_identity_is_unauthorized() {
        let valid_id = Uuid::new_v4().to_string();
        for (id, role) in [("not-a-uuid", "admin"), (valid_id.as_str(), "candidate")] {
            assert!(matches!(
                actor_from_headers(&headers(id, role)),
                Err(ApiError::Unauthorized(_))
            ));
        }
        assert!(matches!(
            actor_from_headers(&HeaderMap::new()),
            Err(ApiError::Unauthorized(_))
        ));
    }
}

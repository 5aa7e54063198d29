//! crates/interview_core/src/access.rs
//!
//! Ownership checks run before every read or mutation of a session, interview
//! or saved candidate. A resource owned by someone else is reported exactly like
//! a missing one.

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{CompanyInterview, SavedCandidate, Session, SessionOrigin};
use crate::error::{InterviewError, InterviewResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Regular,
    Company,
    Admin,
    /// An invited candidate; the actor id is the session opened by their link.
    Candidate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::Company => "company",
            Role::Admin => "admin",
            Role::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Candidates are never parsed from a header; they come from a redeemed token.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regular" | "user" => Ok(Role::Regular),
            "company" => Ok(Role::Company),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The caller of a core operation, threaded explicitly through every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn regular(id: Uuid) -> Self {
        Self { id, role: Role::Regular }
    }

    pub fn company(id: Uuid) -> Self {
        Self { id, role: Role::Company }
    }

    pub fn admin(id: Uuid) -> Self {
        Self { id, role: Role::Admin }
    }

    pub fn candidate(session_id: Uuid) -> Self {
        Self {
            id: session_id,
            role: Role::Candidate,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Rejects actors whose role is not one of `allowed`.
pub fn require_role(actor: &Actor, allowed: &[Role]) -> InterviewResult<()> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(InterviewError::Forbidden)
    }
}

pub fn assert_session_access(actor: &Actor, session: &Session) -> InterviewResult<()> {
    let allowed = match (&actor.role, &session.origin) {
        (Role::Admin, _) => true,
        (Role::Regular, SessionOrigin::Practice { user_id, .. }) => *user_id == actor.id,
        (Role::Company, SessionOrigin::Candidate { company_id, .. }) => *company_id == actor.id,
        (Role::Candidate, SessionOrigin::Candidate { .. }) => session.id == actor.id,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(InterviewError::NotFoundOrDenied)
    }
}

pub fn assert_interview_access(actor: &Actor, interview: &CompanyInterview) -> InterviewResult<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Company if interview.company_id == actor.id => Ok(()),
        _ => Err(InterviewError::NotFoundOrDenied),
    }
}

pub fn assert_saved_access(actor: &Actor, saved: &SavedCandidate) -> InterviewResult<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Company if saved.company_id == actor.id => Ok(()),
        _ => Err(InterviewError::NotFoundOrDenied),
    }
}

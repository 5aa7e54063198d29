//! crates/interview_core/src/domain.rs
//!
//! Defines the pure, core data structures for the interview platform.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Difficulty Tiers
//=========================================================================================

/// Difficulty level of a question, ordered from easiest (`E`) to hardest (`A`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    E,
    D,
    C,
    B,
    A,
}

impl Difficulty {
    /// All tiers in ascending difficulty order.
    pub const ASCENDING: [Difficulty; 5] = [
        Difficulty::E,
        Difficulty::D,
        Difficulty::C,
        Difficulty::B,
        Difficulty::A,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::E => "E",
            Difficulty::D => "D",
            Difficulty::C => "C",
            Difficulty::B => "B",
            Difficulty::A => "A",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "E" => Ok(Difficulty::E),
            "D" => Ok(Difficulty::D),
            "C" => Ok(Difficulty::C),
            "B" => Ok(Difficulty::B),
            "A" => Ok(Difficulty::A),
            other => Err(format!("unknown difficulty tier '{}'", other)),
        }
    }
}

/// Number of questions to draw from each difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierQuotas {
    pub e: u32,
    pub d: u32,
    pub c: u32,
    pub b: u32,
    pub a: u32,
}

impl TierQuotas {
    pub const DEFAULT_PER_TIER: u32 = 2;
    /// Upper bound on any single tier's count.
    pub const MAX_PER_TIER: u32 = 100;

    pub fn uniform(count: u32) -> Self {
        Self {
            e: count,
            d: count,
            c: count,
            b: count,
            a: count,
        }
    }

    pub fn get(&self, tier: Difficulty) -> u32 {
        match tier {
            Difficulty::E => self.e,
            Difficulty::D => self.d,
            Difficulty::C => self.c,
            Difficulty::B => self.b,
            Difficulty::A => self.a,
        }
    }

    pub fn total(&self) -> u32 {
        Difficulty::ASCENDING
            .iter()
            .fold(0u32, |sum, t| sum.saturating_add(self.get(*t)))
    }
}

impl Default for TierQuotas {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_PER_TIER)
    }
}

//=========================================================================================
// Question Bank
//=========================================================================================

/// A public practice domain (e.g. "Backend Engineering").
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A domain plus the derived counters shown in catalog listings.
#[derive(Debug, Clone)]
pub struct DomainSummary {
    pub domain: Domain,
    pub session_count: i64,
    pub question_count: i64,
}

/// Per-tier quotas used when building a practice session for a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainConfiguration {
    pub domain_id: Uuid,
    pub quotas: TierQuotas,
    pub updated_at: DateTime<Utc>,
}

/// Who a question belongs to: the public bank of a domain, or a company interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOwner {
    Domain(Uuid),
    Interview(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: Uuid,
    pub owner: QuestionOwner,
    pub text: String,
    pub ideal_answer: String,
    pub audio_url: Option<String>,
    pub difficulty: Difficulty,
    /// Company questions only: always asked, ahead of sampled ones.
    pub pinned: bool,
    /// Authoring position within the owner, 1-based.
    pub position: u32,
}

/// Question content as authored, before it is attached to an owner.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub text: String,
    pub ideal_answer: String,
    pub difficulty: Difficulty,
    pub pinned: bool,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub owner: QuestionOwner,
    pub text: String,
    pub ideal_answer: String,
    pub difficulty: Difficulty,
    pub pinned: bool,
}

#[derive(Debug, Clone)]
pub struct QuestionUpdate {
    pub text: String,
    pub ideal_answer: String,
    pub difficulty: Difficulty,
}

//=========================================================================================
// Company Interviews & Invitations
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyInterview {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub is_active: bool,
    /// `None` means every non-pinned question is asked.
    pub quotas: Option<TierQuotas>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InterviewSummary {
    pub interview: CompanyInterview,
    pub question_count: i64,
    pub invitation_count: i64,
    pub session_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewCompanyInterview {
    pub company_id: Uuid,
    pub title: String,
    pub quotas: Option<TierQuotas>,
    /// Stored with `position` following their order here.
    pub questions: Vec<QuestionDraft>,
    pub invitations: Vec<NewInvitation>,
}

/// A single-use candidate link.
#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub candidate_email: String,
    pub token: String,
    pub is_used: bool,
    pub session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// What a candidate's invitation email needs; the mailer owns the link format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationNotice {
    pub candidate_email: String,
    pub interview_title: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub candidate_email: String,
    pub token: String,
}

//=========================================================================================
// Sessions & Responses
//=========================================================================================

/// Where a session came from, and therefore who may touch it.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOrigin {
    /// A regular user's practice run against a public domain.
    Practice { user_id: Uuid, domain_id: Uuid },
    /// A candidate's run against a company interview, opened through an invitation.
    Candidate {
        company_id: Uuid,
        interview_id: Uuid,
        candidate_email: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub origin: SessionOrigin,
    pub question_count: u32,
    pub is_completed: bool,
    pub average_score: Option<f64>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn state(&self, answered: usize) -> SessionState {
        if self.is_completed {
            SessionState::Completed
        } else if answered == 0 {
            SessionState::Created
        } else {
            SessionState::InProgress
        }
    }
}

/// A session to be persisted together with its ordered question plan.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub origin: SessionOrigin,
    /// Question ids in presentation order; position `i` becomes `Order = i + 1`.
    pub question_ids: Vec<Uuid>,
}

/// One entry of a session's question plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionQuestion {
    pub session_id: Uuid,
    pub order: u32,
    pub question: Question,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeSessionSummary {
    pub session: Session,
    pub domain_name: String,
    pub logo_url: Option<String>,
    pub answered: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseState {
    AwaitingAudio,
    AwaitingEvaluation,
    Evaluated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: Uuid,
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub order: u32,
    pub audio_url: Option<String>,
    pub transcript: Option<String>,
    pub feedback: Option<String>,
    pub score: Option<u8>,
    pub submitted_at: DateTime<Utc>,
}

impl Response {
    pub fn state(&self) -> ResponseState {
        if self.score.is_some() {
            ResponseState::Evaluated
        } else {
            ResponseState::AwaitingEvaluation
        }
    }
}

/// State of a planned question, accounting for questions not yet answered.
pub fn response_state(response: Option<&Response>) -> ResponseState {
    response
        .map(Response::state)
        .unwrap_or(ResponseState::AwaitingAudio)
}

#[derive(Debug, Clone)]
pub struct NewResponse {
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub order: u32,
    pub audio_url: Option<String>,
    pub transcript: Option<String>,
}

/// Result of atomically storing a response and re-checking session completion.
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    pub response: Response,
    pub session_completed: bool,
}

/// What the candidate or user actually handed in for a question.
#[derive(Debug, Clone, Default)]
pub struct SubmittedAnswer {
    pub transcript: Option<String>,
    pub audio_url: Option<String>,
}

//=========================================================================================
// Evaluation
//=========================================================================================

/// Payload sent to the external evaluation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRequest {
    pub question_id: Uuid,
    pub question_text: String,
    pub ideal_answer: String,
    pub transcript: Option<String>,
    pub audio_url: Option<String>,
}

/// Feedback and score returned by the evaluation collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub feedback: String,
    pub score: u8,
    pub transcription: Option<String>,
}

impl Evaluation {
    /// Builds an evaluation from a raw collaborator score, clamped into 0..=100.
    pub fn from_raw(feedback: String, raw_score: f64, transcription: Option<String>) -> Self {
        let score = if raw_score.is_nan() {
            0
        } else {
            raw_score.round().clamp(0.0, 100.0) as u8
        };
        Self {
            feedback,
            score,
            transcription,
        }
    }
}

//=========================================================================================
// Saved Candidates & Activity
//=========================================================================================

/// A company's bookmark of a candidate session, with a snapshot taken at save time.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCandidate {
    pub id: Uuid,
    pub company_id: Uuid,
    pub session_id: Uuid,
    pub interview_id: Uuid,
    pub candidate_email: String,
    pub interview_title: String,
    pub average_score: Option<f64>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSavedCandidate {
    pub company_id: Uuid,
    pub session_id: Uuid,
    pub interview_id: Uuid,
    pub candidate_email: String,
    pub interview_title: String,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    DomainCreated,
    DomainUpdated,
    DomainDeleted,
    QuestionAdded,
    QuestionUpdated,
    QuestionDeleted,
    ConfigurationUpdated,
    SessionStarted,
    SessionCompleted,
    SessionDeleted,
    InterviewCreated,
    InterviewFinished,
    InterviewDeleted,
    CandidatesInvited,
    InvitationRedeemed,
    CandidateSaved,
    CandidateRemoved,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::DomainCreated => "domain_created",
            ActivityKind::DomainUpdated => "domain_updated",
            ActivityKind::DomainDeleted => "domain_deleted",
            ActivityKind::QuestionAdded => "question_added",
            ActivityKind::QuestionUpdated => "question_updated",
            ActivityKind::QuestionDeleted => "question_deleted",
            ActivityKind::ConfigurationUpdated => "configuration_updated",
            ActivityKind::SessionStarted => "session_started",
            ActivityKind::SessionCompleted => "session_completed",
            ActivityKind::SessionDeleted => "session_deleted",
            ActivityKind::InterviewCreated => "interview_created",
            ActivityKind::InterviewFinished => "interview_finished",
            ActivityKind::InterviewDeleted => "interview_deleted",
            ActivityKind::CandidatesInvited => "candidates_invited",
            ActivityKind::InvitationRedeemed => "invitation_redeemed",
            ActivityKind::CandidateSaved => "candidate_saved",
            ActivityKind::CandidateRemoved => "candidate_removed",
        }
    }
}

/// An append-only audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub kind: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Platform-wide counters for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub domains: i64,
    pub questions: i64,
    pub practice_sessions: i64,
    pub candidate_sessions: i64,
    pub company_interviews: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_order_from_easiest_to_hardest() {
        assert!(Difficulty::E < Difficulty::D);
        assert!(Difficulty::B < Difficulty::A);
        let mut shuffled = vec![Difficulty::A, Difficulty::C, Difficulty::E];
        shuffled.sort();
        assert_eq!(shuffled, vec![Difficulty::E, Difficulty::C, Difficulty::A]);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("b".parse::<Difficulty>(), Ok(Difficulty::B));
        assert!("F".parse::<Difficulty>().is_err());
    }

    #[test]
    fn default_quotas_are_two_per_tier() {
        let quotas = TierQuotas::default();
        assert_eq!(quotas.total(), 10);
        assert_eq!(quotas.get(Difficulty::A), 2);
    }

    #[test]
    fn session_state_follows_answers() {
        let mut session = Session {
            id: Uuid::new_v4(),
            origin: SessionOrigin::Practice {
                user_id: Uuid::new_v4(),
                domain_id: Uuid::new_v4(),
            },
            question_count: 2,
            is_completed: false,
            average_score: None,
            started_at: Utc::now(),
        };
        assert_eq!(session.state(0), SessionState::Created);
        assert_eq!(session.state(1), SessionState::InProgress);
        session.is_completed = true;
        assert_eq!(session.state(2), SessionState::Completed);
    }

    #[test]
    fn raw_scores_are_clamped() {
        assert_eq!(Evaluation::from_raw(String::new(), 140.0, None).score, 100);
        assert_eq!(Evaluation::from_raw(String::new(), -3.0, None).score, 0);
        assert_eq!(Evaluation::from_raw(String::new(), 79.6, None).score, 80);
    }

    #[test]
    fn unanswered_question_awaits_audio() {
        assert_eq!(response_state(None), ResponseState::AwaitingAudio);
    }
}

//! crates/interview_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    ActivityEntry, CompanyInterview, DashboardStats, Domain, DomainConfiguration, DomainSummary,
    Evaluation, EvaluationRequest, Invitation, InvitationNotice, InterviewSummary,
    NewCompanyInterview,
    NewInvitation, NewQuestion, NewResponse, NewSavedCandidate, NewSession,
    PracticeSessionSummary, Question, QuestionUpdate, RecordedResponse, Response, SavedCandidate,
    Session, SessionQuestion, TierQuotas,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness or referential constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A conditional write found its guard already taken, e.g. a used invitation.
    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),
    /// A transient collaborator failure (timeout, 5xx, connection refused).
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Domains ---
    /// Fails with `Conflict` when a domain with the same case-insensitive name exists.
    async fn create_domain(&self, name: &str, logo_url: Option<&str>) -> PortResult<Domain>;

    async fn update_domain(
        &self,
        domain_id: Uuid,
        name: &str,
        logo_url: Option<&str>,
    ) -> PortResult<Domain>;

    async fn get_domain(&self, domain_id: Uuid) -> PortResult<Domain>;

    async fn list_domains(&self) -> PortResult<Vec<DomainSummary>>;

    /// Cascades the domain's questions; fails with `Conflict` while sessions reference it.
    async fn delete_domain(&self, domain_id: Uuid) -> PortResult<()>;

    async fn get_configuration(&self, domain_id: Uuid) -> PortResult<DomainConfiguration>;

    async fn upsert_configuration(
        &self,
        domain_id: Uuid,
        quotas: TierQuotas,
    ) -> PortResult<DomainConfiguration>;

    // --- Questions ---
    async fn create_question(&self, question: NewQuestion) -> PortResult<Question>;

    async fn update_question(&self, question_id: Uuid, update: QuestionUpdate)
        -> PortResult<Question>;

    async fn set_question_audio(&self, question_id: Uuid, audio_url: &str) -> PortResult<()>;

    async fn get_question(&self, question_id: Uuid) -> PortResult<Question>;

    /// Fails with `Conflict` while any session plan references the question.
    async fn delete_question(&self, question_id: Uuid) -> PortResult<()>;

    async fn list_domain_questions(&self, domain_id: Uuid) -> PortResult<Vec<Question>>;

    async fn list_interview_questions(&self, interview_id: Uuid) -> PortResult<Vec<Question>>;

    // --- Company Interviews ---
    /// Persists the interview, its questions and its invitations in one transaction.
    async fn create_company_interview(
        &self,
        interview: NewCompanyInterview,
    ) -> PortResult<CompanyInterview>;

    async fn get_company_interview(&self, interview_id: Uuid) -> PortResult<CompanyInterview>;

    async fn list_company_interviews(&self, company_id: Uuid)
        -> PortResult<Vec<InterviewSummary>>;

    /// Returns `false` when the interview was already inactive.
    async fn deactivate_interview(&self, interview_id: Uuid) -> PortResult<bool>;

    /// Removes responses, session plans, saved candidates, sessions, invitations,
    /// questions and finally the interview, in that order.
    async fn delete_company_interview(&self, interview_id: Uuid) -> PortResult<()>;

    // --- Invitations ---
    async fn create_invitations(
        &self,
        interview_id: Uuid,
        invitations: Vec<NewInvitation>,
    ) -> PortResult<Vec<Invitation>>;

    async fn token_exists(&self, token: &str) -> PortResult<bool>;

    async fn find_invitation_by_token(&self, token: &str) -> PortResult<Invitation>;

    async fn list_invitations(&self, interview_id: Uuid) -> PortResult<Vec<Invitation>>;

    /// Atomically flips `is_used`, creates the session and links it to the invitation.
    /// Fails with `AlreadyClaimed` (and writes nothing) when the invitation was already
    /// used. Any other rejected write stays a `Conflict`.
    async fn redeem_invitation(
        &self,
        invitation_id: Uuid,
        session: NewSession,
    ) -> PortResult<Session>;

    // --- Sessions ---
    async fn create_session(&self, session: NewSession) -> PortResult<Session>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session>;

    async fn list_user_sessions(&self, user_id: Uuid) -> PortResult<Vec<PracticeSessionSummary>>;

    async fn list_interview_sessions(&self, interview_id: Uuid) -> PortResult<Vec<Session>>;

    /// The session's question plan ordered by `Order`.
    async fn session_plan(&self, session_id: Uuid) -> PortResult<Vec<SessionQuestion>>;

    /// Cascades responses and saved-candidate bookmarks.
    async fn delete_session(&self, session_id: Uuid) -> PortResult<()>;

    // --- Responses ---
    /// Stores a response and, in the same transaction, marks the session completed
    /// once every planned question has a response. Fails with `Conflict` when a
    /// response already exists at that order.
    async fn record_response(&self, response: NewResponse) -> PortResult<RecordedResponse>;

    async fn get_response(&self, response_id: Uuid) -> PortResult<Response>;

    async fn list_responses(&self, session_id: Uuid) -> PortResult<Vec<Response>>;

    /// Writes feedback and score only if the response is still unscored.
    /// Returns `false` when it had already been scored.
    async fn record_evaluation(&self, response_id: Uuid, evaluation: Evaluation)
        -> PortResult<bool>;

    /// Sets the aggregate score only if none has been stored yet.
    async fn finalize_session_score(&self, session_id: Uuid, score: f64) -> PortResult<bool>;

    // --- Saved Candidates ---
    /// Fails with `Conflict` for a duplicate (company, session) pair.
    async fn save_candidate(&self, saved: NewSavedCandidate) -> PortResult<SavedCandidate>;

    async fn find_saved_candidate(
        &self,
        company_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Option<SavedCandidate>>;

    async fn get_saved_candidate(&self, saved_id: Uuid) -> PortResult<SavedCandidate>;

    async fn list_saved_candidates(&self, company_id: Uuid) -> PortResult<Vec<SavedCandidate>>;

    async fn delete_saved_candidate(&self, saved_id: Uuid) -> PortResult<()>;

    // --- Activity & Stats ---
    async fn append_activity(&self, kind: &str, description: &str) -> PortResult<()>;

    /// Most recent first.
    async fn recent_activity(&self, limit: u32) -> PortResult<Vec<ActivityEntry>>;

    async fn dashboard_stats(&self) -> PortResult<DashboardStats>;
}

#[async_trait]
pub trait EvaluationService: Send + Sync {
    /// Scores a single answer against the question's ideal answer.
    async fn evaluate(&self, request: &EvaluationRequest) -> PortResult<Evaluation>;
}

#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    /// Transcribes an uploaded recording into text.
    async fn transcribe_audio(&self, audio_data: &[u8], file_name: &str) -> PortResult<String>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>>;
}

#[async_trait]
pub trait AudioStorage: Send + Sync {
    /// Persists the bytes and returns an opaque URL referencing them.
    async fn save_audio(&self, audio_data: &[u8], extension: &str) -> PortResult<String>;

    /// Removes audio previously returned by `save_audio`. Unknown URLs are not an error.
    async fn delete_audio(&self, url: &str) -> PortResult<()>;
}

#[async_trait]
pub trait InvitationMailer: Send + Sync {
    /// Delivers one candidate's interview link.
    async fn send_invitation(&self, notice: &InvitationNotice) -> PortResult<()>;
}

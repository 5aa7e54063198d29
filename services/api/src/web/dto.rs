//! services/api/src/web/dto.rs
//!
//! Request and response payloads of the REST API. Core types stay free of
//! serialization concerns; everything the frontend sees is shaped here.

use chrono::{DateTime, Utc};
use interview_core::{
    company::{CandidateResult, CandidateSessionDetail, CreatedInterview, InterviewDetail},
    domain::{
        ActivityEntry, CompanyInterview, DashboardStats, Difficulty, Domain, DomainConfiguration,
        DomainSummary, Invitation, InterviewSummary, PracticeSessionSummary, Question,
        QuestionDraft, ResponseState, SavedCandidate, Session, SessionState, TierQuotas,
    },
    invitations::RedeemedSession,
    scoring::{EvaluationOutcome, ResponseBreakdown, ResultsStatus, SessionResults},
    sessions::{QuestionPrompt, StartedSession, SubmitReceipt},
    catalog::checked_quotas,
    InterviewResult,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

//=========================================================================================
// Shared Pieces
//=========================================================================================

/// Question counts per difficulty tier, easiest (`e`) to hardest (`a`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct QuotasPayload {
    pub e: i64,
    pub d: i64,
    pub c: i64,
    pub b: i64,
    pub a: i64,
}

impl QuotasPayload {
    pub fn into_quotas(self) -> InterviewResult<TierQuotas> {
        checked_quotas([self.e, self.d, self.c, self.b, self.a])
    }
}

impl From<TierQuotas> for QuotasPayload {
    fn from(q: TierQuotas) -> Self {
        Self {
            e: q.e.into(),
            d: q.d.into(),
            c: q.c.into(),
            b: q.b.into(),
            a: q.a.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuestionPayload {
    pub text: String,
    pub ideal_answer: String,
    #[schema(value_type = String, example = "C")]
    pub difficulty: Difficulty,
    /// Company interviews only: always asked, before sampled questions.
    #[serde(default)]
    pub pinned: bool,
}

impl From<QuestionPayload> for QuestionDraft {
    fn from(p: QuestionPayload) -> Self {
        QuestionDraft {
            text: p.text,
            ideal_answer: p.ideal_answer,
            difficulty: p.difficulty,
            pinned: p.pinned,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub text: String,
    pub ideal_answer: String,
    pub audio_url: Option<String>,
    pub difficulty: String,
    pub pinned: bool,
    pub position: u32,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            difficulty: q.difficulty.to_string(),
            text: q.text,
            ideal_answer: q.ideal_answer,
            audio_url: q.audio_url,
            pinned: q.pinned,
            position: q.position,
        }
    }
}

/// A question as shown to whoever answers it. Never carries the ideal answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionPromptResponse {
    pub session_id: Uuid,
    pub order: u32,
    pub total: u32,
    pub question_id: Uuid,
    pub text: String,
    pub audio_url: Option<String>,
    pub difficulty: String,
}

impl From<QuestionPrompt> for QuestionPromptResponse {
    fn from(p: QuestionPrompt) -> Self {
        Self {
            session_id: p.session_id,
            order: p.order,
            total: p.total,
            question_id: p.question_id,
            text: p.text,
            audio_url: p.audio_url,
            difficulty: p.difficulty.to_string(),
        }
    }
}

//=========================================================================================
// Catalog (public + admin)
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct DomainResponse {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_count: Option<i64>,
}

impl From<Domain> for DomainResponse {
    fn from(d: Domain) -> Self {
        Self {
            id: d.id,
            name: d.name,
            logo_url: d.logo_url,
            created_at: d.created_at,
            session_count: None,
            question_count: None,
        }
    }
}

impl From<DomainSummary> for DomainResponse {
    fn from(s: DomainSummary) -> Self {
        Self {
            session_count: Some(s.session_count),
            question_count: Some(s.question_count),
            ..s.domain.into()
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DomainPayload {
    #[validate(length(min = 1, max = 120, message = "Domain name must be 1-120 characters"))]
    pub name: String,
    #[validate(url(message = "Logo must be a valid URL"))]
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigurationResponse {
    pub domain_id: Uuid,
    pub questions_per_tier: QuotasPayload,
    pub total_questions: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<DomainConfiguration> for ConfigurationResponse {
    fn from(c: DomainConfiguration) -> Self {
        Self {
            domain_id: c.domain_id,
            total_questions: c.quotas.total(),
            questions_per_tier: c.quotas.into(),
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub domains: i64,
    pub questions: i64,
    pub practice_sessions: i64,
    pub candidate_sessions: i64,
    pub company_interviews: i64,
}

impl From<DashboardStats> for StatsResponse {
    fn from(s: DashboardStats) -> Self {
        Self {
            domains: s.domains,
            questions: s.questions,
            practice_sessions: s.practice_sessions,
            candidate_sessions: s.candidate_sessions,
            company_interviews: s.company_interviews,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub kind: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ActivityEntry> for ActivityResponse {
    fn from(a: ActivityEntry) -> Self {
        Self {
            id: a.id,
            kind: a.kind,
            description: a.description,
            timestamp: a.timestamp,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Clamped to 1..=50.
    pub limit: Option<u32>,
}

//=========================================================================================
// Sessions & Answers
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartPracticePayload {
    pub domain_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartedSessionResponse {
    pub session_id: Uuid,
    pub total_questions: u32,
    pub first_question: QuestionPromptResponse,
}

impl From<StartedSession> for StartedSessionResponse {
    fn from(s: StartedSession) -> Self {
        Self {
            session_id: s.session.id,
            total_questions: s.session.question_count,
            first_question: s.first_question.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PracticeSessionResponse {
    pub session_id: Uuid,
    pub domain_name: String,
    pub logo_url: Option<String>,
    pub total_questions: u32,
    pub answered: i64,
    #[schema(value_type = String, example = "in_progress")]
    pub state: SessionState,
    pub average_score: Option<f64>,
    pub started_at: DateTime<Utc>,
}

impl From<PracticeSessionSummary> for PracticeSessionResponse {
    fn from(s: PracticeSessionSummary) -> Self {
        let answered = usize::try_from(s.answered).unwrap_or(0);
        Self {
            session_id: s.session.id,
            state: s.session.state(answered),
            total_questions: s.session.question_count,
            average_score: s.session.average_score,
            started_at: s.session.started_at,
            domain_name: s.domain_name,
            logo_url: s.logo_url,
            answered: s.answered,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub response_id: Uuid,
    pub order: u32,
    pub session_completed: bool,
    /// `scored`, `pending` or `queued` (evaluation runs in the background).
    pub evaluation: String,
}

impl From<SubmitReceipt> for SubmitResponse {
    fn from(r: SubmitReceipt) -> Self {
        let evaluation = match r.evaluation {
            Some(EvaluationOutcome::Scored(_)) | Some(EvaluationOutcome::AlreadyScored) => "scored",
            Some(EvaluationOutcome::Pending) => "pending",
            Some(EvaluationOutcome::InFlight) | None => "queued",
        };
        Self {
            response_id: r.response_id,
            order: r.order,
            session_completed: r.session_completed,
            evaluation: evaluation.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BreakdownResponse {
    pub order: u32,
    pub question_id: Uuid,
    pub question_text: String,
    pub ideal_answer: String,
    pub audio_url: Option<String>,
    pub transcript: Option<String>,
    pub feedback: Option<String>,
    pub score: Option<u8>,
    #[schema(value_type = String, example = "evaluated")]
    pub state: ResponseState,
}

impl From<ResponseBreakdown> for BreakdownResponse {
    fn from(b: ResponseBreakdown) -> Self {
        Self {
            order: b.order,
            question_id: b.question_id,
            question_text: b.question_text,
            ideal_answer: b.ideal_answer,
            audio_url: b.audio_url,
            transcript: b.transcript,
            feedback: b.feedback,
            score: b.score,
            state: b.state,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResultsResponse {
    pub session_id: Uuid,
    #[schema(value_type = String, example = "processing")]
    pub status: ResultsStatus,
    pub total_questions: u32,
    pub answered: usize,
    pub pending_evaluations: usize,
    pub aggregate_score: Option<f64>,
    pub responses: Vec<BreakdownResponse>,
}

impl From<SessionResults> for ResultsResponse {
    fn from(r: SessionResults) -> Self {
        Self {
            session_id: r.session_id,
            status: r.status,
            total_questions: r.total_questions,
            answered: r.answered,
            pending_evaluations: r.pending_evaluations,
            aggregate_score: r.aggregate_score,
            responses: r.breakdown.into_iter().map(Into::into).collect(),
        }
    }
}

//=========================================================================================
// Candidates
//=========================================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CandidateStartPayload {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CandidateStartResponse {
    pub session_id: Uuid,
    pub interview_title: String,
    pub total_questions: u32,
    pub first_question: QuestionPromptResponse,
}

impl From<RedeemedSession> for CandidateStartResponse {
    fn from(r: RedeemedSession) -> Self {
        Self {
            session_id: r.session.id,
            interview_title: r.interview_title,
            total_questions: r.session.question_count,
            first_question: r.first_question.into(),
        }
    }
}

/// What a candidate learns after answering: never a score.
#[derive(Debug, Serialize, ToSchema)]
pub struct CandidateSubmitResponse {
    pub order: u32,
    pub session_completed: bool,
}

impl From<SubmitReceipt> for CandidateSubmitResponse {
    fn from(r: SubmitReceipt) -> Self {
        Self {
            order: r.order,
            session_completed: r.session_completed,
        }
    }
}

//=========================================================================================
// Company Interviews
//=========================================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInterviewPayload {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub questions: Vec<QuestionPayload>,
    /// Absent: every non-pinned question is asked.
    pub questions_per_tier: Option<QuotasPayload>,
    #[serde(default)]
    pub candidate_emails: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvitePayload {
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub candidate_email: String,
    pub link: String,
    pub is_used: bool,
    pub session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl InvitationResponse {
    pub fn new(invitation: Invitation, link: String) -> Self {
        Self {
            id: invitation.id,
            candidate_email: invitation.candidate_email,
            link,
            is_used: invitation.is_used,
            session_id: invitation.session_id,
            created_at: invitation.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InterviewResponse {
    pub id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub questions_per_tier: Option<QuotasPayload>,
    pub created_at: DateTime<Utc>,
}

impl From<CompanyInterview> for InterviewResponse {
    fn from(i: CompanyInterview) -> Self {
        Self {
            id: i.id,
            title: i.title,
            is_active: i.is_active,
            questions_per_tier: i.quotas.map(Into::into),
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedInterviewResponse {
    pub interview: InterviewResponse,
    pub invitations: Vec<InvitationResponse>,
}

impl CreatedInterviewResponse {
    pub fn new(created: CreatedInterview, link: impl Fn(&str) -> String) -> Self {
        Self {
            interview: created.interview.into(),
            invitations: created
                .invitations
                .into_iter()
                .map(|inv| {
                    let url = link(&inv.token);
                    InvitationResponse::new(inv, url)
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InterviewSummaryResponse {
    #[serde(flatten)]
    pub interview: InterviewResponse,
    pub question_count: i64,
    pub invitation_count: i64,
    pub session_count: i64,
}

impl From<InterviewSummary> for InterviewSummaryResponse {
    fn from(s: InterviewSummary) -> Self {
        Self {
            interview: s.interview.into(),
            question_count: s.question_count,
            invitation_count: s.invitation_count,
            session_count: s.session_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InterviewDetailResponse {
    pub interview: InterviewResponse,
    pub questions: Vec<QuestionResponse>,
    pub invitations: Vec<InvitationResponse>,
}

impl InterviewDetailResponse {
    pub fn new(detail: InterviewDetail, link: impl Fn(&str) -> String) -> Self {
        Self {
            interview: detail.interview.into(),
            questions: detail.questions.into_iter().map(Into::into).collect(),
            invitations: detail
                .invitations
                .into_iter()
                .map(|inv| {
                    let url = link(&inv.token);
                    InvitationResponse::new(inv, url)
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CandidateResultResponse {
    pub session_id: Uuid,
    pub candidate_email: String,
    pub is_completed: bool,
    pub aggregate_score: Option<f64>,
    pub answered: usize,
    pub total_questions: u32,
    pub pending_evaluations: usize,
    pub started_at: DateTime<Utc>,
    pub saved: bool,
}

impl From<CandidateResult> for CandidateResultResponse {
    fn from(r: CandidateResult) -> Self {
        Self {
            session_id: r.session_id,
            candidate_email: r.candidate_email,
            is_completed: r.is_completed,
            aggregate_score: r.aggregate_score,
            answered: r.answered,
            total_questions: r.total_questions,
            pending_evaluations: r.pending_evaluations,
            started_at: r.started_at,
            saved: r.saved,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CandidateSessionResponse {
    pub session_id: Uuid,
    pub candidate_email: String,
    pub interview_id: Uuid,
    pub interview_title: String,
    pub started_at: DateTime<Utc>,
    pub saved_candidate_id: Option<Uuid>,
    pub results: ResultsResponse,
}

impl From<CandidateSessionDetail> for CandidateSessionResponse {
    fn from(d: CandidateSessionDetail) -> Self {
        let Session {
            id, started_at, ..
        } = d.session;
        Self {
            session_id: id,
            candidate_email: d.candidate_email,
            interview_id: d.interview_id,
            interview_title: d.interview_title,
            started_at,
            saved_candidate_id: d.saved_candidate_id,
            results: d.results.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedCandidateResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub interview_id: Uuid,
    pub candidate_email: String,
    pub interview_title: String,
    pub average_score: Option<f64>,
    pub saved_at: DateTime<Utc>,
}

impl From<SavedCandidate> for SavedCandidateResponse {
    fn from(s: SavedCandidate) -> Self {
        Self {
            id: s.id,
            session_id: s.session_id,
            interview_id: s.interview_id,
            candidate_email: s.candidate_email,
            interview_title: s.interview_title,
            average_score: s.average_score,
            saved_at: s.saved_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_quotas_are_rejected() {
        let payload = QuotasPayload {
            e: 1,
            d: 1,
            c: -1,
            b: 0,
            a: 0,
        };
        assert!(payload.into_quotas().is_err());
    }

    #[test]
    fn question_payload_defaults_to_unpinned() {
        let payload: QuestionPayload = serde_json::from_str(
            r#"{"text": "What is a mutex?", "ideal_answer": "A lock", "difficulty": "D"}"#,
        )
        .unwrap();
        let draft = QuestionDraft::from(payload);
        assert!(!draft.pinned);
        assert_eq!(draft.difficulty, Difficulty::D);
    }

    #[test]
    fn background_submissions_report_queued() {
        let receipt = SubmitReceipt {
            response_id: Uuid::new_v4(),
            order: 2,
            session_completed: false,
            evaluation: None,
        };
        assert_eq!(SubmitResponse::from(receipt).evaluation, "queued");
    }
}

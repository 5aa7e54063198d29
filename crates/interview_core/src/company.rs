//! crates/interview_core/src/company.rs
//!
//! Company-authored interviews: authoring, inviting candidates, reviewing
//! their sessions and bookmarking the ones worth keeping.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{
    assert_interview_access, assert_saved_access, assert_session_access, require_role, Actor, Role,
};
use crate::activity::ActivityLog;
use crate::catalog::{ensure_quota_bounds, required, validate_draft};
use crate::domain::{
    ActivityKind, CompanyInterview, Difficulty, Invitation, InterviewSummary, NewCompanyInterview,
    NewSavedCandidate, Question, QuestionDraft, SavedCandidate, Session, SessionOrigin, TierQuotas,
};
use crate::error::{InterviewError, InterviewResult};
use crate::invitations::{normalize_emails, InvitationManager};
use crate::narration::QuestionNarrator;
use crate::ports::{DatabaseService, PortError};
use crate::scoring::{ScoringAggregator, SessionResults};

#[derive(Debug, Clone)]
pub struct CreateInterview {
    pub title: String,
    /// Pinned questions are always asked, first, in this order.
    pub questions: Vec<QuestionDraft>,
    /// Per-tier sample of the non-pinned questions; `None` asks all of them.
    pub questions_per_tier: Option<TierQuotas>,
    pub candidate_emails: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedInterview {
    pub interview: CompanyInterview,
    pub invitations: Vec<Invitation>,
}

#[derive(Debug, Clone)]
pub struct InterviewDetail {
    pub interview: CompanyInterview,
    pub questions: Vec<Question>,
    pub invitations: Vec<Invitation>,
}

/// One candidate's line in the interview results table.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
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

#[derive(Debug, Clone)]
pub struct CandidateSessionDetail {
    pub session: Session,
    pub candidate_email: String,
    pub interview_id: Uuid,
    pub interview_title: String,
    pub results: SessionResults,
    pub saved_candidate_id: Option<Uuid>,
}

/// Rejects interview sets that could never produce a question for a session.
fn ensure_askable(questions: &[QuestionDraft], quotas: Option<&TierQuotas>) -> InterviewResult<()> {
    if questions.iter().any(|q| q.pinned) {
        return Ok(());
    }
    let askable = match quotas {
        None => !questions.is_empty(),
        Some(quotas) => Difficulty::ASCENDING.iter().any(|tier| {
            quotas.get(*tier) > 0 && questions.iter().any(|q| q.difficulty == *tier)
        }),
    };
    if askable {
        Ok(())
    } else {
        Err(InterviewError::EmptyQuestionPool)
    }
}

#[derive(Clone)]
pub struct CompanyInterviews {
    db: Arc<dyn DatabaseService>,
    invitations: InvitationManager,
    scoring: ScoringAggregator,
    activity: ActivityLog,
    narrator: Option<QuestionNarrator>,
}

impl CompanyInterviews {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        invitations: InvitationManager,
        scoring: ScoringAggregator,
        activity: ActivityLog,
        narrator: Option<QuestionNarrator>,
    ) -> Self {
        Self {
            db,
            invitations,
            scoring,
            activity,
            narrator,
        }
    }

    /// Loads an interview the actor may manage.
    async fn owned_interview(
        &self,
        actor: &Actor,
        interview_id: Uuid,
    ) -> InterviewResult<CompanyInterview> {
        require_role(actor, &[Role::Company, Role::Admin])?;
        let interview = self.db.get_company_interview(interview_id).await?;
        if let Err(e) = assert_interview_access(actor, &interview) {
            warn!("Company {} denied access to interview {}.", actor.id, interview_id);
            return Err(e);
        }
        Ok(interview)
    }

    /// Loads a candidate session the actor may review.
    async fn owned_candidate_session(
        &self,
        actor: &Actor,
        session_id: Uuid,
    ) -> InterviewResult<(Session, Uuid, String)> {
        require_role(actor, &[Role::Company, Role::Admin])?;
        let session = self.db.get_session(session_id).await?;
        assert_session_access(actor, &session)?;
        match &session.origin {
            SessionOrigin::Candidate {
                interview_id,
                candidate_email,
                ..
            } => {
                let interview_id = *interview_id;
                let email = candidate_email.clone();
                Ok((session, interview_id, email))
            }
            SessionOrigin::Practice { .. } => Err(InterviewError::NotFoundOrDenied),
        }
    }

    /// Creates the interview with its questions and one invitation per email.
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateInterview,
    ) -> InterviewResult<CreatedInterview> {
        require_role(actor, &[Role::Company])?;
        let title = required("Interview title", &request.title)?;
        if request.questions.is_empty() {
            return Err(InterviewError::EmptyQuestionPool);
        }
        let questions = request
            .questions
            .into_iter()
            .map(validate_draft)
            .collect::<InterviewResult<Vec<_>>>()?;
        if let Some(quotas) = &request.questions_per_tier {
            ensure_quota_bounds(quotas)?;
        }
        ensure_askable(&questions, request.questions_per_tier.as_ref())?;
        let emails = normalize_emails(&request.candidate_emails)?;
        let invitations = self.invitations.prepare(&emails).await?;

        let interview = self
            .db
            .create_company_interview(NewCompanyInterview {
                company_id: actor.id,
                title,
                quotas: request.questions_per_tier,
                questions,
                invitations,
            })
            .await?;
        let invitations = self.db.list_invitations(interview.id).await?;

        info!(
            "Company {} created interview {} with {} invitations.",
            actor.id,
            interview.id,
            invitations.len()
        );
        self.activity.record(
            ActivityKind::InterviewCreated,
            format!("Interview '{}' created", interview.title),
        );
        self.invitations
            .notify_in_background(&interview.title, &invitations);

        if let Some(narrator) = &self.narrator {
            for question in self.db.list_interview_questions(interview.id).await? {
                narrator.narrate_in_background(question.id, question.text);
            }
        }

        Ok(CreatedInterview {
            interview,
            invitations,
        })
    }

    /// Invites more candidates to an interview that is still open.
    pub async fn invite(
        &self,
        actor: &Actor,
        interview_id: Uuid,
        emails: &[String],
    ) -> InterviewResult<Vec<Invitation>> {
        let interview = self.owned_interview(actor, interview_id).await?;
        if !interview.is_active {
            return Err(InterviewError::InterviewClosed);
        }
        self.invitations.issue(&interview, emails).await
    }

    pub async fn list(&self, actor: &Actor) -> InterviewResult<Vec<InterviewSummary>> {
        require_role(actor, &[Role::Company])?;
        Ok(self.db.list_company_interviews(actor.id).await?)
    }

    pub async fn get(&self, actor: &Actor, interview_id: Uuid) -> InterviewResult<InterviewDetail> {
        let interview = self.owned_interview(actor, interview_id).await?;
        let questions = self.db.list_interview_questions(interview.id).await?;
        let invitations = self.db.list_invitations(interview.id).await?;
        Ok(InterviewDetail {
            interview,
            questions,
            invitations,
        })
    }

    /// Closes the interview to new candidates. Finishing twice is a `Conflict`.
    pub async fn finish(&self, actor: &Actor, interview_id: Uuid) -> InterviewResult<CompanyInterview> {
        let interview = self.owned_interview(actor, interview_id).await?;
        if !self.db.deactivate_interview(interview.id).await? {
            return Err(InterviewError::Conflict(
                "Interview is already finished".to_string(),
            ));
        }
        info!("Interview {} finished.", interview.id);
        self.activity.record(
            ActivityKind::InterviewFinished,
            format!("Interview '{}' finished", interview.title),
        );
        Ok(CompanyInterview {
            is_active: false,
            ..interview
        })
    }

    /// Removes the interview and everything produced from it.
    pub async fn delete(&self, actor: &Actor, interview_id: Uuid) -> InterviewResult<()> {
        let interview = self.owned_interview(actor, interview_id).await?;
        self.db.delete_company_interview(interview.id).await?;
        info!("Interview {} deleted by {}.", interview.id, actor.id);
        self.activity.record(
            ActivityKind::InterviewDeleted,
            format!("Interview '{}' deleted", interview.title),
        );
        Ok(())
    }

    /// One line per candidate session. Stale evaluations are re-queued, not awaited.
    pub async fn results(
        &self,
        actor: &Actor,
        interview_id: Uuid,
    ) -> InterviewResult<Vec<CandidateResult>> {
        let interview = self.owned_interview(actor, interview_id).await?;
        let sessions = self.db.list_interview_sessions(interview.id).await?;
        let saved: HashMap<Uuid, Uuid> = self
            .db
            .list_saved_candidates(interview.company_id)
            .await?
            .into_iter()
            .map(|s| (s.session_id, s.id))
            .collect();

        let candidates: Vec<(Session, String)> = sessions
            .into_iter()
            .filter_map(|session| match &session.origin {
                SessionOrigin::Candidate {
                    candidate_email, ..
                } => {
                    let email = candidate_email.clone();
                    Some((session, email))
                }
                SessionOrigin::Practice { .. } => None,
            })
            .collect();
        let all_results =
            try_join_all(candidates.iter().map(|(session, _)| self.scoring.results(session)))
                .await?;

        Ok(candidates
            .into_iter()
            .zip(all_results)
            .map(|((session, candidate_email), results)| CandidateResult {
                session_id: session.id,
                candidate_email,
                is_completed: session.is_completed,
                aggregate_score: results.aggregate_score,
                answered: results.answered,
                total_questions: results.total_questions,
                pending_evaluations: results.pending_evaluations,
                started_at: session.started_at,
                saved: saved.contains_key(&session.id),
            })
            .collect())
    }

    /// Full transcript, feedback and scores of one candidate session.
    pub async fn session_detail(
        &self,
        actor: &Actor,
        session_id: Uuid,
    ) -> InterviewResult<CandidateSessionDetail> {
        let (session, interview_id, candidate_email) =
            self.owned_candidate_session(actor, session_id).await?;
        let interview = self.db.get_company_interview(interview_id).await?;
        let results = self.scoring.results(&session).await?;
        let saved_candidate_id = self
            .db
            .find_saved_candidate(interview.company_id, session.id)
            .await?
            .map(|s| s.id);
        Ok(CandidateSessionDetail {
            session,
            candidate_email,
            interview_id,
            interview_title: interview.title,
            results,
            saved_candidate_id,
        })
    }

    /// Bookmarks a candidate with a snapshot of email, title and score.
    pub async fn save_candidate(
        &self,
        actor: &Actor,
        session_id: Uuid,
    ) -> InterviewResult<SavedCandidate> {
        require_role(actor, &[Role::Company])?;
        let (session, interview_id, candidate_email) =
            self.owned_candidate_session(actor, session_id).await?;
        if self
            .db
            .find_saved_candidate(actor.id, session.id)
            .await?
            .is_some()
        {
            return Err(InterviewError::Conflict(
                "Candidate is already saved".to_string(),
            ));
        }
        let interview = self.db.get_company_interview(interview_id).await?;

        let saved = self
            .db
            .save_candidate(NewSavedCandidate {
                company_id: actor.id,
                session_id: session.id,
                interview_id,
                candidate_email,
                interview_title: interview.title,
                average_score: session.average_score,
            })
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => {
                    InterviewError::Conflict("Candidate is already saved".to_string())
                }
                other => other.into(),
            })?;
        info!("Company {} saved candidate session {}.", actor.id, session.id);
        self.activity.record(
            ActivityKind::CandidateSaved,
            format!(
                "Candidate {} saved from interview '{}'",
                saved.candidate_email, saved.interview_title
            ),
        );
        Ok(saved)
    }

    /// Most recently saved first.
    pub async fn list_saved(&self, actor: &Actor) -> InterviewResult<Vec<SavedCandidate>> {
        require_role(actor, &[Role::Company])?;
        Ok(self.db.list_saved_candidates(actor.id).await?)
    }

    pub async fn remove_saved(&self, actor: &Actor, saved_id: Uuid) -> InterviewResult<()> {
        require_role(actor, &[Role::Company, Role::Admin])?;
        let saved = self.db.get_saved_candidate(saved_id).await?;
        assert_saved_access(actor, &saved)?;
        self.db.delete_saved_candidate(saved.id).await?;
        info!("Saved candidate {} removed by {}.", saved.id, actor.id);
        self.activity.record(
            ActivityKind::CandidateRemoved,
            format!(
                "Candidate {} removed from saved candidates",
                saved.candidate_email
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(difficulty: Difficulty, pinned: bool) -> QuestionDraft {
        QuestionDraft {
            text: "Explain ownership".to_string(),
            ideal_answer: "Each value has one owner".to_string(),
            difficulty,
            pinned,
        }
    }

    #[test]
    fn pinned_questions_are_always_askable() {
        let quotas = TierQuotas::uniform(0);
        assert!(ensure_askable(&[draft(Difficulty::C, true)], Some(&quotas)).is_ok());
    }

    #[test]
    fn quotas_that_miss_every_tier_are_rejected() {
        let quotas = TierQuotas {
            e: 0,
            d: 0,
            c: 0,
            b: 0,
            a: 3,
        };
        assert_eq!(
            ensure_askable(&[draft(Difficulty::E, false)], Some(&quotas)),
            Err(InterviewError::EmptyQuestionPool)
        );
        assert!(ensure_askable(&[draft(Difficulty::E, false)], None).is_ok());
    }
}

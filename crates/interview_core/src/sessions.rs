//! crates/interview_core/src/sessions.rs
//!
//! Session lifecycle: creation from a question selection, walking the plan in
//! order, recording responses and handing them to the scoring aggregator.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{assert_session_access, require_role, Actor, Role};
use crate::activity::ActivityLog;
use crate::domain::{
    ActivityKind, Difficulty, NewResponse, NewSession, PracticeSessionSummary, Question,
    Session, SessionOrigin, SessionQuestion, SubmittedAnswer,
};
use crate::error::{InterviewError, InterviewResult};
use crate::ports::{DatabaseService, PortError};
use crate::scoring::{EvaluationOutcome, ScoringAggregator, SessionResults};
use crate::selector::select_questions;

/// Whether a submission waits for its evaluation or leaves it to a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    Inline,
    #[default]
    Background,
}

/// A question as presented to whoever is answering it. Never carries the ideal answer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPrompt {
    pub session_id: Uuid,
    pub order: u32,
    pub total: u32,
    pub question_id: Uuid,
    pub text: String,
    pub audio_url: Option<String>,
    pub difficulty: Difficulty,
}

impl QuestionPrompt {
    pub(crate) fn new(session_id: Uuid, order: u32, total: u32, question: &Question) -> Self {
        Self {
            session_id,
            order,
            total,
            question_id: question.id,
            text: question.text.clone(),
            audio_url: question.audio_url.clone(),
            difficulty: question.difficulty,
        }
    }

    fn from_plan(entry: &SessionQuestion, total: u32) -> Self {
        Self::new(entry.session_id, entry.order, total, &entry.question)
    }
}

#[derive(Debug, Clone)]
pub struct StartedSession {
    pub session: Session,
    pub first_question: QuestionPrompt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub response_id: Uuid,
    pub order: u32,
    pub session_completed: bool,
    /// Present only when evaluation ran inline.
    pub evaluation: Option<EvaluationOutcome>,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<dyn DatabaseService>,
    scoring: ScoringAggregator,
    activity: ActivityLog,
    mode: EvaluationMode,
}

impl SessionManager {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        scoring: ScoringAggregator,
        activity: ActivityLog,
        mode: EvaluationMode,
    ) -> Self {
        Self {
            db,
            scoring,
            activity,
            mode,
        }
    }

    /// Starts a practice run against a public domain using its tier configuration.
    pub async fn start_practice(
        &self,
        actor: &Actor,
        domain_id: Uuid,
    ) -> InterviewResult<StartedSession> {
        require_role(actor, &[Role::Regular])?;
        let domain = self.db.get_domain(domain_id).await?;
        let quotas = match self.db.get_configuration(domain_id).await {
            Ok(configuration) => configuration.quotas,
            Err(PortError::NotFound(_)) => Default::default(),
            Err(e) => return Err(e.into()),
        };
        let pool = self.db.list_domain_questions(domain_id).await?;

        let selection = select_questions(&pool, &quotas, &mut rand::thread_rng())?;
        if selection.is_partial() {
            info!(
                "Domain '{}' could only supply {} of {} requested questions.",
                domain.name,
                selection.questions.len(),
                selection.requested
            );
        }

        let session = self
            .db
            .create_session(NewSession {
                origin: SessionOrigin::Practice {
                    user_id: actor.id,
                    domain_id,
                },
                question_ids: selection.questions.iter().map(|q| q.id).collect(),
            })
            .await?;
        info!("User {} started practice session {}.", actor.id, session.id);
        self.activity.record(
            ActivityKind::SessionStarted,
            format!("Practice session started for domain '{}'", domain.name),
        );

        let first_question = QuestionPrompt::new(
            session.id,
            1,
            session.question_count,
            &selection.questions[0],
        );
        Ok(StartedSession {
            session,
            first_question,
        })
    }

    /// Loads a session after the ownership check. Missing and foreign sessions look the same.
    pub async fn open_session(&self, actor: &Actor, session_id: Uuid) -> InterviewResult<Session> {
        let session = self.db.get_session(session_id).await?;
        if let Err(e) = assert_session_access(actor, &session) {
            warn!(
                "Actor {} ({}) denied access to session {}.",
                actor.id, actor.role, session_id
            );
            return Err(e);
        }
        Ok(session)
    }

    /// The lowest-ordered question that has no response yet.
    pub async fn next_question(
        &self,
        actor: &Actor,
        session_id: Uuid,
    ) -> InterviewResult<QuestionPrompt> {
        let session = self.open_session(actor, session_id).await?;
        let plan = self.db.session_plan(session.id).await?;
        let responses = self.db.list_responses(session.id).await?;

        plan.iter()
            .find(|entry| !responses.iter().any(|r| r.order == entry.order))
            .map(|entry| QuestionPrompt::from_plan(entry, session.question_count))
            .ok_or(InterviewError::NoMoreQuestions)
    }

    /// Runs every check a submission for `order` must pass, without writing anything.
    ///
    /// Callers that store an upload before submitting use this to reject
    /// foreign sessions and misplaced answers before the upload is kept.
    pub async fn check_submittable(
        &self,
        actor: &Actor,
        session_id: Uuid,
        order: u32,
    ) -> InterviewResult<()> {
        self.submission_target(actor, session_id, order)
            .await
            .map(|_| ())
    }

    /// The session and the planned question `order` refers to, if it may be answered now.
    async fn submission_target(
        &self,
        actor: &Actor,
        session_id: Uuid,
        order: u32,
    ) -> InterviewResult<(Session, Uuid)> {
        let session = self.open_session(actor, session_id).await?;
        if session.is_completed {
            return Err(InterviewError::SessionAlreadyCompleted);
        }
        if order == 0 || order > session.question_count {
            return Err(InterviewError::Validation(format!(
                "Question order must be between 1 and {}",
                session.question_count
            )));
        }

        let responses = self.db.list_responses(session.id).await?;
        if responses.iter().any(|r| r.order == order) {
            return Err(InterviewError::DuplicateOrder(order));
        }
        let plan = self.db.session_plan(session.id).await?;
        let expected = plan
            .iter()
            .map(|entry| entry.order)
            .find(|o| !responses.iter().any(|r| r.order == *o))
            .ok_or(InterviewError::NoMoreQuestions)?;
        if expected != order {
            return Err(InterviewError::OutOfOrder {
                expected,
                got: order,
            });
        }
        let question_id = plan
            .iter()
            .find(|entry| entry.order == order)
            .map(|entry| entry.question.id)
            .ok_or_else(|| {
                InterviewError::Internal(format!("session {} has no question {}", session.id, order))
            })?;
        Ok((session, question_id))
    }

    /// Records the answer for `order` and forwards it for scoring.
    ///
    /// Answers must arrive in plan order. Evaluation failures are never
    /// reported here; they surface as pending results instead.
    pub async fn submit_response(
        &self,
        actor: &Actor,
        session_id: Uuid,
        order: u32,
        answer: SubmittedAnswer,
    ) -> InterviewResult<SubmitReceipt> {
        let transcript = answer
            .transcript
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if transcript.is_none() && answer.audio_url.is_none() {
            return Err(InterviewError::Validation(
                "An answer needs either a transcript or an audio recording".to_string(),
            ));
        }

        let (session, question_id) = self.submission_target(actor, session_id, order).await?;

        let recorded = self
            .db
            .record_response(NewResponse {
                session_id: session.id,
                question_id,
                order,
                audio_url: answer.audio_url,
                transcript,
            })
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => InterviewError::DuplicateOrder(order),
                other => other.into(),
            })?;
        let response_id = recorded.response.id;
        info!("Recorded response {} for session {}.", order, session.id);

        if recorded.session_completed {
            info!("Session {} completed.", session.id);
            self.activity.record(
                ActivityKind::SessionCompleted,
                format!("Session {} completed", session.id),
            );
        }

        let evaluation = match self.mode {
            EvaluationMode::Inline => match self.scoring.evaluate_response(response_id).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!("Inline evaluation of response {} failed: {}", response_id, e);
                    Some(EvaluationOutcome::Pending)
                }
            },
            EvaluationMode::Background => {
                self.scoring.spawn_evaluation(response_id);
                None
            }
        };

        Ok(SubmitReceipt {
            response_id,
            order,
            session_completed: recorded.session_completed,
            evaluation,
        })
    }

    /// Scores and breakdown. Candidates never see their own results.
    pub async fn results(&self, actor: &Actor, session_id: Uuid) -> InterviewResult<SessionResults> {
        require_role(actor, &[Role::Regular, Role::Company, Role::Admin])?;
        let session = self.open_session(actor, session_id).await?;
        self.scoring.results(&session).await
    }

    pub async fn list_my_sessions(
        &self,
        actor: &Actor,
    ) -> InterviewResult<Vec<PracticeSessionSummary>> {
        require_role(actor, &[Role::Regular])?;
        Ok(self.db.list_user_sessions(actor.id).await?)
    }

    /// Removes the session with its responses and any bookmarks of it.
    pub async fn delete_session(&self, actor: &Actor, session_id: Uuid) -> InterviewResult<()> {
        require_role(actor, &[Role::Regular, Role::Company, Role::Admin])?;
        let session = self.open_session(actor, session_id).await?;
        self.db.delete_session(session.id).await?;
        info!("Session {} deleted by {}.", session.id, actor.id);
        self.activity.record(
            ActivityKind::SessionDeleted,
            format!("Session {} deleted", session.id),
        );
        Ok(())
    }
}

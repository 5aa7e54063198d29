//! crates/interview_core/src/platform.rs
//!
//! Wires the core services together over one set of ports.

use std::sync::Arc;
use std::time::Duration;

use crate::activity::ActivityLog;
use crate::catalog::Catalog;
use crate::company::CompanyInterviews;
use crate::domain::SubmittedAnswer;
use crate::error::InterviewResult;
use crate::invitations::{InvitationManager, RedeemedSession};
use crate::narration::QuestionNarrator;
use crate::ports::{
    AudioStorage, DatabaseService, EvaluationService, InvitationMailer, TextToSpeechService,
};
use crate::scoring::{ScoringAggregator, DEFAULT_RETRY_AFTER};
use crate::sessions::{EvaluationMode, QuestionPrompt, SessionManager, SubmitReceipt};

#[derive(Clone)]
pub struct InterviewPlatform {
    pub catalog: Catalog,
    pub sessions: SessionManager,
    pub invitations: InvitationManager,
    pub company: CompanyInterviews,
    pub scoring: ScoringAggregator,
    pub activity: ActivityLog,
}

pub struct PlatformBuilder {
    db: Arc<dyn DatabaseService>,
    evaluator: Arc<dyn EvaluationService>,
    narrator: Option<QuestionNarrator>,
    mailer: Option<Arc<dyn InvitationMailer>>,
    mode: EvaluationMode,
    retry_after: Duration,
}

impl PlatformBuilder {
    /// Narrates newly authored questions through text-to-speech.
    pub fn with_narration(
        mut self,
        tts: Arc<dyn TextToSpeechService>,
        storage: Arc<dyn AudioStorage>,
    ) -> Self {
        self.narrator = Some(QuestionNarrator::new(tts, storage, self.db.clone()));
        self
    }

    /// Emails candidates their links once invitations are stored.
    pub fn with_mailer(mut self, mailer: Arc<dyn InvitationMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn evaluation_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// How old an unscored response must be before a results poll re-queues it.
    pub fn retry_pending_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn build(self) -> InterviewPlatform {
        let activity = ActivityLog::new(self.db.clone());
        let scoring = ScoringAggregator::new(self.db.clone(), self.evaluator)
            .with_retry_after(self.retry_after);
        let invitations = InvitationManager::new(self.db.clone(), activity.clone(), self.mailer);
        InterviewPlatform {
            catalog: Catalog::new(self.db.clone(), activity.clone(), self.narrator.clone()),
            sessions: SessionManager::new(
                self.db.clone(),
                scoring.clone(),
                activity.clone(),
                self.mode,
            ),
            company: CompanyInterviews::new(
                self.db,
                invitations.clone(),
                scoring.clone(),
                activity.clone(),
                self.narrator,
            ),
            invitations,
            scoring,
            activity,
        }
    }
}

impl InterviewPlatform {
    pub fn builder(
        db: Arc<dyn DatabaseService>,
        evaluator: Arc<dyn EvaluationService>,
    ) -> PlatformBuilder {
        PlatformBuilder {
            db,
            evaluator,
            narrator: None,
            mailer: None,
            mode: EvaluationMode::default(),
            retry_after: DEFAULT_RETRY_AFTER,
        }
    }

    //=====================================================================================
    // Candidate flow: the invitation token stands in for an identity.
    //=====================================================================================

    pub async fn candidate_start(&self, token: &str, email: &str) -> InterviewResult<RedeemedSession> {
        self.invitations.redeem(token, email).await
    }

    pub async fn candidate_next_question(&self, token: &str) -> InterviewResult<QuestionPrompt> {
        let actor = self.invitations.resolve_candidate(token).await?;
        self.sessions.next_question(&actor, actor.id).await
    }

    pub async fn candidate_submit(
        &self,
        token: &str,
        order: u32,
        answer: SubmittedAnswer,
    ) -> InterviewResult<SubmitReceipt> {
        let actor = self.invitations.resolve_candidate(token).await?;
        self.sessions
            .submit_response(&actor, actor.id, order, answer)
            .await
    }
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::access::Actor;
use crate::company::{CreateInterview, CreatedInterview};
use crate::domain::{
    Difficulty, Domain, Evaluation, EvaluationRequest, InvitationNotice, Question, QuestionDraft,
    QuestionOwner, SubmittedAnswer, TierQuotas,
};
use crate::memory::MemoryStore;
use crate::platform::InterviewPlatform;
use crate::ports::{DatabaseService, EvaluationService, InvitationMailer, PortError, PortResult};
use crate::sessions::EvaluationMode;

/// Replays scripted results in order, then scores everything 80.
#[derive(Default)]
pub(super) struct ScriptedEvaluator {
    script: Mutex<VecDeque<PortResult<Evaluation>>>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    pub(super) fn scripted(results: Vec<PortResult<Evaluation>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn push(&self, result: PortResult<Evaluation>) {
        self.script.lock().expect("script lock").push_back(result);
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvaluationService for ScriptedEvaluator {
    async fn evaluate(&self, _request: &EvaluationRequest) -> PortResult<Evaluation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().expect("script lock").pop_front();
        next.unwrap_or_else(|| score(80.0))
    }
}

pub(super) fn score(raw: f64) -> PortResult<Evaluation> {
    Ok(Evaluation::from_raw("Clear and structured".to_string(), raw, None))
}

pub(super) fn unavailable() -> PortResult<Evaluation> {
    Err(PortError::Unavailable("evaluation service timed out".to_string()))
}

/// Remembers every notice it is handed; optionally fails each delivery.
#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<InvitationNotice>>,
    failing: bool,
}

impl RecordingMailer {
    pub(super) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(super) fn sent(&self) -> Vec<InvitationNotice> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[async_trait]
impl InvitationMailer for RecordingMailer {
    async fn send_invitation(&self, notice: &InvitationNotice) -> PortResult<()> {
        self.sent.lock().expect("mailer lock").push(notice.clone());
        if self.failing {
            return Err(PortError::Unavailable("smtp relay refused the connection".to_string()));
        }
        Ok(())
    }
}

pub(super) struct Harness {
    pub store: Arc<MemoryStore>,
    pub evaluator: Arc<ScriptedEvaluator>,
    pub platform: InterviewPlatform,
    pub admin: Actor,
}

pub(super) fn harness() -> Harness {
    harness_with(ScriptedEvaluator::default(), EvaluationMode::Inline)
}

pub(super) fn harness_with(evaluator: ScriptedEvaluator, mode: EvaluationMode) -> Harness {
    harness_over(MemoryStore::new(), evaluator, mode)
}

pub(super) fn harness_over(
    store: MemoryStore,
    evaluator: ScriptedEvaluator,
    mode: EvaluationMode,
) -> Harness {
    let store = Arc::new(store);
    let evaluator = Arc::new(evaluator);
    let platform = InterviewPlatform::builder(store.clone(), evaluator.clone())
        .evaluation_mode(mode)
        .retry_pending_after(Duration::ZERO)
        .build();
    Harness {
        store,
        evaluator,
        platform,
        admin: Actor::admin(Uuid::new_v4()),
    }
}

pub(super) fn harness_mailing(mailer: Arc<RecordingMailer>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let evaluator = Arc::new(ScriptedEvaluator::default());
    let platform = InterviewPlatform::builder(store.clone(), evaluator.clone())
        .evaluation_mode(EvaluationMode::Inline)
        .retry_pending_after(Duration::ZERO)
        .with_mailer(mailer)
        .build();
    Harness {
        store,
        evaluator,
        platform,
        admin: Actor::admin(Uuid::new_v4()),
    }
}

/// Lets spawned activity and evaluation tasks run on the current-thread runtime.
pub(super) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub(super) fn draft(text: &str, difficulty: Difficulty, pinned: bool) -> QuestionDraft {
    QuestionDraft {
        text: text.to_string(),
        ideal_answer: format!("Ideal answer to: {}", text),
        difficulty,
        pinned,
    }
}

pub(super) fn pool_question(difficulty: Difficulty, position: u32, pinned: bool) -> Question {
    Question {
        id: Uuid::new_v4(),
        owner: QuestionOwner::Interview(Uuid::nil()),
        text: format!("{} question #{}", difficulty, position),
        ideal_answer: "ideal".to_string(),
        audio_url: None,
        difficulty,
        pinned,
        position,
    }
}

pub(super) fn answer(text: &str) -> SubmittedAnswer {
    SubmittedAnswer {
        transcript: Some(text.to_string()),
        audio_url: None,
    }
}

/// A domain with `count` questions in each of the given tiers and the given quotas.
pub(super) async fn seed_domain(
    h: &Harness,
    name: &str,
    tiers: &[(Difficulty, usize)],
    quotas: TierQuotas,
) -> Domain {
    let domain = h
        .platform
        .catalog
        .create_domain(&h.admin, name, None)
        .await
        .expect("domain created");
    for (tier, count) in tiers {
        for i in 0..*count {
            h.platform
                .catalog
                .create_question(
                    &h.admin,
                    domain.id,
                    draft(&format!("{} {} #{}", name, tier, i), *tier, false),
                )
                .await
                .expect("question created");
        }
    }
    h.platform
        .catalog
        .update_configuration(&h.admin, domain.id, quotas)
        .await
        .expect("configuration stored");
    domain
}

pub(super) async fn create_interview(
    h: &Harness,
    company: &Actor,
    questions: Vec<QuestionDraft>,
    quotas: Option<TierQuotas>,
    emails: &[&str],
) -> CreatedInterview {
    h.platform
        .company
        .create(
            company,
            CreateInterview {
                title: "Backend Engineer".to_string(),
                questions,
                questions_per_tier: quotas,
                candidate_emails: emails.iter().map(|e| e.to_string()).collect(),
            },
        )
        .await
        .expect("interview created")
}

pub(super) fn token_for(created: &CreatedInterview, email: &str) -> String {
    created
        .invitations
        .iter()
        .find(|i| i.candidate_email == email)
        .map(|i| i.token.clone())
        .expect("invitation for email")
}

pub(super) async fn candidate_session_count(h: &Harness, interview_id: Uuid) -> usize {
    h.store
        .list_interview_sessions(interview_id)
        .await
        .expect("sessions listed")
        .len()
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::common::*;
use crate::access::Actor;
use crate::domain::{Difficulty, Evaluation, EvaluationRequest, ResponseState, TierQuotas};
use crate::memory::MemoryStore;
use crate::platform::InterviewPlatform;
use crate::ports::{DatabaseService, EvaluationService, PortError, PortResult};
use crate::scoring::{EvaluationOutcome, ResultsStatus};
use crate::sessions::EvaluationMode;

async fn three_question_session(h: &Harness, user: &Actor) -> Uuid {
    let domain = seed_domain(
        h,
        "Systems",
        &[(Difficulty::E, 1), (Difficulty::C, 1), (Difficulty::A, 1)],
        TierQuotas::uniform(1),
    )
    .await;
    h.platform
        .sessions
        .start_practice(user, domain.id)
        .await
        .unwrap()
        .session
        .id
}

async fn answer_all(h: &Harness, user: &Actor, session_id: Uuid) {
    for order in 1..=3 {
        h.platform
            .sessions
            .submit_response(user, session_id, order, answer("my answer"))
            .await
            .expect("answer stored");
    }
}

#[tokio::test]
async fn aggregate_waits_for_every_score() {
    let h = harness_with(
        ScriptedEvaluator::scripted(vec![score(80.0), unavailable(), unavailable(), score(100.0)]),
        EvaluationMode::Inline,
    );
    let user = Actor::regular(Uuid::new_v4());
    let session_id = three_question_session(&h, &user).await;
    answer_all(&h, &user, session_id).await;

    let stored = h.store.get_session(session_id).await.unwrap();
    assert!(stored.is_completed);
    assert_eq!(stored.average_score, None);

    h.evaluator.push(unavailable());
    h.evaluator.push(unavailable());
    let processing = h.platform.sessions.results(&user, session_id).await.unwrap();
    assert_eq!(processing.status, ResultsStatus::Processing);
    assert_eq!(processing.pending_evaluations, 1);
    assert_eq!(processing.aggregate_score, None);
    assert_eq!(processing.breakdown[1].state, ResponseState::AwaitingEvaluation);

    settle().await;
    assert_eq!(h.evaluator.calls(), 6);

    h.evaluator.push(score(60.0));
    let requeued = h.platform.sessions.results(&user, session_id).await.unwrap();
    assert_eq!(requeued.status, ResultsStatus::Processing);
    settle().await;
    let complete = h.platform.sessions.results(&user, session_id).await.unwrap();
    assert_eq!(complete.status, ResultsStatus::Complete);
    assert_eq!(complete.pending_evaluations, 0);
    assert_eq!(complete.aggregate_score, Some(80.0));
    assert_eq!(
        h.store.get_session(session_id).await.unwrap().average_score,
        Some(80.0)
    );
    assert_eq!(h.evaluator.calls(), 7);
}

#[tokio::test]
async fn aggregate_is_not_recomputed_once_stored() {
    let h = harness();
    let user = Actor::regular(Uuid::new_v4());
    let session_id = three_question_session(&h, &user).await;
    answer_all(&h, &user, session_id).await;

    let first = h.platform.sessions.results(&user, session_id).await.unwrap();
    let calls = h.evaluator.calls();
    let again = h.platform.sessions.results(&user, session_id).await.unwrap();

    assert_eq!(first.aggregate_score, Some(80.0));
    assert_eq!(again.aggregate_score, first.aggregate_score);
    assert_eq!(h.evaluator.calls(), calls);
    assert!(!h.store.finalize_session_score(session_id, 10.0).await.unwrap());
}

#[tokio::test]
async fn transient_failure_is_retried_once() {
    let h = harness_with(
        ScriptedEvaluator::scripted(vec![unavailable(), score(70.0)]),
        EvaluationMode::Inline,
    );
    let user = Actor::regular(Uuid::new_v4());
    let session_id = three_question_session(&h, &user).await;

    let receipt = h
        .platform
        .sessions
        .submit_response(&user, session_id, 1, answer("my answer"))
        .await
        .unwrap();

    assert_eq!(receipt.evaluation, Some(EvaluationOutcome::Scored(70)));
    assert_eq!(h.evaluator.calls(), 2);
}

#[tokio::test]
async fn permanent_failure_leaves_the_response_pending() {
    let h = harness_with(
        ScriptedEvaluator::scripted(vec![Err(PortError::Unexpected("bad payload".to_string()))]),
        EvaluationMode::Inline,
    );
    let user = Actor::regular(Uuid::new_v4());
    let session_id = three_question_session(&h, &user).await;

    let receipt = h
        .platform
        .sessions
        .submit_response(&user, session_id, 1, answer("my answer"))
        .await
        .expect("evaluation failures never fail the submission");

    assert_eq!(receipt.evaluation, Some(EvaluationOutcome::Pending));
    assert_eq!(h.evaluator.calls(), 1);
    let stored = h.store.list_responses(session_id).await.unwrap();
    assert_eq!(stored[0].score, None);
    assert_eq!(stored[0].state(), ResponseState::AwaitingEvaluation);
}

#[tokio::test]
async fn out_of_range_scores_are_clamped() {
    let h = harness_with(
        ScriptedEvaluator::scripted(vec![score(140.0), score(-5.0)]),
        EvaluationMode::Inline,
    );
    let user = Actor::regular(Uuid::new_v4());
    let session_id = three_question_session(&h, &user).await;
    for order in 1..=2 {
        h.platform
            .sessions
            .submit_response(&user, session_id, order, answer("my answer"))
            .await
            .unwrap();
    }

    let scores: Vec<_> = h
        .store
        .list_responses(session_id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.score)
        .collect();
    assert_eq!(scores, vec![Some(100), Some(0)]);
}

#[tokio::test]
async fn in_progress_results_show_unanswered_questions() {
    let h = harness();
    let user = Actor::regular(Uuid::new_v4());
    let session_id = three_question_session(&h, &user).await;
    h.platform
        .sessions
        .submit_response(&user, session_id, 1, answer("my answer"))
        .await
        .unwrap();

    let results = h.platform.sessions.results(&user, session_id).await.unwrap();
    assert_eq!(results.status, ResultsStatus::InProgress);
    assert_eq!(results.answered, 1);
    assert_eq!(results.aggregate_score, None);
    let states: Vec<_> = results.breakdown.iter().map(|b| b.state).collect();
    assert_eq!(
        states,
        vec![
            ResponseState::Evaluated,
            ResponseState::AwaitingAudio,
            ResponseState::AwaitingAudio
        ]
    );
}

#[tokio::test]
async fn background_evaluation_is_pollable() {
    let h = harness_with(ScriptedEvaluator::default(), EvaluationMode::Background);
    let user = Actor::regular(Uuid::new_v4());
    let session_id = three_question_session(&h, &user).await;

    let receipt = h
        .platform
        .sessions
        .submit_response(&user, session_id, 1, answer("my answer"))
        .await
        .unwrap();
    assert_eq!(receipt.evaluation, None);
    for order in 2..=3 {
        h.platform
            .sessions
            .submit_response(&user, session_id, order, answer("my answer"))
            .await
            .unwrap();
    }
    settle().await;

    assert!(h
        .store
        .list_responses(session_id)
        .await
        .unwrap()
        .iter()
        .all(|r| r.score == Some(80)));
    let results = h.platform.sessions.results(&user, session_id).await.unwrap();
    assert_eq!(results.status, ResultsStatus::Complete);
    assert_eq!(results.aggregate_score, Some(80.0));
    assert_eq!(h.evaluator.calls(), 3);
}

/// Answers after a short delay, counting started and finished calls.
#[derive(Default)]
struct SlowEvaluator {
    started: AtomicUsize,
    finished: AtomicUsize,
}

#[async_trait]
impl EvaluationService for SlowEvaluator {
    async fn evaluate(&self, _request: &EvaluationRequest) -> PortResult<Evaluation> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        score(90.0)
    }
}

#[tokio::test]
async fn polling_neither_waits_for_nor_repeats_running_evaluations() {
    let store = Arc::new(MemoryStore::new());
    let evaluator = Arc::new(SlowEvaluator::default());
    let platform = InterviewPlatform::builder(store.clone(), evaluator.clone())
        .evaluation_mode(EvaluationMode::Background)
        .retry_pending_after(Duration::ZERO)
        .build();
    let admin = Actor::admin(Uuid::new_v4());
    let user = Actor::regular(Uuid::new_v4());

    let domain = platform
        .catalog
        .create_domain(&admin, "Networking", None)
        .await
        .unwrap();
    for text in ["What is TCP?", "What is UDP?"] {
        platform
            .catalog
            .create_question(&admin, domain.id, draft(text, Difficulty::E, false))
            .await
            .unwrap();
    }
    platform
        .catalog
        .update_configuration(
            &admin,
            domain.id,
            TierQuotas {
                e: 2,
                d: 0,
                c: 0,
                b: 0,
                a: 0,
            },
        )
        .await
        .unwrap();
    let session_id = platform
        .sessions
        .start_practice(&user, domain.id)
        .await
        .unwrap()
        .session
        .id;
    for order in 1..=2 {
        platform
            .sessions
            .submit_response(&user, session_id, order, answer("my answer"))
            .await
            .unwrap();
    }

    for _ in 0..3 {
        let polled = platform.sessions.results(&user, session_id).await.unwrap();
        assert_eq!(polled.status, ResultsStatus::Processing);
        assert_eq!(polled.pending_evaluations, 2);
    }
    assert_eq!(evaluator.finished.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let results = platform.sessions.results(&user, session_id).await.unwrap();
    assert_eq!(results.status, ResultsStatus::Complete);
    assert_eq!(results.aggregate_score, Some(90.0));
    assert_eq!(evaluator.started.load(Ordering::SeqCst), 2);
    assert!(store
        .list_responses(session_id)
        .await
        .unwrap()
        .iter()
        .all(|r| r.score == Some(90)));
}

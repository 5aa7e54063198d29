//! crates/interview_core/src/scoring.rs
//!
//! Scores individual responses through the evaluation collaborator and rolls
//! them up into the session aggregate.

use chrono::{TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    response_state, Evaluation, EvaluationRequest, Response, ResponseState, Session,
};
use crate::error::InterviewResult;
use crate::ports::{DatabaseService, EvaluationService, PortError, PortResult};

/// What happened when a single response was sent for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    Scored(u8),
    /// Somebody else wrote the score first.
    AlreadyScored,
    /// Another task of this process is evaluating the response right now.
    InFlight,
    /// The collaborator failed; the response stays in `AwaitingEvaluation`.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultsStatus {
    /// Some planned questions are still unanswered.
    InProgress,
    /// Every question is answered but at least one evaluation is outstanding.
    Processing,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBreakdown {
    pub order: u32,
    pub question_id: Uuid,
    pub question_text: String,
    pub ideal_answer: String,
    pub audio_url: Option<String>,
    pub transcript: Option<String>,
    pub feedback: Option<String>,
    pub score: Option<u8>,
    pub state: ResponseState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionResults {
    pub session_id: Uuid,
    pub status: ResultsStatus,
    pub total_questions: u32,
    pub answered: usize,
    pub pending_evaluations: usize,
    /// Only present once the session is complete and every response is scored.
    pub aggregate_score: Option<f64>,
    pub breakdown: Vec<ResponseBreakdown>,
}

/// Mean of the response scores, or `None` while any response is unscored.
pub fn aggregate_score(responses: &[Response]) -> Option<f64> {
    if responses.is_empty() {
        return None;
    }
    let mut total = 0.0;
    for response in responses {
        total += f64::from(response.score?);
    }
    Some(total / responses.len() as f64)
}

/// How long a pending response is left alone before a poll re-queues it.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Response ids currently being evaluated by this process.
type InFlightSet = Arc<Mutex<HashSet<Uuid>>>;

/// Holds a response id in the in-flight set until dropped.
struct InFlightClaim {
    set: InFlightSet,
    response_id: Uuid,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.response_id);
        }
    }
}

#[derive(Clone)]
pub struct ScoringAggregator {
    db: Arc<dyn DatabaseService>,
    evaluator: Arc<dyn EvaluationService>,
    in_flight: InFlightSet,
    retry_after: TimeDelta,
}

impl ScoringAggregator {
    pub fn new(db: Arc<dyn DatabaseService>, evaluator: Arc<dyn EvaluationService>) -> Self {
        Self {
            db,
            evaluator,
            in_flight: Arc::default(),
            retry_after: TimeDelta::from_std(DEFAULT_RETRY_AFTER).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Minimum age of a pending response before `results` sends it to the evaluator again.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = TimeDelta::from_std(retry_after).unwrap_or(TimeDelta::MAX);
        self
    }

    fn claim(&self, response_id: Uuid) -> Option<InFlightClaim> {
        let mut set = self.in_flight.lock().ok()?;
        set.insert(response_id).then(|| InFlightClaim {
            set: self.in_flight.clone(),
            response_id,
        })
    }

    fn is_in_flight(&self, response_id: Uuid) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(&response_id))
            .unwrap_or(false)
    }

    /// Evaluates the response on a background task.
    ///
    /// The response counts as in flight from the moment this returns, so a
    /// poll arriving before the task starts does not evaluate it twice.
    pub fn spawn_evaluation(&self, response_id: Uuid) {
        let Some(claim) = self.claim(response_id) else {
            return;
        };
        let scoring = self.clone();
        tokio::spawn(async move {
            if let Err(e) = scoring.evaluate_claimed(response_id, claim).await {
                warn!("Background evaluation of response {} failed: {}", response_id, e);
            }
        });
    }

    /// Sends one response to the evaluator and stores the result.
    ///
    /// Collaborator failures never surface as errors: the response is left
    /// pending and a later `results` call re-queues it.
    pub async fn evaluate_response(&self, response_id: Uuid) -> InterviewResult<EvaluationOutcome> {
        match self.claim(response_id) {
            Some(claim) => self.evaluate_claimed(response_id, claim).await,
            None => Ok(EvaluationOutcome::InFlight),
        }
    }

    async fn evaluate_claimed(
        &self,
        response_id: Uuid,
        _claim: InFlightClaim,
    ) -> InterviewResult<EvaluationOutcome> {
        let response = self.db.get_response(response_id).await?;
        if response.score.is_some() {
            return Ok(EvaluationOutcome::AlreadyScored);
        }
        let question = self.db.get_question(response.question_id).await?;

        let request = EvaluationRequest {
            question_id: question.id,
            question_text: question.text,
            ideal_answer: question.ideal_answer,
            transcript: response.transcript.clone(),
            audio_url: response.audio_url.clone(),
        };

        let evaluation = match self.call_with_retry(&request).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(
                    "Evaluation of response {} (session {}) failed, leaving it pending: {}",
                    response.id, response.session_id, e
                );
                return Ok(EvaluationOutcome::Pending);
            }
        };

        let score = evaluation.score;
        if !self.db.record_evaluation(response.id, evaluation).await? {
            return Ok(EvaluationOutcome::AlreadyScored);
        }
        info!(
            "Response {} of session {} scored {}.",
            response.id, response.session_id, score
        );

        self.finalize_if_ready(response.session_id).await?;
        Ok(EvaluationOutcome::Scored(score))
    }

    /// At most one retry, and only for transient failures.
    async fn call_with_retry(&self, request: &EvaluationRequest) -> PortResult<Evaluation> {
        match self.evaluator.evaluate(request).await {
            Err(PortError::Unavailable(msg)) => {
                warn!(
                    "Evaluator unavailable for question {} ({}), retrying once.",
                    request.question_id, msg
                );
                self.evaluator.evaluate(request).await
            }
            other => other,
        }
    }

    /// Stores the session aggregate once the session is completed and every
    /// response carries a score. The first stored value is permanent.
    pub async fn finalize_if_ready(&self, session_id: Uuid) -> InterviewResult<Option<f64>> {
        let session = self.db.get_session(session_id).await?;
        if !session.is_completed {
            return Ok(None);
        }
        if session.average_score.is_some() {
            return Ok(session.average_score);
        }

        let responses = self.db.list_responses(session_id).await?;
        if (responses.len() as u32) < session.question_count {
            return Ok(None);
        }
        let Some(mean) = aggregate_score(&responses) else {
            return Ok(None);
        };

        if self.db.finalize_session_score(session_id, mean).await? {
            info!("Session {} finalized with aggregate score {:.1}.", session_id, mean);
            Ok(Some(mean))
        } else {
            // Lost the race; report whatever was stored first.
            Ok(self.db.get_session(session_id).await?.average_score)
        }
    }

    /// Reports the per-question breakdown as it stands. A session still being
    /// scored is `Processing`, never an error.
    ///
    /// Pending responses nobody is evaluating and older than the retry delay
    /// are re-queued in the background; the report never waits for them.
    pub async fn results(&self, session: &Session) -> InterviewResult<SessionResults> {
        let responses = self.db.list_responses(session.id).await?;

        let now = Utc::now();
        let stale: Vec<Uuid> = responses
            .iter()
            .filter(|r| r.score.is_none())
            .filter(|r| now - r.submitted_at >= self.retry_after)
            .filter(|r| !self.is_in_flight(r.id))
            .map(|r| r.id)
            .collect();
        if !stale.is_empty() {
            info!(
                "Re-queueing {} stale evaluations for session {}.",
                stale.len(),
                session.id
            );
            for response_id in stale {
                self.spawn_evaluation(response_id);
            }
        }

        let session = self.db.get_session(session.id).await?;
        let aggregate = match session.average_score {
            Some(score) => Some(score),
            None => self.finalize_if_ready(session.id).await?,
        };

        let plan = self.db.session_plan(session.id).await?;
        let breakdown = plan
            .into_iter()
            .map(|entry| {
                let response = responses.iter().find(|r| r.order == entry.order);
                ResponseBreakdown {
                    order: entry.order,
                    question_id: entry.question.id,
                    question_text: entry.question.text,
                    ideal_answer: entry.question.ideal_answer,
                    audio_url: response.and_then(|r| r.audio_url.clone()),
                    transcript: response.and_then(|r| r.transcript.clone()),
                    feedback: response.and_then(|r| r.feedback.clone()),
                    score: response.and_then(|r| r.score),
                    state: response_state(response),
                }
            })
            .collect();

        let pending_evaluations = responses.iter().filter(|r| r.score.is_none()).count();
        let status = if !session.is_completed {
            ResultsStatus::InProgress
        } else if pending_evaluations > 0 || aggregate.is_none() {
            ResultsStatus::Processing
        } else {
            ResultsStatus::Complete
        };

        Ok(SessionResults {
            session_id: session.id,
            status,
            total_questions: session.question_count,
            answered: responses.len(),
            pending_evaluations,
            aggregate_score: if status == ResultsStatus::Complete {
                aggregate
            } else {
                None
            },
            breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn scored(order: u32, score: Option<u8>) -> Response {
        Response {
            id: Uuid::new_v4(),
            session_id: Uuid::nil(),
            question_id: Uuid::new_v4(),
            order,
            audio_url: None,
            transcript: Some("answer".to_string()),
            feedback: score.map(|_| "ok".to_string()),
            score,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn aggregate_is_the_mean_of_all_scores() {
        let responses = vec![scored(1, Some(80)), scored(2, Some(60)), scored(3, Some(100))];
        assert_eq!(aggregate_score(&responses), Some(80.0));
    }

    #[test]
    fn aggregate_is_unavailable_while_any_score_is_missing() {
        let responses = vec![scored(1, Some(80)), scored(2, None)];
        assert_eq!(aggregate_score(&responses), None);
        assert_eq!(aggregate_score(&[]), None);
    }
}

//! services/api/src/adapters/evaluation_http.rs
//!
//! This module contains the adapter for the standalone evaluation service.
//! It implements the `EvaluationService` port from the `core` crate by POSTing
//! each answer to `{base_url}/evaluate`.

use async_trait::async_trait;
use interview_core::{
    domain::{Evaluation, EvaluationRequest},
    ports::{EvaluationService, PortError, PortResult},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// Wire Format
//=========================================================================================

#[derive(Serialize)]
struct EvaluatePayload<'a> {
    question_text: &'a str,
    ideal_answer: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct EvaluateReply {
    score: f64,
    feedback: String,
    #[serde(default)]
    transcription: Option<String>,
}

impl From<EvaluateReply> for Evaluation {
    fn from(reply: EvaluateReply) -> Self {
        Evaluation::from_raw(reply.feedback, reply.score, reply.transcription)
    }
}

/// Server-side failures are worth one more attempt; client-side ones are not.
fn status_error(status: StatusCode, body: &str) -> PortError {
    let message = format!("evaluation service answered {}: {}", status, body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PortError::Unavailable(message)
    } else {
        PortError::Unexpected(message)
    }
}

fn transport_error(err: reqwest::Error) -> PortError {
    if err.is_timeout() || err.is_connect() {
        PortError::Unavailable(err.to_string())
    } else {
        PortError::Unexpected(err.to_string())
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `EvaluationService` over HTTP.
#[derive(Clone)]
pub struct HttpEvaluationAdapter {
    client: Client,
    endpoint: String,
}

impl HttpEvaluationAdapter {
    /// Creates a new `HttpEvaluationAdapter` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/evaluate", base_url.trim_end_matches('/')),
        })
    }
}

//=========================================================================================
// `EvaluationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EvaluationService for HttpEvaluationAdapter {
    async fn evaluate(&self, request: &EvaluationRequest) -> PortResult<Evaluation> {
        let payload = EvaluatePayload {
            question_text: &request.question_text,
            ideal_answer: &request.ideal_answer,
            transcript: request.transcript.as_deref(),
            audio_url: request.audio_url.as_deref(),
        };
        debug!("Evaluating answer to question {}", request.question_id);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let reply: EvaluateReply = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed evaluation reply: {}", e)))?;
        Ok(reply.into())
    }
}

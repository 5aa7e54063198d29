//! services/api/src/adapters/openai_eval.rs
//!
//! This module contains the adapter that scores answers with a chat model.
//! It implements the `EvaluationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use interview_core::{
    domain::{Evaluation, EvaluationRequest},
    ports::{EvaluationService, PortError, PortResult},
};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are an interview evaluation assistant. Compare the candidate's \
response with the ideal answer and reply with ONLY a JSON object of the form \
{\"score\": <number between 0 and 100>, \"feedback\": \"<detailed analysis>\"}. \
No markdown and no additional text.";

#[derive(Deserialize)]
struct ModelVerdict {
    score: f64,
    feedback: String,
}

/// Pulls the JSON object out of the model's reply, tolerating code fences.
fn parse_verdict(content: &str) -> PortResult<ModelVerdict> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(PortError::Unexpected(format!(
                "Evaluation model returned no JSON object: {}",
                content
            )))
        }
    };
    serde_json::from_str(json)
        .map_err(|e| PortError::Unexpected(format!("Malformed evaluation JSON: {}", e)))
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `EvaluationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiEvaluationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEvaluationAdapter {
    /// Creates a new `OpenAiEvaluationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `EvaluationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EvaluationService for OpenAiEvaluationAdapter {
    async fn evaluate(&self, request: &EvaluationRequest) -> PortResult<Evaluation> {
        // A chat model cannot listen; audio-only answers must be transcribed upstream.
        let transcript = request
            .transcript
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                PortError::Unexpected("Answer has no transcript to evaluate".to_string())
            })?;

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "QUESTION: {}\n\nIDEAL ANSWER: {}\n\nCANDIDATE RESPONSE: {}",
                    request.question_text, request.ideal_answer, transcript
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| match e {
                OpenAIError::Reqwest(inner) => PortError::Unavailable(inner.to_string()),
                other => PortError::Unexpected(other.to_string()),
            })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Evaluation model returned no content.".to_string())
            })?;

        let verdict = parse_verdict(&content)?;
        Ok(Evaluation::from_raw(verdict.feedback, verdict.score, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_is_found_inside_code_fences() {
        let verdict =
            parse_verdict("```json\n{\"score\": 72, \"feedback\": \"Mostly right\"}\n```").unwrap();
        assert_eq!(verdict.score, 72.0);
        assert_eq!(verdict.feedback, "Mostly right");
    }

    #[test]
    fn prose_without_json_is_rejected() {
        assert!(matches!(
            parse_verdict("I think this deserves a 7"),
            Err(PortError::Unexpected(_))
        ));
    }
}

//! services/api/src/adapters/sst.rs
//!
//! This module contains the adapter for OpenAI's Speech-to-Text (Whisper) service.
//! It implements the `SpeechToTextService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::audio::{AudioInput, CreateTranscriptionRequest},
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use interview_core::ports::{PortError, PortResult, SpeechToTextService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SpeechToTextService` port using the OpenAI Whisper API.
#[derive(Clone)]
pub struct OpenAiSstAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSstAdapter {
    /// Creates a new `OpenAiSstAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `SpeechToTextService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechToTextService for OpenAiSstAdapter {
    /// Transcribes an uploaded recording. Whisper infers the container from the file name.
    async fn transcribe_audio(&self, audio_data: &[u8], file_name: &str) -> PortResult<String> {
        if audio_data.is_empty() {
            return Err(PortError::Unexpected("Cannot transcribe an empty recording".to_string()));
        }
        let input = AudioInput::from_vec_u8(file_name.to_string(), audio_data.to_vec());

        let request = CreateTranscriptionRequest {
            file: input,
            model: self.model.clone(),
            ..Default::default()
        };

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e: OpenAIError| match e {
                OpenAIError::Reqwest(inner) => PortError::Unavailable(inner.to_string()),
                other => PortError::Unexpected(other.to_string()),
            })?;

        Ok(response.text)
    }
}

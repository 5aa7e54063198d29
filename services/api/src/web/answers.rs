//! services/api/src/web/answers.rs
//!
//! Turns a multipart answer upload into a recorded response. Nothing is stored
//! or transcribed until the session has accepted the answer's position.

use axum::extract::Multipart;
use bytes::Bytes;
use interview_core::{domain::SubmittedAnswer, sessions::SubmitReceipt, Actor};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapters::storage::audio_extension;
use crate::error::ApiError;
use crate::web::state::AppState;

/// The raw parts of an answer upload.
#[derive(Debug, Default)]
pub struct AnswerUpload {
    pub order: Option<u32>,
    pub transcript: Option<String>,
    pub audio: Option<(String, Bytes)>,
}

/// Reads the `order`, `transcript` and `audio` parts. Unknown parts are ignored.
pub async fn read_answer(mut multipart: Multipart) -> Result<AnswerUpload, ApiError> {
    let mut upload = AnswerUpload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "order" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
                let order = raw.trim().parse::<u32>().map_err(|_| {
                    ApiError::validation(format!("'{}' is not a valid question order", raw))
                })?;
                upload.order = Some(order);
            }
            "transcript" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
                upload.transcript = Some(text);
            }
            "audio" => {
                let name = field.file_name().unwrap_or("answer.webm").to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::validation(format!("Failed to read audio bytes: {}", e))
                })?;
                if !data.is_empty() {
                    upload.audio = Some((name, data));
                }
            }
            other => debug!("Ignoring unexpected multipart field '{}'", other),
        }
    }
    Ok(upload)
}

impl AnswerUpload {
    fn order(&self) -> Result<u32, ApiError> {
        self.order
            .ok_or_else(|| ApiError::validation("The 'order' field is required"))
    }
}

/// Checks, stores, transcribes and submits one answer for `actor`.
///
/// The session checks run before the recording touches storage or the
/// transcriber. If the final submission still fails, the stored file is removed.
pub async fn submit_answer(
    state: &AppState,
    actor: &Actor,
    session_id: Uuid,
    upload: AnswerUpload,
) -> Result<SubmitReceipt, ApiError> {
    let order = upload.order()?;
    if let Some((file_name, _)) = &upload.audio {
        if audio_extension(file_name).is_none() {
            return Err(ApiError::validation(format!(
                "Unsupported audio file '{}'",
                file_name
            )));
        }
    }
    state
        .platform
        .sessions
        .check_submittable(actor, session_id, order)
        .await?;

    let answer = prepare_answer(state, upload).await?;
    let stored_audio = answer.audio_url.clone();
    match state
        .platform
        .sessions
        .submit_response(actor, session_id, order, answer)
        .await
    {
        Ok(receipt) => Ok(receipt),
        Err(e) => {
            if let Some(url) = stored_audio {
                if let Err(cleanup) = state.storage.delete_audio(&url).await {
                    warn!("Could not remove audio of a rejected answer ({}): {}", url, cleanup);
                }
            }
            Err(e.into())
        }
    }
}

/// Stores the recording and, best effort, transcribes it.
///
/// A failed transcription only costs the transcript: the audio URL still goes
/// to the evaluator, which can transcribe it itself.
async fn prepare_answer(state: &AppState, upload: AnswerUpload) -> Result<SubmittedAnswer, ApiError> {
    let mut answer = SubmittedAnswer {
        transcript: upload.transcript,
        audio_url: None,
    };

    if let Some((file_name, data)) = upload.audio {
        let ext = audio_extension(&file_name).ok_or_else(|| {
            ApiError::validation(format!("Unsupported audio file '{}'", file_name))
        })?;
        let url = state.storage.save_audio(&data, &ext).await?;
        answer.audio_url = Some(url);

        let has_transcript = answer
            .transcript
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if let (false, Some(transcriber)) = (has_transcript, &state.transcriber) {
            match transcriber.transcribe_audio(&data, &file_name).await {
                Ok(text) => answer.transcript = Some(text),
                Err(e) => warn!("Transcription failed, keeping audio only: {}", e),
            }
        }
    }
    Ok(answer)
}

//! crates/interview_core/src/narration.rs
//!
//! Fills in the spoken version of newly authored questions.

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::ports::{AudioStorage, DatabaseService, PortResult, TextToSpeechService};

#[derive(Clone)]
pub struct QuestionNarrator {
    tts: Arc<dyn TextToSpeechService>,
    storage: Arc<dyn AudioStorage>,
    db: Arc<dyn DatabaseService>,
}

impl QuestionNarrator {
    pub fn new(
        tts: Arc<dyn TextToSpeechService>,
        storage: Arc<dyn AudioStorage>,
        db: Arc<dyn DatabaseService>,
    ) -> Self {
        Self { tts, storage, db }
    }

    /// Synthesizes, stores and attaches the audio for one question.
    pub async fn narrate(&self, question_id: Uuid, text: &str) -> PortResult<String> {
        let audio = self.tts.generate_audio(text).await?;
        let url = self.storage.save_audio(&audio, "mp3").await?;
        self.db.set_question_audio(question_id, &url).await?;
        Ok(url)
    }

    /// A "fire-and-forget" narration. On failure the question simply keeps no audio.
    pub fn narrate_in_background(&self, question_id: Uuid, text: String) {
        let narrator = self.clone();
        tokio::spawn(async move {
            match narrator.narrate(question_id, &text).await {
                Ok(url) => info!("Narrated question {} at {}.", question_id, url),
                Err(e) => error!("Failed to narrate question {}: {}", question_id, e),
            }
        });
    }
}

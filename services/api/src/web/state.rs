//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use interview_core::{
    ports::{AudioStorage, SpeechToTextService},
    InterviewPlatform,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub platform: InterviewPlatform,
    pub config: Arc<Config>,
    /// Audio answers are transcribed before evaluation when present.
    pub transcriber: Option<Arc<dyn SpeechToTextService>>,
    pub storage: Arc<dyn AudioStorage>,
}

impl AppState {
    pub fn candidate_link(&self, token: &str) -> String {
        self.config.candidate_link(token)
    }
}

pub mod access;
pub mod activity;
pub mod catalog;
pub mod company;
pub mod domain;
pub mod error;
pub mod invitations;
pub mod memory;
pub mod narration;
pub mod platform;
pub mod ports;
pub mod scoring;
pub mod selector;
pub mod sessions;

#[cfg(test)]
mod tests;

pub use access::{Actor, Role};
pub use error::{InterviewError, InterviewResult};
pub use platform::InterviewPlatform;
pub use ports::{
    AudioStorage, DatabaseService, EvaluationService, InvitationMailer, PortError, PortResult,
    SpeechToTextService, TextToSpeechService,
};
pub use sessions::EvaluationMode;

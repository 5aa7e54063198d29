//! crates/interview_core/src/error.rs
//!
//! Error taxonomy shared by every core service.

use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterviewError {
    /// Malformed input, rejected before any write.
    #[error("{0}")]
    Validation(String),

    /// Missing resource, or one owned by somebody else. Deliberately indistinguishable.
    #[error("Resource not found or access denied")]
    NotFoundOrDenied,

    /// The actor's role may not call this operation at all.
    #[error("This operation is not available to your role")]
    Forbidden,

    #[error("No questions are available for this interview")]
    EmptyQuestionPool,

    #[error("Invalid or expired interview link")]
    InvalidToken,

    #[error("This interview link has already been used")]
    AlreadyUsed,

    #[error("Email does not match the invitation")]
    EmailMismatch,

    #[error("This interview is no longer accepting candidates")]
    InterviewClosed,

    #[error("Session is already completed")]
    SessionAlreadyCompleted,

    #[error("A response for question {0} was already submitted")]
    DuplicateOrder(u32),

    #[error("Answer questions in order: expected question {expected}, got {got}")]
    OutOfOrder { expected: u32, got: u32 },

    #[error("No more questions to answer")]
    NoMoreQuestions,

    #[error("{0}")]
    Conflict(String),

    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PortError> for InterviewError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(_) => InterviewError::NotFoundOrDenied,
            PortError::Conflict(msg) | PortError::AlreadyClaimed(msg) => {
                InterviewError::Conflict(msg)
            }
            PortError::Unavailable(msg) => InterviewError::UpstreamUnavailable(msg),
            PortError::Unexpected(msg) => InterviewError::Internal(msg),
        }
    }
}

pub type InterviewResult<T> = Result<T, InterviewError>;

pub mod db;
pub mod evaluation_http;
pub mod mailer;
pub mod openai_eval;
pub mod sst;
pub mod storage;
pub mod tts;

pub use db::DbAdapter;
pub use evaluation_http::HttpEvaluationAdapter;
pub use mailer::{ConsoleMailer, SendGridMailer};
pub use openai_eval::OpenAiEvaluationAdapter;
pub use sst::OpenAiSstAdapter;
pub use storage::LocalAudioStorage;
pub use tts::OpenAiTtsAdapter;

//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use crate::adapters::mailer::SENDGRID_API_URL;
use interview_core::EvaluationMode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use validator::ValidateEmail;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which collaborator scores answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluatorKind {
    /// The standalone evaluation service reached over HTTP.
    Http,
    /// A chat model prompted directly through OpenAI.
    OpenAi,
}

/// How invitation emails leave the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailerKind {
    /// Written to the log only.
    Console,
    /// Posted to SendGrid's mail API.
    SendGrid,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub db_max_connections: u32,
    pub cors_origin: String,
    pub evaluator: EvaluatorKind,
    pub evaluation_service_url: String,
    pub evaluation_timeout: Duration,
    pub evaluation_mode: EvaluationMode,
    pub openai_api_key: Option<String>,
    pub stt_model: String,
    pub eval_model: String,
    pub tts_voice: String,
    pub audio_storage_dir: PathBuf,
    pub audio_public_base_url: String,
    pub candidate_link_base_url: String,
    pub mailer: MailerKind,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_api_url: String,
    pub mail_sender_email: String,
    pub mail_sender_name: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address = var_or("BIND_ADDRESS", "0.0.0.0:3000")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let db_max_connections = parse_number("DB_MAX_CONNECTIONS", &var_or("DB_MAX_CONNECTIONS", "5"))?;
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:5173");

        // --- Evaluation Settings ---
        let evaluator = match var_or("EVALUATOR", "http").to_lowercase().as_str() {
            "http" => EvaluatorKind::Http,
            "openai" => EvaluatorKind::OpenAi,
            other => {
                return Err(ConfigError::InvalidValue(
                    "EVALUATOR".to_string(),
                    format!("'{}' is not one of 'http' or 'openai'", other),
                ))
            }
        };
        let evaluation_service_url = var_or("EVALUATION_SERVICE_URL", "http://localhost:8000")
            .trim_end_matches('/')
            .to_string();
        let evaluation_timeout = Duration::from_secs(parse_number(
            "EVALUATION_TIMEOUT_SECS",
            &var_or("EVALUATION_TIMEOUT_SECS", "30"),
        )?);
        let evaluation_mode = match var_or("EVALUATION_MODE", "background").to_lowercase().as_str() {
            "background" => EvaluationMode::Background,
            "inline" => EvaluationMode::Inline,
            other => {
                return Err(ConfigError::InvalidValue(
                    "EVALUATION_MODE".to_string(),
                    format!("'{}' is not one of 'background' or 'inline'", other),
                ))
            }
        };

        // --- Load API Keys (as optional) ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        if evaluator == EvaluatorKind::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }

        // --- Load Adapter-specific Settings ---
        let stt_model = var_or("STT_MODEL", "whisper-1");
        let eval_model = var_or("EVAL_MODEL", "gpt-4o-mini");
        let tts_voice = var_or("TTS_VOICE", "alloy");

        // --- Audio & Links ---
        let audio_storage_dir = PathBuf::from(var_or("AUDIO_STORAGE_DIR", "./uploads/audio"));
        let audio_public_base_url = var_or("AUDIO_PUBLIC_BASE_URL", "http://localhost:3000/audio")
            .trim_end_matches('/')
            .to_string();
        let candidate_link_base_url = var_or(
            "CANDIDATE_LINK_BASE_URL",
            "http://localhost:5173/candidate-interview",
        )
        .trim_end_matches('/')
        .to_string();

        // --- Invitation Email ---
        let mailer = match var_or("MAIL_PROVIDER", "console").to_lowercase().as_str() {
            "console" => MailerKind::Console,
            "sendgrid" => MailerKind::SendGrid,
            other => {
                return Err(ConfigError::InvalidValue(
                    "MAIL_PROVIDER".to_string(),
                    format!("'{}' is not one of 'console' or 'sendgrid'", other),
                ))
            }
        };
        let sendgrid_api_key = lookup("SENDGRID_API_KEY").filter(|k| !k.trim().is_empty());
        if mailer == MailerKind::SendGrid && sendgrid_api_key.is_none() {
            return Err(ConfigError::MissingVar("SENDGRID_API_KEY".to_string()));
        }
        let sendgrid_api_url = var_or("SENDGRID_API_URL", SENDGRID_API_URL);
        let mail_sender_email = var_or("MAIL_SENDER_EMAIL", "no-reply@localhost");
        if mailer == MailerKind::SendGrid && !mail_sender_email.validate_email() {
            return Err(ConfigError::InvalidValue(
                "MAIL_SENDER_EMAIL".to_string(),
                format!("'{}' is not a valid email address", mail_sender_email),
            ));
        }
        let mail_sender_name = var_or("MAIL_SENDER_NAME", "Interview Practice");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            db_max_connections,
            cors_origin,
            evaluator,
            evaluation_service_url,
            evaluation_timeout,
            evaluation_mode,
            openai_api_key,
            stt_model,
            eval_model,
            tts_voice,
            audio_storage_dir,
            audio_public_base_url,
            candidate_link_base_url,
            mailer,
            sendgrid_api_key,
            sendgrid_api_url,
            mail_sender_email,
            mail_sender_name,
        })
    }

    /// The link a candidate opens to start their interview.
    pub fn candidate_link(&self, token: &str) -> String {
        format!("{}/{}", self.candidate_link_base_url, token)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("'{}' is not a valid number", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/interviews")]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.evaluator, EvaluatorKind::Http);
        assert_eq!(config.evaluation_mode, EvaluationMode::Background);
        assert_eq!(config.evaluation_timeout, Duration::from_secs(30));
        assert_eq!(config.db_max_connections, 5);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.mailer, MailerKind::Console);
        assert_eq!(config.sendgrid_api_url, SENDGRID_API_URL);
        assert_eq!(
            config.candidate_link("abc"),
            "http://localhost:5173/candidate-interview/abc"
        );
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(var)) if var == "DATABASE_URL"));
    }

    #[test]
    fn unknown_evaluation_mode_is_rejected() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/interviews"),
            ("EVALUATION_MODE", "eventually"),
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidValue(var, _)) if var == "EVALUATION_MODE"));
    }

    #[test]
    fn openai_evaluator_needs_a_key() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/interviews"),
            ("EVALUATOR", "openai"),
        ]);
        assert!(matches!(result, Err(ConfigError::MissingVar(var)) if var == "OPENAI_API_KEY"));

        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/interviews"),
            ("EVALUATOR", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("EVALUATION_MODE", "inline"),
        ])
        .unwrap();
        assert_eq!(config.evaluator, EvaluatorKind::OpenAi);
        assert_eq!(config.evaluation_mode, EvaluationMode::Inline);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/interviews"),
            ("EVALUATION_TIMEOUT_SECS", "soon"),
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidValue(var, _)) if var == "EVALUATION_TIMEOUT_SECS"));
    }

    #[test]
    fn sendgrid_needs_a_key_and_a_real_sender() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/interviews"),
            ("MAIL_PROVIDER", "sendgrid"),
        ]);
        assert!(matches!(result, Err(ConfigError::MissingVar(var)) if var == "SENDGRID_API_KEY"));

        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/interviews"),
            ("MAIL_PROVIDER", "sendgrid"),
            ("SENDGRID_API_KEY", "SG.key"),
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidValue(var, _)) if var == "MAIL_SENDER_EMAIL"));

        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/interviews"),
            ("MAIL_PROVIDER", "SendGrid"),
            ("SENDGRID_API_KEY", "SG.key"),
            ("MAIL_SENDER_EMAIL", "hiring@example.com"),
        ])
        .unwrap();
        assert_eq!(config.mailer, MailerKind::SendGrid);
        assert_eq!(config.mail_sender_name, "Interview Practice");
    }
}

//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        mailer::Sender, tts::parse_voice, ConsoleMailer, DbAdapter, HttpEvaluationAdapter,
        LocalAudioStorage, OpenAiEvaluationAdapter, OpenAiSstAdapter, OpenAiTtsAdapter,
        SendGridMailer,
    },
    config::{Config, ConfigError, EvaluatorKind, MailerKind},
    error::ApiError,
    web::{build_router, AppState},
};
use async_openai::{config::OpenAIConfig, types::audio::SpeechModel, Client};
use interview_core::{
    ports::{AudioStorage, EvaluationService, InvitationMailer, SpeechToTextService},
    InterviewPlatform,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let storage: Arc<dyn AudioStorage> = Arc::new(LocalAudioStorage::new(
        config.audio_storage_dir.clone(),
        config.audio_public_base_url.clone(),
    ));

    let openai_client = config
        .openai_api_key
        .as_ref()
        .map(|key| Client::with_config(OpenAIConfig::new().with_api_key(key)));

    let evaluator: Arc<dyn EvaluationService> = match (config.evaluator, &openai_client) {
        (EvaluatorKind::OpenAi, Some(client)) => {
            info!("Scoring answers with {}.", config.eval_model);
            Arc::new(OpenAiEvaluationAdapter::new(
                client.clone(),
                config.eval_model.clone(),
            ))
        }
        (EvaluatorKind::OpenAi, None) => {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()).into())
        }
        (EvaluatorKind::Http, _) => {
            info!("Scoring answers through {}.", config.evaluation_service_url);
            Arc::new(HttpEvaluationAdapter::new(
                &config.evaluation_service_url,
                config.evaluation_timeout,
            )?)
        }
    };

    let mailer: Arc<dyn InvitationMailer> = match (config.mailer, &config.sendgrid_api_key) {
        (MailerKind::SendGrid, Some(key)) => {
            info!("Emailing invitations through SendGrid as {}.", config.mail_sender_email);
            Arc::new(SendGridMailer::new(
                &config.sendgrid_api_url,
                key.clone(),
                Sender {
                    email: config.mail_sender_email.clone(),
                    name: config.mail_sender_name.clone(),
                },
                config.candidate_link_base_url.clone(),
                config.evaluation_timeout,
            )?)
        }
        (MailerKind::SendGrid, None) => {
            return Err(ConfigError::MissingVar("SENDGRID_API_KEY".to_string()).into())
        }
        (MailerKind::Console, _) => {
            warn!("MAIL_PROVIDER is 'console'; invitation emails are only logged.");
            Arc::new(ConsoleMailer::new(config.candidate_link_base_url.clone()))
        }
    };

    let mut builder = InterviewPlatform::builder(db_adapter, evaluator)
        .evaluation_mode(config.evaluation_mode)
        .retry_pending_after(config.evaluation_timeout * 2)
        .with_mailer(mailer);
    let mut transcriber: Option<Arc<dyn SpeechToTextService>> = None;

    if let Some(client) = &openai_client {
        let tts_voice = parse_voice(&config.tts_voice).ok_or_else(|| {
            ApiError::Internal(format!(
                "Invalid TTS voice specified in config: '{}'",
                config.tts_voice
            ))
        })?;
        let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
            client.clone(),
            SpeechModel::Tts1Hd,
            tts_voice,
        ));
        builder = builder.with_narration(tts_adapter, storage.clone());
        transcriber = Some(Arc::new(OpenAiSstAdapter::new(
            client.clone(),
            config.stt_model.clone(),
        )));
    } else {
        warn!("OPENAI_API_KEY is not set; questions will not be narrated and audio answers will not be transcribed.");
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        platform: builder.build(),
        config: config.clone(),
        transcriber,
        storage,
    });

    // --- 5. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! services/api/src/adapters/mailer.rs
//!
//! Delivers candidate invitation emails, either through SendGrid's v3 mail API
//! or, in development, by writing them to the log.

use async_trait::async_trait;
use interview_core::{
    domain::InvitationNotice,
    ports::{InvitationMailer, PortError, PortResult},
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// The rendered email for one invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationEmail {
    pub to: String,
    pub subject: String,
    pub body_text: String,
}

impl InvitationEmail {
    pub fn compose(notice: &InvitationNotice, link_base: &str) -> Self {
        let link = format!("{}/{}", link_base.trim_end_matches('/'), notice.token);
        Self {
            to: notice.candidate_email.clone(),
            subject: format!("Your interview invitation: {}", notice.interview_title),
            body_text: format!(
                "Hello,\n\n\
                 You have been invited to the interview \"{}\".\n\n\
                 Open the link below and confirm this email address to begin:\n{}\n\n\
                 The link can be used once.\n",
                notice.interview_title, link
            ),
        }
    }
}

/// Who invitation emails come from.
#[derive(Debug, Clone)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

//=========================================================================================
// Console
//=========================================================================================

/// Logs each invitation instead of sending it.
#[derive(Clone)]
pub struct ConsoleMailer {
    link_base: String,
}

impl ConsoleMailer {
    pub fn new(link_base: impl Into<String>) -> Self {
        Self {
            link_base: link_base.into(),
        }
    }
}

#[async_trait]
impl InvitationMailer for ConsoleMailer {
    async fn send_invitation(&self, notice: &InvitationNotice) -> PortResult<()> {
        let email = InvitationEmail::compose(notice, &self.link_base);
        info!(
            to = %email.to,
            subject = %email.subject,
            "Invitation email (console mailer):\n{}",
            email.body_text
        );
        Ok(())
    }
}

//=========================================================================================
// SendGrid
//=========================================================================================

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct MailPayload<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

fn status_error(status: StatusCode, body: &str) -> PortError {
    let message = format!("mail provider answered {}: {}", status, body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PortError::Unavailable(message)
    } else {
        PortError::Unexpected(message)
    }
}

#[derive(Clone)]
pub struct SendGridMailer {
    client: Client,
    api_url: String,
    api_key: String,
    sender: Sender,
    link_base: String,
}

impl SendGridMailer {
    pub fn new(
        api_url: &str,
        api_key: impl Into<String>,
        sender: Sender,
        link_base: impl Into<String>,
        timeout: Duration,
    ) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.into(),
            sender,
            link_base: link_base.into(),
        })
    }

    fn payload<'a>(&'a self, email: &'a InvitationEmail) -> MailPayload<'a> {
        MailPayload {
            personalizations: [Personalization {
                to: [Address {
                    email: &email.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.sender.email,
                name: Some(&self.sender.name),
            },
            subject: &email.subject,
            content: [Content {
                kind: "text/plain",
                value: &email.body_text,
            }],
        }
    }
}

#[async_trait]
impl InvitationMailer for SendGridMailer {
    async fn send_invitation(&self, notice: &InvitationNotice) -> PortResult<()> {
        let email = InvitationEmail::compose(notice, &self.link_base);
        debug!("Sending invitation email to {}", email.to);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&email))
            .send()
            .await
            .map_err(|e| PortError::Unavailable(format!("mail request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use tokio::sync::mpsc;

    fn notice() -> InvitationNotice {
        InvitationNotice {
            candidate_email: "ana@example.com".to_string(),
            interview_title: "Backend Engineer".to_string(),
            token: "Tk23abc".to_string(),
        }
    }

    fn sender() -> Sender {
        Sender {
            email: "hiring@example.com".to_string(),
            name: "Acme Hiring".to_string(),
        }
    }

    #[test]
    fn email_carries_the_candidate_link() {
        let email = InvitationEmail::compose(&notice(), "http://localhost:5173/candidate-interview/");
        assert_eq!(email.to, "ana@example.com");
        assert_eq!(email.subject, "Your interview invitation: Backend Engineer");
        assert!(email
            .body_text
            .contains("http://localhost:5173/candidate-interview/Tk23abc"));
    }

    #[test]
    fn rate_limits_and_outages_are_transient() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            PortError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "bad key"),
            PortError::Unexpected(_)
        ));
    }

    #[tokio::test]
    async fn console_mailer_never_fails() {
        let mailer = ConsoleMailer::new("http://localhost:5173/candidate-interview");
        assert!(mailer.send_invitation(&notice()).await.is_ok());
    }

    #[tokio::test]
    async fn sendgrid_receives_one_addressed_message() {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Option<String>, serde_json::Value)>();
        let app = Router::new()
            .route(
                "/v3/mail/send",
                post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                    let tx = tx.clone();
                    async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let _ = tx.send((auth, body));
                        StatusCode::ACCEPTED
                    }
                }),
            )
            .route("/down", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let mailer = SendGridMailer::new(
            &format!("http://{}/v3/mail/send", addr),
            "SG.test-key",
            sender(),
            "https://jobs.example.com/candidate-interview",
            Duration::from_secs(5),
        )
        .unwrap();
        mailer.send_invitation(&notice()).await.unwrap();

        let (auth, body) = rx.recv().await.unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer SG.test-key"));
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "ana@example.com");
        assert_eq!(body["from"]["email"], "hiring@example.com");
        assert_eq!(body["from"]["name"], "Acme Hiring");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert!(body["content"][0]["value"]
            .as_str()
            .unwrap()
            .contains("https://jobs.example.com/candidate-interview/Tk23abc"));

        let down = SendGridMailer::new(
            &format!("http://{}/down", addr),
            "SG.test-key",
            sender(),
            "https://jobs.example.com/candidate-interview",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(
            down.send_invitation(&notice()).await,
            Err(PortError::Unavailable(_))
        ));
    }
}

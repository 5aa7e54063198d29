//! crates/interview_core/src/invitations.rs
//!
//! Single-use candidate links: issuing tokens and redeeming them into sessions.

use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use validator::ValidateEmail;

use crate::access::Actor;
use crate::activity::ActivityLog;
use crate::domain::{
    ActivityKind, CompanyInterview, Invitation, InvitationNotice, NewInvitation, NewSession,
    Session, SessionOrigin,
};
use crate::error::{InterviewError, InterviewResult};
use crate::ports::{DatabaseService, InvitationMailer, PortError};
use crate::selector::compose_interview_set;
use crate::sessions::QuestionPrompt;

pub const TOKEN_LENGTH: usize = 32;

/// URL-safe, without look-alike characters.
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

const MAX_TOKEN_ATTEMPTS: usize = 5;

pub fn generate_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Redemption compares emails trimmed and case-insensitively.
pub fn emails_match(invited: &str, supplied: &str) -> bool {
    invited.trim().to_lowercase() == supplied.trim().to_lowercase()
}

/// Trims and validates a candidate email address.
pub fn normalize_email(raw: &str) -> InterviewResult<String> {
    let email = raw.trim().to_string();
    if email.is_empty() {
        return Err(InterviewError::Validation("Email is required".to_string()));
    }
    if !email.validate_email() {
        return Err(InterviewError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(email)
}

/// Validates a batch of emails, rejecting case-insensitive duplicates within it.
pub fn normalize_emails(raw: &[String]) -> InterviewResult<Vec<String>> {
    let mut emails: Vec<String> = Vec::with_capacity(raw.len());
    for candidate in raw {
        let email = normalize_email(candidate)?;
        if emails.iter().any(|e| emails_match(e, &email)) {
            return Err(InterviewError::Validation(format!(
                "'{}' is listed more than once",
                email
            )));
        }
        emails.push(email);
    }
    Ok(emails)
}

/// Only a lost race on the used flag means the link was spent; a constraint
/// failure while creating the session is an ordinary conflict.
fn redemption_error(err: PortError) -> InterviewError {
    match err {
        PortError::AlreadyClaimed(_) => InterviewError::AlreadyUsed,
        other => other.into(),
    }
}

/// The session opened by a redeemed link.
#[derive(Debug, Clone)]
pub struct RedeemedSession {
    pub session: Session,
    pub interview_title: String,
    pub first_question: QuestionPrompt,
}

#[derive(Clone)]
pub struct InvitationManager {
    db: Arc<dyn DatabaseService>,
    activity: ActivityLog,
    mailer: Option<Arc<dyn InvitationMailer>>,
}

impl InvitationManager {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        activity: ActivityLog,
        mailer: Option<Arc<dyn InvitationMailer>>,
    ) -> Self {
        Self {
            db,
            activity,
            mailer,
        }
    }

    /// Emails every stored invitation without holding up the caller.
    /// A failed delivery is logged; the invitation and its link stay valid.
    pub fn notify_in_background(&self, interview_title: &str, invitations: &[Invitation]) {
        let Some(mailer) = self.mailer.clone() else {
            return;
        };
        let notices: Vec<InvitationNotice> = invitations
            .iter()
            .map(|i| InvitationNotice {
                candidate_email: i.candidate_email.clone(),
                interview_title: interview_title.to_string(),
                token: i.token.clone(),
            })
            .collect();
        tokio::spawn(async move {
            for notice in notices {
                match mailer.send_invitation(&notice).await {
                    Ok(()) => info!("Sent interview invitation to {}.", notice.candidate_email),
                    Err(e) => warn!(
                        "Failed to email invitation to {}: {}",
                        notice.candidate_email, e
                    ),
                }
            }
        });
    }

    /// A token not held by any stored invitation. The unique index still
    /// guards against a concurrent writer picking the same one.
    pub async fn fresh_token(&self) -> InterviewResult<String> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_token(&mut rand::thread_rng());
            if !self.db.token_exists(&token).await? {
                return Ok(token);
            }
            warn!("Generated invitation token collided, regenerating.");
        }
        Err(InterviewError::Internal(
            "could not generate a unique invitation token".to_string(),
        ))
    }

    /// Builds unsaved invitations, one per (already validated) email.
    pub async fn prepare(&self, emails: &[String]) -> InterviewResult<Vec<NewInvitation>> {
        let mut invitations = Vec::with_capacity(emails.len());
        for email in emails {
            invitations.push(NewInvitation {
                candidate_email: email.clone(),
                token: self.fresh_token().await?,
            });
        }
        Ok(invitations)
    }

    /// Issues invitations for an existing interview. Emails that already hold
    /// an invitation for it are a `Conflict`.
    pub async fn issue(
        &self,
        interview: &CompanyInterview,
        emails: &[String],
    ) -> InterviewResult<Vec<Invitation>> {
        let interview_id = interview.id;
        let emails = normalize_emails(emails)?;
        if emails.is_empty() {
            return Err(InterviewError::Validation(
                "At least one candidate email is required".to_string(),
            ));
        }
        let existing = self.db.list_invitations(interview_id).await?;
        if let Some(taken) = emails
            .iter()
            .find(|e| existing.iter().any(|i| emails_match(&i.candidate_email, e)))
        {
            return Err(InterviewError::Conflict(format!(
                "{} has already been invited to this interview",
                taken
            )));
        }

        let invitations = self.prepare(&emails).await?;
        let created = self.db.create_invitations(interview_id, invitations).await?;
        info!(
            "Issued {} invitations for interview {}.",
            created.len(),
            interview_id
        );
        self.activity.record(
            ActivityKind::CandidatesInvited,
            format!("{} candidates invited to interview {}", created.len(), interview_id),
        );
        self.notify_in_background(&interview.title, &created);
        Ok(created)
    }

    /// Turns a token into a candidate session, exactly once.
    ///
    /// The invitation is marked used, the session and its question plan are
    /// created, and the two are linked in one storage transaction.
    pub async fn redeem(&self, token: &str, supplied_email: &str) -> InterviewResult<RedeemedSession> {
        if supplied_email.trim().is_empty() {
            return Err(InterviewError::Validation("Email is required".to_string()));
        }
        let invitation = self.find(token).await?;
        if invitation.is_used {
            return Err(InterviewError::AlreadyUsed);
        }
        if !emails_match(&invitation.candidate_email, supplied_email) {
            warn!("Email mismatch while redeeming invitation {}.", invitation.id);
            return Err(InterviewError::EmailMismatch);
        }

        let interview = self.db.get_company_interview(invitation.interview_id).await?;
        if !interview.is_active {
            return Err(InterviewError::InterviewClosed);
        }
        let questions = self.db.list_interview_questions(interview.id).await?;
        let selection =
            compose_interview_set(&questions, interview.quotas.as_ref(), &mut rand::thread_rng())?;

        let session = self
            .db
            .redeem_invitation(
                invitation.id,
                NewSession {
                    origin: SessionOrigin::Candidate {
                        company_id: interview.company_id,
                        interview_id: interview.id,
                        candidate_email: invitation.candidate_email.clone(),
                    },
                    question_ids: selection.questions.iter().map(|q| q.id).collect(),
                },
            )
            .await
            .map_err(redemption_error)?;

        info!(
            "Invitation {} redeemed into session {}.",
            invitation.id, session.id
        );
        self.activity.record(
            ActivityKind::InvitationRedeemed,
            format!(
                "{} started interview '{}'",
                invitation.candidate_email, interview.title
            ),
        );

        let first_question =
            QuestionPrompt::new(session.id, 1, session.question_count, &selection.questions[0]);
        Ok(RedeemedSession {
            session,
            interview_title: interview.title,
            first_question,
        })
    }

    /// The candidate actor bound to a redeemed token.
    pub async fn resolve_candidate(&self, token: &str) -> InterviewResult<Actor> {
        let invitation = self.find(token).await?;
        invitation
            .session_id
            .map(Actor::candidate)
            .ok_or(InterviewError::InvalidToken)
    }

    async fn find(&self, token: &str) -> InterviewResult<Invitation> {
        match self.db.find_invitation_by_token(token.trim()).await {
            Ok(invitation) => Ok(invitation),
            Err(PortError::NotFound(_)) => Err(InterviewError::InvalidToken),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn tokens_are_long_and_url_safe() {
        let mut rng = StdRng::seed_from_u64(7);
        let token = generate_token(&mut rng);
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token(&mut rng));
    }

    #[test]
    fn only_the_used_flag_gate_means_already_used() {
        assert_eq!(
            redemption_error(PortError::AlreadyClaimed("invitation already used".into())),
            InterviewError::AlreadyUsed
        );
        assert_eq!(
            redemption_error(PortError::Conflict("violates foreign key constraint".into())),
            InterviewError::Conflict("violates foreign key constraint".into())
        );
        assert!(matches!(
            redemption_error(PortError::Unavailable("pool timed out".into())),
            InterviewError::UpstreamUnavailable(_)
        ));
    }

    #[test]
    fn email_match_ignores_case_and_whitespace() {
        assert!(emails_match("Jane.Doe@Example.com", "  jane.doe@example.com "));
        assert!(!emails_match("jane@example.com", "john@example.com"));
    }

    #[test]
    fn batch_rejects_invalid_and_duplicate_emails() {
        assert!(normalize_emails(&["not-an-email".to_string()]).is_err());
        assert!(normalize_emails(&["a@x.io".to_string(), "A@X.io".to_string()]).is_err());
        assert_eq!(
            normalize_emails(&[" a@x.io ".to_string()]),
            Ok(vec!["a@x.io".to_string()])
        );
    }
}

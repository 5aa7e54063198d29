//! crates/interview_core/src/catalog.rs
//!
//! Admin curation of the public question bank, plus the dashboard views.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::access::{require_role, Actor, Role};
use crate::activity::ActivityLog;
use crate::domain::{
    ActivityEntry, ActivityKind, DashboardStats, Domain, DomainConfiguration, DomainSummary,
    NewQuestion, Question, QuestionDraft, QuestionOwner, QuestionUpdate, TierQuotas,
};
use crate::error::{InterviewError, InterviewResult};
use crate::narration::QuestionNarrator;
use crate::ports::{DatabaseService, PortError};

/// Builds quotas from signed counts ordered E, D, C, B, A.
///
/// Each count must lie within `0..=TierQuotas::MAX_PER_TIER`.
pub fn checked_quotas(counts: [i64; 5]) -> InterviewResult<TierQuotas> {
    let mut checked = [0u32; 5];
    for (slot, count) in checked.iter_mut().zip(counts) {
        *slot = u32::try_from(count)
            .ok()
            .filter(|n| *n <= TierQuotas::MAX_PER_TIER)
            .ok_or_else(|| {
                InterviewError::Validation(format!(
                    "Question counts must be between 0 and {}, got {}",
                    TierQuotas::MAX_PER_TIER,
                    count
                ))
            })?;
    }
    let [e, d, c, b, a] = checked;
    Ok(TierQuotas { e, d, c, b, a })
}

/// Re-checks quotas built elsewhere against the same bounds as `checked_quotas`.
pub(crate) fn ensure_quota_bounds(quotas: &TierQuotas) -> InterviewResult<()> {
    checked_quotas([quotas.e, quotas.d, quotas.c, quotas.b, quotas.a].map(i64::from)).map(|_| ())
}

/// Trims a required text field, rejecting blanks.
pub(crate) fn required(field: &str, value: &str) -> InterviewResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InterviewError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

pub(crate) fn validate_draft(draft: QuestionDraft) -> InterviewResult<QuestionDraft> {
    Ok(QuestionDraft {
        text: required("Question text", &draft.text)?,
        ideal_answer: required("Ideal answer", &draft.ideal_answer)?,
        ..draft
    })
}

fn clean_logo(logo_url: Option<&str>) -> Option<String> {
    logo_url
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

#[derive(Clone)]
pub struct Catalog {
    db: Arc<dyn DatabaseService>,
    activity: ActivityLog,
    narrator: Option<QuestionNarrator>,
}

impl Catalog {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        activity: ActivityLog,
        narrator: Option<QuestionNarrator>,
    ) -> Self {
        Self {
            db,
            activity,
            narrator,
        }
    }

    //=====================================================================================
    // Domains
    //=====================================================================================

    /// Public listing, open to every caller.
    pub async fn list_domains(&self) -> InterviewResult<Vec<DomainSummary>> {
        Ok(self.db.list_domains().await?)
    }

    pub async fn create_domain(
        &self,
        actor: &Actor,
        name: &str,
        logo_url: Option<&str>,
    ) -> InterviewResult<Domain> {
        require_role(actor, &[Role::Admin])?;
        let name = required("Domain name", name)?;
        let logo = clean_logo(logo_url);
        let domain = self
            .db
            .create_domain(&name, logo.as_deref())
            .await
            .map_err(|e| duplicate_name(e, &name))?;
        self.db
            .upsert_configuration(domain.id, TierQuotas::default())
            .await?;

        info!("Domain '{}' created by admin {}.", domain.name, actor.id);
        self.activity.record(
            ActivityKind::DomainCreated,
            format!("Domain '{}' created", domain.name),
        );
        Ok(domain)
    }

    pub async fn update_domain(
        &self,
        actor: &Actor,
        domain_id: Uuid,
        name: &str,
        logo_url: Option<&str>,
    ) -> InterviewResult<Domain> {
        require_role(actor, &[Role::Admin])?;
        let name = required("Domain name", name)?;
        let logo = clean_logo(logo_url);
        let domain = self
            .db
            .update_domain(domain_id, &name, logo.as_deref())
            .await
            .map_err(|e| duplicate_name(e, &name))?;
        self.activity.record(
            ActivityKind::DomainUpdated,
            format!("Domain '{}' updated", domain.name),
        );
        Ok(domain)
    }

    /// Refused while any practice session still references the domain.
    pub async fn delete_domain(&self, actor: &Actor, domain_id: Uuid) -> InterviewResult<()> {
        require_role(actor, &[Role::Admin])?;
        let domain = self.db.get_domain(domain_id).await?;
        self.db.delete_domain(domain_id).await.map_err(|e| match e {
            PortError::Conflict(_) => InterviewError::Conflict(format!(
                "Domain '{}' has practice sessions and cannot be deleted",
                domain.name
            )),
            other => other.into(),
        })?;
        info!("Domain '{}' deleted by admin {}.", domain.name, actor.id);
        self.activity.record(
            ActivityKind::DomainDeleted,
            format!("Domain '{}' deleted", domain.name),
        );
        Ok(())
    }

    pub async fn get_configuration(
        &self,
        actor: &Actor,
        domain_id: Uuid,
    ) -> InterviewResult<DomainConfiguration> {
        require_role(actor, &[Role::Admin])?;
        let domain = self.db.get_domain(domain_id).await?;
        match self.db.get_configuration(domain_id).await {
            Ok(configuration) => Ok(configuration),
            Err(PortError::NotFound(_)) => Ok(DomainConfiguration {
                domain_id,
                quotas: TierQuotas::default(),
                updated_at: domain.created_at,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_configuration(
        &self,
        actor: &Actor,
        domain_id: Uuid,
        quotas: TierQuotas,
    ) -> InterviewResult<DomainConfiguration> {
        require_role(actor, &[Role::Admin])?;
        ensure_quota_bounds(&quotas)?;
        let domain = self.db.get_domain(domain_id).await?;
        let configuration = self.db.upsert_configuration(domain_id, quotas).await?;
        self.activity.record(
            ActivityKind::ConfigurationUpdated,
            format!("Question configuration of '{}' updated", domain.name),
        );
        Ok(configuration)
    }

    //=====================================================================================
    // Questions
    //=====================================================================================

    pub async fn list_questions(
        &self,
        actor: &Actor,
        domain_id: Uuid,
    ) -> InterviewResult<Vec<Question>> {
        require_role(actor, &[Role::Admin])?;
        self.db.get_domain(domain_id).await?;
        Ok(self.db.list_domain_questions(domain_id).await?)
    }

    pub async fn create_question(
        &self,
        actor: &Actor,
        domain_id: Uuid,
        draft: QuestionDraft,
    ) -> InterviewResult<Question> {
        require_role(actor, &[Role::Admin])?;
        let draft = validate_draft(draft)?;
        let domain = self.db.get_domain(domain_id).await?;
        let question = self
            .db
            .create_question(NewQuestion {
                owner: QuestionOwner::Domain(domain_id),
                text: draft.text,
                ideal_answer: draft.ideal_answer,
                difficulty: draft.difficulty,
                pinned: false,
            })
            .await?;

        if let Some(narrator) = &self.narrator {
            narrator.narrate_in_background(question.id, question.text.clone());
        }
        self.activity.record(
            ActivityKind::QuestionAdded,
            format!("Tier {} question added to '{}'", question.difficulty, domain.name),
        );
        Ok(question)
    }

    pub async fn update_question(
        &self,
        actor: &Actor,
        question_id: Uuid,
        update: QuestionUpdate,
    ) -> InterviewResult<Question> {
        require_role(actor, &[Role::Admin])?;
        let update = QuestionUpdate {
            text: required("Question text", &update.text)?,
            ideal_answer: required("Ideal answer", &update.ideal_answer)?,
            difficulty: update.difficulty,
        };
        let before = self.db.get_question(question_id).await?;
        let question = self.db.update_question(question_id, update).await?;
        if before.text != question.text {
            if let Some(narrator) = &self.narrator {
                narrator.narrate_in_background(question.id, question.text.clone());
            }
        }
        self.activity.record(
            ActivityKind::QuestionUpdated,
            format!("Question {} updated", question.id),
        );
        Ok(question)
    }

    /// Refused while any session plan includes the question.
    pub async fn delete_question(&self, actor: &Actor, question_id: Uuid) -> InterviewResult<()> {
        require_role(actor, &[Role::Admin])?;
        self.db.delete_question(question_id).await.map_err(|e| match e {
            PortError::Conflict(_) => InterviewError::Conflict(
                "Question has been asked in a session and cannot be deleted".to_string(),
            ),
            other => other.into(),
        })?;
        self.activity.record(
            ActivityKind::QuestionDeleted,
            format!("Question {} deleted", question_id),
        );
        Ok(())
    }

    //=====================================================================================
    // Dashboard
    //=====================================================================================

    pub async fn dashboard_stats(&self, actor: &Actor) -> InterviewResult<DashboardStats> {
        require_role(actor, &[Role::Admin])?;
        Ok(self.db.dashboard_stats().await?)
    }

    pub async fn recent_activity(
        &self,
        actor: &Actor,
        limit: u32,
    ) -> InterviewResult<Vec<ActivityEntry>> {
        require_role(actor, &[Role::Admin])?;
        self.activity.recent(limit).await
    }
}

fn duplicate_name(err: PortError, name: &str) -> InterviewError {
    match err {
        PortError::Conflict(_) => {
            InterviewError::Conflict(format!("A domain named '{}' already exists", name))
        }
        other => other.into(),
    }
}

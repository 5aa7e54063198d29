//! crates/interview_core/src/memory.rs
//!
//! An in-process `DatabaseService` with the same uniqueness, restrict and
//! cascade rules as the relational schema. Used by tests and local demos.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    ActivityEntry, CompanyInterview, DashboardStats, Domain, DomainConfiguration, DomainSummary,
    Evaluation, Invitation, InterviewSummary, NewCompanyInterview, NewInvitation, NewQuestion,
    NewResponse, NewSavedCandidate, NewSession, PracticeSessionSummary, Question, QuestionOwner,
    QuestionUpdate, RecordedResponse, Response, SavedCandidate, Session, SessionOrigin,
    SessionQuestion, TierQuotas,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    domains: Vec<Domain>,
    configurations: HashMap<Uuid, DomainConfiguration>,
    questions: Vec<Question>,
    interviews: Vec<CompanyInterview>,
    invitations: Vec<Invitation>,
    sessions: Vec<Session>,
    /// (session, order, question)
    plans: Vec<(Uuid, u32, Uuid)>,
    responses: Vec<Response>,
    saved: Vec<SavedCandidate>,
    activity: Vec<ActivityEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_activity: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose activity log always reports the backend as unavailable.
    pub fn with_failing_activity() -> Self {
        Self {
            failing_activity: true,
            ..Self::default()
        }
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl Tables {
    fn domain(&self, id: Uuid) -> PortResult<&Domain> {
        self.domains
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| not_found("Domain", id))
    }

    fn question(&self, id: Uuid) -> PortResult<&Question> {
        self.questions
            .iter()
            .find(|q| q.id == id)
            .ok_or_else(|| not_found("Question", id))
    }

    fn interview(&self, id: Uuid) -> PortResult<&CompanyInterview> {
        self.interviews
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("Interview", id))
    }

    fn session_mut(&mut self, id: Uuid) -> PortResult<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("Session", id))
    }

    fn questions_of(&self, owner: QuestionOwner) -> Vec<Question> {
        let mut questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| q.owner == owner)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.position);
        questions
    }

    fn push_question(&mut self, question: NewQuestion) -> Question {
        let position = self
            .questions
            .iter()
            .filter(|q| q.owner == question.owner)
            .map(|q| q.position)
            .max()
            .unwrap_or(0)
            + 1;
        let question = Question {
            id: Uuid::new_v4(),
            owner: question.owner,
            text: question.text,
            ideal_answer: question.ideal_answer,
            audio_url: None,
            difficulty: question.difficulty,
            pinned: question.pinned,
            position,
        };
        self.questions.push(question.clone());
        question
    }

    fn check_invitations(&self, interview_id: Uuid, invitations: &[NewInvitation]) -> PortResult<()> {
        for (i, invitation) in invitations.iter().enumerate() {
            let duplicate_token = self.invitations.iter().any(|x| x.token == invitation.token)
                || invitations[..i].iter().any(|x| x.token == invitation.token);
            if duplicate_token {
                return Err(PortError::Conflict("invitation token already exists".to_string()));
            }
            let duplicate_email = self.invitations.iter().any(|x| {
                x.interview_id == interview_id && same_name(&x.candidate_email, &invitation.candidate_email)
            }) || invitations[..i]
                .iter()
                .any(|x| same_name(&x.candidate_email, &invitation.candidate_email));
            if duplicate_email {
                return Err(PortError::Conflict(format!(
                    "{} is already invited",
                    invitation.candidate_email
                )));
            }
        }
        Ok(())
    }

    fn push_invitations(&mut self, interview_id: Uuid, invitations: Vec<NewInvitation>) -> Vec<Invitation> {
        invitations
            .into_iter()
            .map(|invitation| {
                let invitation = Invitation {
                    id: Uuid::new_v4(),
                    interview_id,
                    candidate_email: invitation.candidate_email,
                    token: invitation.token,
                    is_used: false,
                    session_id: None,
                    created_at: Utc::now(),
                };
                self.invitations.push(invitation.clone());
                invitation
            })
            .collect()
    }

    fn push_session(&mut self, session: NewSession) -> PortResult<Session> {
        match &session.origin {
            SessionOrigin::Practice { domain_id, .. } => {
                self.domain(*domain_id)?;
            }
            SessionOrigin::Candidate { interview_id, .. } => {
                self.interview(*interview_id)?;
            }
        }
        for question_id in &session.question_ids {
            self.question(*question_id)?;
        }

        let stored = Session {
            id: Uuid::new_v4(),
            origin: session.origin,
            question_count: session.question_ids.len() as u32,
            is_completed: false,
            average_score: None,
            started_at: Utc::now(),
        };
        for (index, question_id) in session.question_ids.into_iter().enumerate() {
            self.plans.push((stored.id, index as u32 + 1, question_id));
        }
        self.sessions.push(stored.clone());
        Ok(stored)
    }

    /// Removes a session with its plan, responses and bookmarks; detaches invitations.
    fn remove_session(&mut self, session_id: Uuid) {
        self.responses.retain(|r| r.session_id != session_id);
        self.plans.retain(|(s, _, _)| *s != session_id);
        self.saved.retain(|s| s.session_id != session_id);
        for invitation in self.invitations.iter_mut() {
            if invitation.session_id == Some(session_id) {
                invitation.session_id = None;
            }
        }
        self.sessions.retain(|s| s.id != session_id);
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    // --- Domains ---
    async fn create_domain(&self, name: &str, logo_url: Option<&str>) -> PortResult<Domain> {
        let mut tables = self.tables()?;
        if tables.domains.iter().any(|d| same_name(&d.name, name)) {
            return Err(PortError::Conflict(format!("domain '{}' already exists", name)));
        }
        let domain = Domain {
            id: Uuid::new_v4(),
            name: name.to_string(),
            logo_url: logo_url.map(str::to_string),
            created_at: Utc::now(),
        };
        tables.domains.push(domain.clone());
        Ok(domain)
    }

    async fn update_domain(
        &self,
        domain_id: Uuid,
        name: &str,
        logo_url: Option<&str>,
    ) -> PortResult<Domain> {
        let mut tables = self.tables()?;
        if tables
            .domains
            .iter()
            .any(|d| d.id != domain_id && same_name(&d.name, name))
        {
            return Err(PortError::Conflict(format!("domain '{}' already exists", name)));
        }
        let domain = tables
            .domains
            .iter_mut()
            .find(|d| d.id == domain_id)
            .ok_or_else(|| not_found("Domain", domain_id))?;
        domain.name = name.to_string();
        domain.logo_url = logo_url.map(str::to_string);
        Ok(domain.clone())
    }

    async fn get_domain(&self, domain_id: Uuid) -> PortResult<Domain> {
        Ok(self.tables()?.domain(domain_id)?.clone())
    }

    async fn list_domains(&self) -> PortResult<Vec<DomainSummary>> {
        let tables = self.tables()?;
        let mut summaries: Vec<DomainSummary> = tables
            .domains
            .iter()
            .map(|domain| DomainSummary {
                domain: domain.clone(),
                session_count: tables
                    .sessions
                    .iter()
                    .filter(|s| {
                        matches!(s.origin, SessionOrigin::Practice { domain_id, .. } if domain_id == domain.id)
                    })
                    .count() as i64,
                question_count: tables
                    .questions
                    .iter()
                    .filter(|q| q.owner == QuestionOwner::Domain(domain.id))
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| a.domain.name.to_lowercase().cmp(&b.domain.name.to_lowercase()));
        Ok(summaries)
    }

    async fn delete_domain(&self, domain_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        tables.domain(domain_id)?;
        let referenced = tables.sessions.iter().any(|s| {
            matches!(s.origin, SessionOrigin::Practice { domain_id: d, .. } if d == domain_id)
        });
        if referenced {
            return Err(PortError::Conflict(format!(
                "domain {} is referenced by sessions",
                domain_id
            )));
        }
        tables
            .questions
            .retain(|q| q.owner != QuestionOwner::Domain(domain_id));
        tables.configurations.remove(&domain_id);
        tables.domains.retain(|d| d.id != domain_id);
        Ok(())
    }

    async fn get_configuration(&self, domain_id: Uuid) -> PortResult<DomainConfiguration> {
        self.tables()?
            .configurations
            .get(&domain_id)
            .cloned()
            .ok_or_else(|| not_found("Configuration for domain", domain_id))
    }

    async fn upsert_configuration(
        &self,
        domain_id: Uuid,
        quotas: TierQuotas,
    ) -> PortResult<DomainConfiguration> {
        let mut tables = self.tables()?;
        tables.domain(domain_id)?;
        let configuration = DomainConfiguration {
            domain_id,
            quotas,
            updated_at: Utc::now(),
        };
        tables
            .configurations
            .insert(domain_id, configuration.clone());
        Ok(configuration)
    }

    // --- Questions ---
    async fn create_question(&self, question: NewQuestion) -> PortResult<Question> {
        let mut tables = self.tables()?;
        match question.owner {
            QuestionOwner::Domain(id) => {
                tables.domain(id)?;
            }
            QuestionOwner::Interview(id) => {
                tables.interview(id)?;
            }
        }
        Ok(tables.push_question(question))
    }

    async fn update_question(
        &self,
        question_id: Uuid,
        update: QuestionUpdate,
    ) -> PortResult<Question> {
        let mut tables = self.tables()?;
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| not_found("Question", question_id))?;
        question.text = update.text;
        question.ideal_answer = update.ideal_answer;
        question.difficulty = update.difficulty;
        Ok(question.clone())
    }

    async fn set_question_audio(&self, question_id: Uuid, audio_url: &str) -> PortResult<()> {
        let mut tables = self.tables()?;
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| not_found("Question", question_id))?;
        question.audio_url = Some(audio_url.to_string());
        Ok(())
    }

    async fn get_question(&self, question_id: Uuid) -> PortResult<Question> {
        Ok(self.tables()?.question(question_id)?.clone())
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        tables.question(question_id)?;
        if tables.plans.iter().any(|(_, _, q)| *q == question_id) {
            return Err(PortError::Conflict(format!(
                "question {} is part of a session",
                question_id
            )));
        }
        tables.questions.retain(|q| q.id != question_id);
        Ok(())
    }

    async fn list_domain_questions(&self, domain_id: Uuid) -> PortResult<Vec<Question>> {
        Ok(self.tables()?.questions_of(QuestionOwner::Domain(domain_id)))
    }

    async fn list_interview_questions(&self, interview_id: Uuid) -> PortResult<Vec<Question>> {
        Ok(self
            .tables()?
            .questions_of(QuestionOwner::Interview(interview_id)))
    }

    // --- Company Interviews ---
    async fn create_company_interview(
        &self,
        interview: NewCompanyInterview,
    ) -> PortResult<CompanyInterview> {
        let mut tables = self.tables()?;
        let stored = CompanyInterview {
            id: Uuid::new_v4(),
            company_id: interview.company_id,
            title: interview.title,
            is_active: true,
            quotas: interview.quotas,
            created_at: Utc::now(),
        };
        tables.check_invitations(stored.id, &interview.invitations)?;

        tables.interviews.push(stored.clone());
        for draft in interview.questions {
            tables.push_question(NewQuestion {
                owner: QuestionOwner::Interview(stored.id),
                text: draft.text,
                ideal_answer: draft.ideal_answer,
                difficulty: draft.difficulty,
                pinned: draft.pinned,
            });
        }
        tables.push_invitations(stored.id, interview.invitations);
        Ok(stored)
    }

    async fn get_company_interview(&self, interview_id: Uuid) -> PortResult<CompanyInterview> {
        Ok(self.tables()?.interview(interview_id)?.clone())
    }

    async fn list_company_interviews(
        &self,
        company_id: Uuid,
    ) -> PortResult<Vec<InterviewSummary>> {
        let tables = self.tables()?;
        Ok(tables
            .interviews
            .iter()
            .rev()
            .filter(|i| i.company_id == company_id)
            .map(|interview| InterviewSummary {
                interview: interview.clone(),
                question_count: tables
                    .questions
                    .iter()
                    .filter(|q| q.owner == QuestionOwner::Interview(interview.id))
                    .count() as i64,
                invitation_count: tables
                    .invitations
                    .iter()
                    .filter(|x| x.interview_id == interview.id)
                    .count() as i64,
                session_count: tables
                    .sessions
                    .iter()
                    .filter(|s| {
                        matches!(s.origin, SessionOrigin::Candidate { interview_id, .. } if interview_id == interview.id)
                    })
                    .count() as i64,
            })
            .collect())
    }

    async fn deactivate_interview(&self, interview_id: Uuid) -> PortResult<bool> {
        let mut tables = self.tables()?;
        let interview = tables
            .interviews
            .iter_mut()
            .find(|i| i.id == interview_id)
            .ok_or_else(|| not_found("Interview", interview_id))?;
        let was_active = interview.is_active;
        interview.is_active = false;
        Ok(was_active)
    }

    async fn delete_company_interview(&self, interview_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        tables.interview(interview_id)?;
        let session_ids: Vec<Uuid> = tables
            .sessions
            .iter()
            .filter(|s| {
                matches!(s.origin, SessionOrigin::Candidate { interview_id: i, .. } if i == interview_id)
            })
            .map(|s| s.id)
            .collect();
        for session_id in session_ids {
            tables.remove_session(session_id);
        }
        tables.invitations.retain(|x| x.interview_id != interview_id);
        tables
            .questions
            .retain(|q| q.owner != QuestionOwner::Interview(interview_id));
        tables.interviews.retain(|i| i.id != interview_id);
        Ok(())
    }

    // --- Invitations ---
    async fn create_invitations(
        &self,
        interview_id: Uuid,
        invitations: Vec<NewInvitation>,
    ) -> PortResult<Vec<Invitation>> {
        let mut tables = self.tables()?;
        tables.interview(interview_id)?;
        tables.check_invitations(interview_id, &invitations)?;
        Ok(tables.push_invitations(interview_id, invitations))
    }

    async fn token_exists(&self, token: &str) -> PortResult<bool> {
        Ok(self.tables()?.invitations.iter().any(|x| x.token == token))
    }

    async fn find_invitation_by_token(&self, token: &str) -> PortResult<Invitation> {
        self.tables()?
            .invitations
            .iter()
            .find(|x| x.token == token)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Invitation not found".to_string()))
    }

    async fn list_invitations(&self, interview_id: Uuid) -> PortResult<Vec<Invitation>> {
        Ok(self
            .tables()?
            .invitations
            .iter()
            .filter(|x| x.interview_id == interview_id)
            .cloned()
            .collect())
    }

    async fn redeem_invitation(
        &self,
        invitation_id: Uuid,
        session: NewSession,
    ) -> PortResult<Session> {
        let mut tables = self.tables()?;
        let invitation = tables
            .invitations
            .iter()
            .find(|x| x.id == invitation_id)
            .ok_or_else(|| not_found("Invitation", invitation_id))?;
        if invitation.is_used {
            return Err(PortError::AlreadyClaimed("invitation already used".to_string()));
        }

        let stored = tables.push_session(session)?;
        if let Some(invitation) = tables.invitations.iter_mut().find(|x| x.id == invitation_id) {
            invitation.is_used = true;
            invitation.session_id = Some(stored.id);
        }
        Ok(stored)
    }

    // --- Sessions ---
    async fn create_session(&self, session: NewSession) -> PortResult<Session> {
        self.tables()?.push_session(session)
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        self.tables()?
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| not_found("Session", session_id))
    }

    async fn list_user_sessions(&self, user_id: Uuid) -> PortResult<Vec<PracticeSessionSummary>> {
        let tables = self.tables()?;
        let mut summaries = Vec::new();
        for session in tables.sessions.iter().rev() {
            let SessionOrigin::Practice { user_id: owner, domain_id } = session.origin else {
                continue;
            };
            if owner != user_id {
                continue;
            }
            let domain = tables.domain(domain_id)?;
            summaries.push(PracticeSessionSummary {
                session: session.clone(),
                domain_name: domain.name.clone(),
                logo_url: domain.logo_url.clone(),
                answered: tables
                    .responses
                    .iter()
                    .filter(|r| r.session_id == session.id)
                    .count() as i64,
            });
        }
        Ok(summaries)
    }

    async fn list_interview_sessions(&self, interview_id: Uuid) -> PortResult<Vec<Session>> {
        Ok(self
            .tables()?
            .sessions
            .iter()
            .filter(|s| {
                matches!(s.origin, SessionOrigin::Candidate { interview_id: i, .. } if i == interview_id)
            })
            .cloned()
            .collect())
    }

    async fn session_plan(&self, session_id: Uuid) -> PortResult<Vec<SessionQuestion>> {
        let tables = self.tables()?;
        let mut entries: Vec<&(Uuid, u32, Uuid)> = tables
            .plans
            .iter()
            .filter(|(s, _, _)| *s == session_id)
            .collect();
        entries.sort_by_key(|(_, order, _)| *order);
        entries
            .into_iter()
            .map(|(session_id, order, question_id)| {
                Ok(SessionQuestion {
                    session_id: *session_id,
                    order: *order,
                    question: tables.question(*question_id)?.clone(),
                })
            })
            .collect()
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        tables.session_mut(session_id)?;
        tables.remove_session(session_id);
        Ok(())
    }

    // --- Responses ---
    async fn record_response(&self, response: NewResponse) -> PortResult<RecordedResponse> {
        let mut tables = self.tables()?;
        tables.session_mut(response.session_id)?;
        if tables
            .responses
            .iter()
            .any(|r| r.session_id == response.session_id && r.order == response.order)
        {
            return Err(PortError::Conflict(format!(
                "response {} already recorded",
                response.order
            )));
        }

        let stored = Response {
            id: Uuid::new_v4(),
            session_id: response.session_id,
            question_id: response.question_id,
            order: response.order,
            audio_url: response.audio_url,
            transcript: response.transcript,
            feedback: None,
            score: None,
            submitted_at: Utc::now(),
        };
        tables.responses.push(stored.clone());
        let answered = tables
            .responses
            .iter()
            .filter(|r| r.session_id == stored.session_id)
            .count() as u32;

        let session = tables.session_mut(stored.session_id)?;
        if answered >= session.question_count {
            session.is_completed = true;
        }
        Ok(RecordedResponse {
            response: stored,
            session_completed: session.is_completed,
        })
    }

    async fn get_response(&self, response_id: Uuid) -> PortResult<Response> {
        self.tables()?
            .responses
            .iter()
            .find(|r| r.id == response_id)
            .cloned()
            .ok_or_else(|| not_found("Response", response_id))
    }

    async fn list_responses(&self, session_id: Uuid) -> PortResult<Vec<Response>> {
        let tables = self.tables()?;
        let mut responses: Vec<Response> = tables
            .responses
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        responses.sort_by_key(|r| r.order);
        Ok(responses)
    }

    async fn record_evaluation(
        &self,
        response_id: Uuid,
        evaluation: Evaluation,
    ) -> PortResult<bool> {
        let mut tables = self.tables()?;
        let response = tables
            .responses
            .iter_mut()
            .find(|r| r.id == response_id)
            .ok_or_else(|| not_found("Response", response_id))?;
        if response.score.is_some() {
            return Ok(false);
        }
        response.score = Some(evaluation.score);
        response.feedback = Some(evaluation.feedback);
        if evaluation.transcription.is_some() {
            response.transcript = evaluation.transcription;
        }
        Ok(true)
    }

    async fn finalize_session_score(&self, session_id: Uuid, score: f64) -> PortResult<bool> {
        let mut tables = self.tables()?;
        let session = tables.session_mut(session_id)?;
        if session.average_score.is_some() {
            return Ok(false);
        }
        session.average_score = Some(score);
        Ok(true)
    }

    // --- Saved Candidates ---
    async fn save_candidate(&self, saved: NewSavedCandidate) -> PortResult<SavedCandidate> {
        let mut tables = self.tables()?;
        tables.session_mut(saved.session_id)?;
        if tables
            .saved
            .iter()
            .any(|s| s.company_id == saved.company_id && s.session_id == saved.session_id)
        {
            return Err(PortError::Conflict("candidate already saved".to_string()));
        }
        let stored = SavedCandidate {
            id: Uuid::new_v4(),
            company_id: saved.company_id,
            session_id: saved.session_id,
            interview_id: saved.interview_id,
            candidate_email: saved.candidate_email,
            interview_title: saved.interview_title,
            average_score: saved.average_score,
            saved_at: Utc::now(),
        };
        tables.saved.push(stored.clone());
        Ok(stored)
    }

    async fn find_saved_candidate(
        &self,
        company_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Option<SavedCandidate>> {
        Ok(self
            .tables()?
            .saved
            .iter()
            .find(|s| s.company_id == company_id && s.session_id == session_id)
            .cloned())
    }

    async fn get_saved_candidate(&self, saved_id: Uuid) -> PortResult<SavedCandidate> {
        self.tables()?
            .saved
            .iter()
            .find(|s| s.id == saved_id)
            .cloned()
            .ok_or_else(|| not_found("Saved candidate", saved_id))
    }

    async fn list_saved_candidates(&self, company_id: Uuid) -> PortResult<Vec<SavedCandidate>> {
        Ok(self
            .tables()?
            .saved
            .iter()
            .rev()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn delete_saved_candidate(&self, saved_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        let before = tables.saved.len();
        tables.saved.retain(|s| s.id != saved_id);
        if tables.saved.len() == before {
            return Err(not_found("Saved candidate", saved_id));
        }
        Ok(())
    }

    // --- Activity & Stats ---
    async fn append_activity(&self, kind: &str, description: &str) -> PortResult<()> {
        if self.failing_activity {
            return Err(PortError::Unavailable("activity log offline".to_string()));
        }
        self.tables()?.activity.push(ActivityEntry {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            description: description.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn recent_activity(&self, limit: u32) -> PortResult<Vec<ActivityEntry>> {
        Ok(self
            .tables()?
            .activity
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn dashboard_stats(&self) -> PortResult<DashboardStats> {
        let tables = self.tables()?;
        let practice_sessions = tables
            .sessions
            .iter()
            .filter(|s| matches!(s.origin, SessionOrigin::Practice { .. }))
            .count() as i64;
        Ok(DashboardStats {
            domains: tables.domains.len() as i64,
            questions: tables
                .questions
                .iter()
                .filter(|q| matches!(q.owner, QuestionOwner::Domain(_)))
                .count() as i64,
            practice_sessions,
            candidate_sessions: tables.sessions.len() as i64 - practice_sessions,
            company_interviews: tables.interviews.len() as i64,
        })
    }
}

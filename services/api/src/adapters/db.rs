//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interview_core::domain::{
    ActivityEntry, CompanyInterview, DashboardStats, Difficulty, Domain, DomainConfiguration,
    DomainSummary, Evaluation, Invitation, InterviewSummary, NewCompanyInterview, NewInvitation,
    NewQuestion, NewResponse, NewSavedCandidate, NewSession, PracticeSessionSummary, Question,
    QuestionOwner, QuestionUpdate, RecordedResponse, Response, SavedCandidate, Session,
    SessionOrigin, SessionQuestion, TierQuotas,
};
use interview_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Unique (`23505`) and foreign-key (`23503`) violations become `Conflict`, so
/// restrict rules surface the same way as duplicate keys.
fn db_error(err: sqlx::Error) -> PortError {
    let message = err.to_string();
    match &err {
        sqlx::Error::RowNotFound => PortError::NotFound(message),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") | Some("23503") => PortError::Conflict(db_err.message().to_string()),
            _ => PortError::Unexpected(message),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => PortError::Unavailable(message),
        _ => PortError::Unexpected(message),
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

fn to_count(value: i32, column: &str) -> PortResult<u32> {
    u32::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("negative {} in database: {}", column, value)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DomainRecord {
    id: Uuid,
    name: String,
    logo_url: Option<String>,
    created_at: DateTime<Utc>,
}
impl DomainRecord {
    fn to_domain(self) -> Domain {
        Domain {
            id: self.id,
            name: self.name,
            logo_url: self.logo_url,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct DomainSummaryRecord {
    #[sqlx(flatten)]
    domain: DomainRecord,
    session_count: i64,
    question_count: i64,
}

#[derive(FromRow)]
struct ConfigurationRecord {
    domain_id: Uuid,
    tier_e: i32,
    tier_d: i32,
    tier_c: i32,
    tier_b: i32,
    tier_a: i32,
    updated_at: DateTime<Utc>,
}
impl ConfigurationRecord {
    fn to_domain(self) -> PortResult<DomainConfiguration> {
        Ok(DomainConfiguration {
            domain_id: self.domain_id,
            quotas: TierQuotas {
                e: to_count(self.tier_e, "tier_e")?,
                d: to_count(self.tier_d, "tier_d")?,
                c: to_count(self.tier_c, "tier_c")?,
                b: to_count(self.tier_b, "tier_b")?,
                a: to_count(self.tier_a, "tier_a")?,
            },
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    domain_id: Option<Uuid>,
    company_interview_id: Option<Uuid>,
    question_text: String,
    ideal_answer: String,
    audio_url: Option<String>,
    difficulty: String,
    pinned: bool,
    position: i32,
}
impl QuestionRecord {
    fn to_domain(self) -> PortResult<Question> {
        let owner = match (self.domain_id, self.company_interview_id) {
            (Some(domain_id), None) => QuestionOwner::Domain(domain_id),
            (None, Some(interview_id)) => QuestionOwner::Interview(interview_id),
            _ => {
                return Err(PortError::Unexpected(format!(
                    "question {} has no single owner",
                    self.id
                )))
            }
        };
        let difficulty = self
            .difficulty
            .parse::<Difficulty>()
            .map_err(PortError::Unexpected)?;
        Ok(Question {
            id: self.id,
            owner,
            text: self.question_text,
            ideal_answer: self.ideal_answer,
            audio_url: self.audio_url,
            difficulty,
            pinned: self.pinned,
            position: to_count(self.position, "position")?,
        })
    }
}

const QUESTION_COLUMNS: &str = "q.id, q.domain_id, q.company_interview_id, q.question_text, \
     q.ideal_answer, q.audio_url, q.difficulty, q.pinned, q.position";

#[derive(FromRow)]
struct InterviewRecord {
    id: Uuid,
    company_id: Uuid,
    title: String,
    is_active: bool,
    tier_e: Option<i32>,
    tier_d: Option<i32>,
    tier_c: Option<i32>,
    tier_b: Option<i32>,
    tier_a: Option<i32>,
    created_at: DateTime<Utc>,
}
impl InterviewRecord {
    fn to_domain(self) -> PortResult<CompanyInterview> {
        let quotas = match (self.tier_e, self.tier_d, self.tier_c, self.tier_b, self.tier_a) {
            (Some(e), Some(d), Some(c), Some(b), Some(a)) => Some(TierQuotas {
                e: to_count(e, "tier_e")?,
                d: to_count(d, "tier_d")?,
                c: to_count(c, "tier_c")?,
                b: to_count(b, "tier_b")?,
                a: to_count(a, "tier_a")?,
            }),
            _ => None,
        };
        Ok(CompanyInterview {
            id: self.id,
            company_id: self.company_id,
            title: self.title,
            is_active: self.is_active,
            quotas,
            created_at: self.created_at,
        })
    }
}

const INTERVIEW_COLUMNS: &str = "ci.id, ci.company_id, ci.title, ci.is_active, ci.tier_e, \
     ci.tier_d, ci.tier_c, ci.tier_b, ci.tier_a, ci.created_at";

#[derive(FromRow)]
struct InterviewSummaryRecord {
    #[sqlx(flatten)]
    interview: InterviewRecord,
    question_count: i64,
    invitation_count: i64,
    session_count: i64,
}

#[derive(FromRow)]
struct InvitationRecord {
    id: Uuid,
    company_interview_id: Uuid,
    candidate_email: String,
    token: String,
    is_used: bool,
    session_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl InvitationRecord {
    fn to_domain(self) -> Invitation {
        Invitation {
            id: self.id,
            interview_id: self.company_interview_id,
            candidate_email: self.candidate_email,
            token: self.token,
            is_used: self.is_used,
            session_id: self.session_id,
            created_at: self.created_at,
        }
    }
}

const INVITATION_COLUMNS: &str =
    "id, company_interview_id, candidate_email, token, is_used, session_id, created_at";

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Option<Uuid>,
    domain_id: Option<Uuid>,
    company_interview_id: Option<Uuid>,
    company_id: Option<Uuid>,
    candidate_email: Option<String>,
    question_count: i32,
    is_completed: bool,
    average_score: Option<f64>,
    started_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<Session> {
        let origin = match (
            self.user_id,
            self.domain_id,
            self.company_interview_id,
            self.company_id,
            self.candidate_email,
        ) {
            (Some(user_id), Some(domain_id), None, _, _) => {
                SessionOrigin::Practice { user_id, domain_id }
            }
            (None, None, Some(interview_id), Some(company_id), Some(candidate_email)) => {
                SessionOrigin::Candidate {
                    company_id,
                    interview_id,
                    candidate_email,
                }
            }
            _ => {
                return Err(PortError::Unexpected(format!(
                    "session {} has no recognisable origin",
                    self.id
                )))
            }
        };
        Ok(Session {
            id: self.id,
            origin,
            question_count: to_count(self.question_count, "question_count")?,
            is_completed: self.is_completed,
            average_score: self.average_score,
            started_at: self.started_at,
        })
    }
}

/// Sessions are always read joined with their interview to recover the owning company.
const SESSION_SELECT: &str = "SELECT s.id, s.user_id, s.domain_id, s.company_interview_id, \
     ci.company_id, s.candidate_email, s.question_count, s.is_completed, s.average_score, \
     s.started_at FROM sessions s LEFT JOIN company_interviews ci ON ci.id = s.company_interview_id";

#[derive(FromRow)]
struct PracticeSessionRecord {
    #[sqlx(flatten)]
    session: SessionRecord,
    domain_name: String,
    logo_url: Option<String>,
    answered: i64,
}

#[derive(FromRow)]
struct PlanRecord {
    session_id: Uuid,
    plan_order: i32,
    #[sqlx(flatten)]
    question: QuestionRecord,
}

#[derive(FromRow)]
struct ResponseRecord {
    id: Uuid,
    session_id: Uuid,
    question_id: Uuid,
    position: i32,
    audio_url: Option<String>,
    transcript: Option<String>,
    feedback: Option<String>,
    score: Option<i16>,
    submitted_at: DateTime<Utc>,
}
impl ResponseRecord {
    fn to_domain(self) -> PortResult<Response> {
        let score = self
            .score
            .map(|s| {
                u8::try_from(s)
                    .map_err(|_| PortError::Unexpected(format!("score out of range: {}", s)))
            })
            .transpose()?;
        Ok(Response {
            id: self.id,
            session_id: self.session_id,
            question_id: self.question_id,
            order: to_count(self.position, "position")?,
            audio_url: self.audio_url,
            transcript: self.transcript,
            feedback: self.feedback,
            score,
            submitted_at: self.submitted_at,
        })
    }
}

const RESPONSE_COLUMNS: &str = "id, session_id, question_id, position, audio_url, transcript, \
     feedback, score, submitted_at";

#[derive(FromRow)]
struct SavedCandidateRecord {
    id: Uuid,
    company_id: Uuid,
    session_id: Uuid,
    interview_id: Uuid,
    candidate_email: String,
    interview_title: String,
    average_score: Option<f64>,
    saved_at: DateTime<Utc>,
}
impl SavedCandidateRecord {
    fn to_domain(self) -> SavedCandidate {
        SavedCandidate {
            id: self.id,
            company_id: self.company_id,
            session_id: self.session_id,
            interview_id: self.interview_id,
            candidate_email: self.candidate_email,
            interview_title: self.interview_title,
            average_score: self.average_score,
            saved_at: self.saved_at,
        }
    }
}

const SAVED_COLUMNS: &str = "id, company_id, session_id, interview_id, candidate_email, \
     interview_title, average_score, saved_at";

#[derive(FromRow)]
struct ActivityRecord {
    id: Uuid,
    kind: String,
    description: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct StatsRecord {
    domains: i64,
    questions: i64,
    practice_sessions: i64,
    candidate_sessions: i64,
    company_interviews: i64,
}

//=========================================================================================
// Transaction Helpers
//=========================================================================================

/// Inserts a session and its ordered question plan on an open connection.
async fn insert_session(conn: &mut PgConnection, session: NewSession) -> PortResult<Session> {
    let question_count = i32::try_from(session.question_ids.len())
        .map_err(|_| PortError::Unexpected("question plan too large".to_string()))?;
    let (user_id, domain_id, interview_id, candidate_email) = match &session.origin {
        SessionOrigin::Practice { user_id, domain_id } => {
            (Some(*user_id), Some(*domain_id), None, None)
        }
        SessionOrigin::Candidate {
            interview_id,
            candidate_email,
            ..
        } => (None, None, Some(*interview_id), Some(candidate_email.clone())),
    };

    let (id, started_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        r#"INSERT INTO sessions (user_id, domain_id, company_interview_id, candidate_email, question_count)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id, started_at"#,
    )
    .bind(user_id)
    .bind(domain_id)
    .bind(interview_id)
    .bind(candidate_email)
    .bind(question_count)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error)?;

    for (index, question_id) in session.question_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO session_questions (session_id, question_id, position) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(question_id)
        .bind(index as i32 + 1)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }

    Ok(Session {
        id,
        origin: session.origin,
        question_count: question_count as u32,
        is_completed: false,
        average_score: None,
        started_at,
    })
}

async fn insert_invitations(
    conn: &mut PgConnection,
    interview_id: Uuid,
    invitations: Vec<NewInvitation>,
) -> PortResult<Vec<Invitation>> {
    let mut stored = Vec::with_capacity(invitations.len());
    for invitation in invitations {
        let record = sqlx::query_as::<_, InvitationRecord>(&format!(
            "INSERT INTO candidate_invitations (company_interview_id, candidate_email, token) \
             VALUES ($1, $2, $3) RETURNING {}",
            INVITATION_COLUMNS
        ))
        .bind(interview_id)
        .bind(&invitation.candidate_email)
        .bind(&invitation.token)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error)?;
        stored.push(record.to_domain());
    }
    Ok(stored)
}

fn quota_binds(quotas: Option<TierQuotas>) -> [Option<i32>; 5] {
    match quotas {
        Some(q) => [q.e, q.d, q.c, q.b, q.a].map(|n| Some(i32::try_from(n).unwrap_or(i32::MAX))),
        None => [None; 5],
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Domains ---
    async fn create_domain(&self, name: &str, logo_url: Option<&str>) -> PortResult<Domain> {
        let record = sqlx::query_as::<_, DomainRecord>(
            r#"INSERT INTO domains (name, logo_url) VALUES ($1, $2)
               RETURNING id, name, logo_url, created_at"#,
        )
        .bind(name)
        .bind(logo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(record.to_domain())
    }

    async fn update_domain(
        &self,
        domain_id: Uuid,
        name: &str,
        logo_url: Option<&str>,
    ) -> PortResult<Domain> {
        let record = sqlx::query_as::<_, DomainRecord>(
            r#"UPDATE domains SET name = $2, logo_url = $3 WHERE id = $1
               RETURNING id, name, logo_url, created_at"#,
        )
        .bind(domain_id)
        .bind(name)
        .bind(logo_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Domain", domain_id))?;
        Ok(record.to_domain())
    }

    async fn get_domain(&self, domain_id: Uuid) -> PortResult<Domain> {
        let record = sqlx::query_as::<_, DomainRecord>(
            "SELECT id, name, logo_url, created_at FROM domains WHERE id = $1",
        )
        .bind(domain_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Domain", domain_id))?;
        Ok(record.to_domain())
    }

    async fn list_domains(&self) -> PortResult<Vec<DomainSummary>> {
        let records = sqlx::query_as::<_, DomainSummaryRecord>(
            r#"SELECT d.id, d.name, d.logo_url, d.created_at,
                      (SELECT COUNT(*) FROM sessions s WHERE s.domain_id = d.id) AS session_count,
                      (SELECT COUNT(*) FROM questions q WHERE q.domain_id = d.id) AS question_count
               FROM domains d
               ORDER BY lower(d.name)"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(records
            .into_iter()
            .map(|r| DomainSummary {
                domain: r.domain.to_domain(),
                session_count: r.session_count,
                question_count: r.question_count,
            })
            .collect())
    }

    async fn delete_domain(&self, domain_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM domains WHERE id = $1")
            .bind(domain_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Domain", domain_id));
        }
        Ok(())
    }

    async fn get_configuration(&self, domain_id: Uuid) -> PortResult<DomainConfiguration> {
        sqlx::query_as::<_, ConfigurationRecord>(
            r#"SELECT domain_id, tier_e, tier_d, tier_c, tier_b, tier_a, updated_at
               FROM domain_configurations WHERE domain_id = $1"#,
        )
        .bind(domain_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Configuration for domain", domain_id))?
        .to_domain()
    }

    async fn upsert_configuration(
        &self,
        domain_id: Uuid,
        quotas: TierQuotas,
    ) -> PortResult<DomainConfiguration> {
        let [e, d, c, b, a] = quota_binds(Some(quotas));
        sqlx::query_as::<_, ConfigurationRecord>(
            r#"INSERT INTO domain_configurations (domain_id, tier_e, tier_d, tier_c, tier_b, tier_a)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (domain_id) DO UPDATE
               SET tier_e = EXCLUDED.tier_e, tier_d = EXCLUDED.tier_d, tier_c = EXCLUDED.tier_c,
                   tier_b = EXCLUDED.tier_b, tier_a = EXCLUDED.tier_a, updated_at = now()
               RETURNING domain_id, tier_e, tier_d, tier_c, tier_b, tier_a, updated_at"#,
        )
        .bind(domain_id)
        .bind(e)
        .bind(d)
        .bind(c)
        .bind(b)
        .bind(a)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?
        .to_domain()
    }

    // --- Questions ---
    async fn create_question(&self, question: NewQuestion) -> PortResult<Question> {
        let (domain_id, interview_id) = match question.owner {
            QuestionOwner::Domain(id) => (Some(id), None),
            QuestionOwner::Interview(id) => (None, Some(id)),
        };
        sqlx::query_as::<_, QuestionRecord>(&format!(
            r#"INSERT INTO questions AS q
                   (domain_id, company_interview_id, question_text, ideal_answer, difficulty, pinned, position)
               VALUES ($1, $2, $3, $4, $5, $6,
                   (SELECT COALESCE(MAX(position), 0) + 1 FROM questions
                    WHERE domain_id IS NOT DISTINCT FROM $1
                      AND company_interview_id IS NOT DISTINCT FROM $2))
               RETURNING {}"#,
            QUESTION_COLUMNS
        ))
        .bind(domain_id)
        .bind(interview_id)
        .bind(&question.text)
        .bind(&question.ideal_answer)
        .bind(question.difficulty.as_str())
        .bind(question.pinned)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?
        .to_domain()
    }

    async fn update_question(
        &self,
        question_id: Uuid,
        update: QuestionUpdate,
    ) -> PortResult<Question> {
        sqlx::query_as::<_, QuestionRecord>(&format!(
            r#"UPDATE questions AS q
               SET question_text = $2, ideal_answer = $3, difficulty = $4
               WHERE q.id = $1
               RETURNING {}"#,
            QUESTION_COLUMNS
        ))
        .bind(question_id)
        .bind(&update.text)
        .bind(&update.ideal_answer)
        .bind(update.difficulty.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Question", question_id))?
        .to_domain()
    }

    async fn set_question_audio(&self, question_id: Uuid, audio_url: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE questions SET audio_url = $2 WHERE id = $1")
            .bind(question_id)
            .bind(audio_url)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Question", question_id));
        }
        Ok(())
    }

    async fn get_question(&self, question_id: Uuid) -> PortResult<Question> {
        sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions q WHERE q.id = $1",
            QUESTION_COLUMNS
        ))
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Question", question_id))?
        .to_domain()
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Question", question_id));
        }
        Ok(())
    }

    async fn list_domain_questions(&self, domain_id: Uuid) -> PortResult<Vec<Question>> {
        sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions q WHERE q.domain_id = $1 ORDER BY q.position",
            QUESTION_COLUMNS
        ))
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(QuestionRecord::to_domain)
        .collect()
    }

    async fn list_interview_questions(&self, interview_id: Uuid) -> PortResult<Vec<Question>> {
        sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions q WHERE q.company_interview_id = $1 ORDER BY q.position",
            QUESTION_COLUMNS
        ))
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(QuestionRecord::to_domain)
        .collect()
    }

    // --- Company Interviews ---
    async fn create_company_interview(
        &self,
        interview: NewCompanyInterview,
    ) -> PortResult<CompanyInterview> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let [e, d, c, b, a] = quota_binds(interview.quotas);

        let stored = sqlx::query_as::<_, InterviewRecord>(&format!(
            r#"INSERT INTO company_interviews AS ci
                   (company_id, title, tier_e, tier_d, tier_c, tier_b, tier_a)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {}"#,
            INTERVIEW_COLUMNS
        ))
        .bind(interview.company_id)
        .bind(&interview.title)
        .bind(e)
        .bind(d)
        .bind(c)
        .bind(b)
        .bind(a)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?
        .to_domain()?;

        for (index, draft) in interview.questions.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO questions
                       (company_interview_id, question_text, ideal_answer, difficulty, pinned, position)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(stored.id)
            .bind(&draft.text)
            .bind(&draft.ideal_answer)
            .bind(draft.difficulty.as_str())
            .bind(draft.pinned)
            .bind(index as i32 + 1)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        insert_invitations(&mut tx, stored.id, interview.invitations).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(stored)
    }

    async fn get_company_interview(&self, interview_id: Uuid) -> PortResult<CompanyInterview> {
        sqlx::query_as::<_, InterviewRecord>(&format!(
            "SELECT {} FROM company_interviews ci WHERE ci.id = $1",
            INTERVIEW_COLUMNS
        ))
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Interview", interview_id))?
        .to_domain()
    }

    async fn list_company_interviews(
        &self,
        company_id: Uuid,
    ) -> PortResult<Vec<InterviewSummary>> {
        let records = sqlx::query_as::<_, InterviewSummaryRecord>(&format!(
            r#"SELECT {},
                      (SELECT COUNT(*) FROM questions q WHERE q.company_interview_id = ci.id) AS question_count,
                      (SELECT COUNT(*) FROM candidate_invitations i WHERE i.company_interview_id = ci.id) AS invitation_count,
                      (SELECT COUNT(*) FROM sessions s WHERE s.company_interview_id = ci.id) AS session_count
               FROM company_interviews ci
               WHERE ci.company_id = $1
               ORDER BY ci.created_at DESC"#,
            INTERVIEW_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        records
            .into_iter()
            .map(|r| {
                Ok(InterviewSummary {
                    interview: r.interview.to_domain()?,
                    question_count: r.question_count,
                    invitation_count: r.invitation_count,
                    session_count: r.session_count,
                })
            })
            .collect()
    }

    async fn deactivate_interview(&self, interview_id: Uuid) -> PortResult<bool> {
        let flipped = sqlx::query_scalar::<_, Uuid>(
            "UPDATE company_interviews SET is_active = FALSE WHERE id = $1 AND is_active RETURNING id",
        )
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        if flipped.is_some() {
            return Ok(true);
        }
        self.get_company_interview(interview_id).await?;
        Ok(false)
    }

    async fn delete_company_interview(&self, interview_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM company_interviews WHERE id = $1 FOR UPDATE",
        )
        .bind(interview_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;
        if exists.is_none() {
            return Err(not_found("Interview", interview_id));
        }

        let ordered_deletes = [
            "DELETE FROM responses WHERE session_id IN \
             (SELECT id FROM sessions WHERE company_interview_id = $1)",
            "DELETE FROM session_questions WHERE session_id IN \
             (SELECT id FROM sessions WHERE company_interview_id = $1)",
            "DELETE FROM saved_candidates WHERE session_id IN \
             (SELECT id FROM sessions WHERE company_interview_id = $1)",
            "DELETE FROM candidate_invitations WHERE company_interview_id = $1",
            "DELETE FROM sessions WHERE company_interview_id = $1",
            "DELETE FROM questions WHERE company_interview_id = $1",
            "DELETE FROM company_interviews WHERE id = $1",
        ];
        for statement in ordered_deletes {
            sqlx::query(statement)
                .bind(interview_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    // --- Invitations ---
    async fn create_invitations(
        &self,
        interview_id: Uuid,
        invitations: Vec<NewInvitation>,
    ) -> PortResult<Vec<Invitation>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let stored = insert_invitations(&mut tx, interview_id, invitations).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(stored)
    }

    async fn token_exists(&self, token: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM candidate_invitations WHERE token = $1)",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn find_invitation_by_token(&self, token: &str) -> PortResult<Invitation> {
        let record = sqlx::query_as::<_, InvitationRecord>(&format!(
            "SELECT {} FROM candidate_invitations WHERE token = $1",
            INVITATION_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| PortError::NotFound("Invitation not found".to_string()))?;
        Ok(record.to_domain())
    }

    async fn list_invitations(&self, interview_id: Uuid) -> PortResult<Vec<Invitation>> {
        let records = sqlx::query_as::<_, InvitationRecord>(&format!(
            "SELECT {} FROM candidate_invitations WHERE company_interview_id = $1 ORDER BY created_at",
            INVITATION_COLUMNS
        ))
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(records.into_iter().map(InvitationRecord::to_domain).collect())
    }

    async fn redeem_invitation(
        &self,
        invitation_id: Uuid,
        session: NewSession,
    ) -> PortResult<Session> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // The conditional update is the single-use gate: only one caller flips it.
        let claimed = sqlx::query_scalar::<_, Uuid>(
            "UPDATE candidate_invitations SET is_used = TRUE WHERE id = $1 AND NOT is_used RETURNING id",
        )
        .bind(invitation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;
        if claimed.is_none() {
            return Err(PortError::AlreadyClaimed("invitation already used".to_string()));
        }

        let stored = insert_session(&mut tx, session).await?;
        sqlx::query("UPDATE candidate_invitations SET session_id = $2 WHERE id = $1")
            .bind(invitation_id)
            .bind(stored.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(stored)
    }

    // --- Sessions ---
    async fn create_session(&self, session: NewSession) -> PortResult<Session> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let stored = insert_session(&mut tx, session).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(stored)
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        sqlx::query_as::<_, SessionRecord>(&format!("{} WHERE s.id = $1", SESSION_SELECT))
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| not_found("Session", session_id))?
            .to_domain()
    }

    async fn list_user_sessions(&self, user_id: Uuid) -> PortResult<Vec<PracticeSessionSummary>> {
        let records = sqlx::query_as::<_, PracticeSessionRecord>(
            r#"SELECT s.id, s.user_id, s.domain_id, s.company_interview_id,
                      NULL::uuid AS company_id, s.candidate_email, s.question_count,
                      s.is_completed, s.average_score, s.started_at,
                      d.name AS domain_name, d.logo_url,
                      (SELECT COUNT(*) FROM responses r WHERE r.session_id = s.id) AS answered
               FROM sessions s
               JOIN domains d ON d.id = s.domain_id
               WHERE s.user_id = $1
               ORDER BY s.started_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        records
            .into_iter()
            .map(|r| {
                Ok(PracticeSessionSummary {
                    session: r.session.to_domain()?,
                    domain_name: r.domain_name,
                    logo_url: r.logo_url,
                    answered: r.answered,
                })
            })
            .collect()
    }

    async fn list_interview_sessions(&self, interview_id: Uuid) -> PortResult<Vec<Session>> {
        sqlx::query_as::<_, SessionRecord>(&format!(
            "{} WHERE s.company_interview_id = $1 ORDER BY s.started_at",
            SESSION_SELECT
        ))
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(SessionRecord::to_domain)
        .collect()
    }

    async fn session_plan(&self, session_id: Uuid) -> PortResult<Vec<SessionQuestion>> {
        let records = sqlx::query_as::<_, PlanRecord>(&format!(
            r#"SELECT sq.session_id, sq.position AS plan_order, {}
               FROM session_questions sq
               JOIN questions q ON q.id = sq.question_id
               WHERE sq.session_id = $1
               ORDER BY sq.position"#,
            QUESTION_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        records
            .into_iter()
            .map(|r| {
                Ok(SessionQuestion {
                    session_id: r.session_id,
                    order: to_count(r.plan_order, "plan_order")?,
                    question: r.question.to_domain()?,
                })
            })
            .collect()
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Session", session_id));
        }
        Ok(())
    }

    // --- Responses ---
    async fn record_response(&self, response: NewResponse) -> PortResult<RecordedResponse> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let question_count = sqlx::query_scalar::<_, i32>(
            "SELECT question_count FROM sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(response.session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Session", response.session_id))?;

        let stored = sqlx::query_as::<_, ResponseRecord>(&format!(
            r#"INSERT INTO responses (session_id, question_id, position, audio_url, transcript)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {}"#,
            RESPONSE_COLUMNS
        ))
        .bind(response.session_id)
        .bind(response.question_id)
        .bind(response.order as i32)
        .bind(&response.audio_url)
        .bind(&response.transcript)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?
        .to_domain()?;

        let answered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM responses WHERE session_id = $1",
        )
        .bind(response.session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let session_completed = answered >= i64::from(question_count);
        if session_completed {
            sqlx::query("UPDATE sessions SET is_completed = TRUE WHERE id = $1")
                .bind(response.session_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(RecordedResponse {
            response: stored,
            session_completed,
        })
    }

    async fn get_response(&self, response_id: Uuid) -> PortResult<Response> {
        sqlx::query_as::<_, ResponseRecord>(&format!(
            "SELECT {} FROM responses WHERE id = $1",
            RESPONSE_COLUMNS
        ))
        .bind(response_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Response", response_id))?
        .to_domain()
    }

    async fn list_responses(&self, session_id: Uuid) -> PortResult<Vec<Response>> {
        sqlx::query_as::<_, ResponseRecord>(&format!(
            "SELECT {} FROM responses WHERE session_id = $1 ORDER BY position",
            RESPONSE_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(ResponseRecord::to_domain)
        .collect()
    }

    async fn record_evaluation(
        &self,
        response_id: Uuid,
        evaluation: Evaluation,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            r#"UPDATE responses
               SET score = $2, feedback = $3, transcript = COALESCE($4, transcript)
               WHERE id = $1 AND score IS NULL"#,
        )
        .bind(response_id)
        .bind(i16::from(evaluation.score))
        .bind(&evaluation.feedback)
        .bind(&evaluation.transcription)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.get_response(response_id).await?;
        Ok(false)
    }

    async fn finalize_session_score(&self, session_id: Uuid, score: f64) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET average_score = $2 WHERE id = $1 AND average_score IS NULL",
        )
        .bind(session_id)
        .bind(score)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() == 1)
    }

    // --- Saved Candidates ---
    async fn save_candidate(&self, saved: NewSavedCandidate) -> PortResult<SavedCandidate> {
        let record = sqlx::query_as::<_, SavedCandidateRecord>(&format!(
            r#"INSERT INTO saved_candidates
                   (company_id, session_id, interview_id, candidate_email, interview_title, average_score)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            SAVED_COLUMNS
        ))
        .bind(saved.company_id)
        .bind(saved.session_id)
        .bind(saved.interview_id)
        .bind(&saved.candidate_email)
        .bind(&saved.interview_title)
        .bind(saved.average_score)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(record.to_domain())
    }

    async fn find_saved_candidate(
        &self,
        company_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Option<SavedCandidate>> {
        let record = sqlx::query_as::<_, SavedCandidateRecord>(&format!(
            "SELECT {} FROM saved_candidates WHERE company_id = $1 AND session_id = $2",
            SAVED_COLUMNS
        ))
        .bind(company_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(record.map(SavedCandidateRecord::to_domain))
    }

    async fn get_saved_candidate(&self, saved_id: Uuid) -> PortResult<SavedCandidate> {
        let record = sqlx::query_as::<_, SavedCandidateRecord>(&format!(
            "SELECT {} FROM saved_candidates WHERE id = $1",
            SAVED_COLUMNS
        ))
        .bind(saved_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Saved candidate", saved_id))?;
        Ok(record.to_domain())
    }

    async fn list_saved_candidates(&self, company_id: Uuid) -> PortResult<Vec<SavedCandidate>> {
        let records = sqlx::query_as::<_, SavedCandidateRecord>(&format!(
            "SELECT {} FROM saved_candidates WHERE company_id = $1 ORDER BY saved_at DESC",
            SAVED_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(records
            .into_iter()
            .map(SavedCandidateRecord::to_domain)
            .collect())
    }

    async fn delete_saved_candidate(&self, saved_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM saved_candidates WHERE id = $1")
            .bind(saved_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Saved candidate", saved_id));
        }
        Ok(())
    }

    // --- Activity & Stats ---
    async fn append_activity(&self, kind: &str, description: &str) -> PortResult<()> {
        sqlx::query("INSERT INTO activity_logs (kind, description) VALUES ($1, $2)")
            .bind(kind)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn recent_activity(&self, limit: u32) -> PortResult<Vec<ActivityEntry>> {
        let records = sqlx::query_as::<_, ActivityRecord>(
            r#"SELECT id, kind, description, created_at
               FROM activity_logs
               ORDER BY created_at DESC
               LIMIT $1"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(records
            .into_iter()
            .map(|r| ActivityEntry {
                id: r.id,
                kind: r.kind,
                description: r.description,
                timestamp: r.created_at,
            })
            .collect())
    }

    async fn dashboard_stats(&self) -> PortResult<DashboardStats> {
        let record = sqlx::query_as::<_, StatsRecord>(
            r#"SELECT
                   (SELECT COUNT(*) FROM domains) AS domains,
                   (SELECT COUNT(*) FROM questions WHERE domain_id IS NOT NULL) AS questions,
                   (SELECT COUNT(*) FROM sessions WHERE domain_id IS NOT NULL) AS practice_sessions,
                   (SELECT COUNT(*) FROM sessions WHERE company_interview_id IS NOT NULL) AS candidate_sessions,
                   (SELECT COUNT(*) FROM company_interviews) AS company_interviews"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(DashboardStats {
            domains: record.domains,
            questions: record.questions,
            practice_sessions: record.practice_sessions,
            candidate_sessions: record.candidate_sessions,
            company_interviews: record.company_interviews,
        })
    }
}

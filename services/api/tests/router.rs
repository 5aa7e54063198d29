//! End-to-end checks of the HTTP surface over the in-memory store.

use api_lib::adapters::LocalAudioStorage;
use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use axum::Router;
use interview_core::domain::{Evaluation, EvaluationRequest};
use interview_core::memory::MemoryStore;
use interview_core::ports::{EvaluationService, PortResult};
use interview_core::{EvaluationMode, InterviewPlatform};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "interview-test-boundary";

struct FixedEvaluator;

#[async_trait]
impl EvaluationService for FixedEvaluator {
    async fn evaluate(&self, _request: &EvaluationRequest) -> PortResult<Evaluation> {
        Ok(Evaluation::from_raw("Well structured".to_string(), 75.0, None))
    }
}

fn test_app() -> Router {
    test_app_with_audio_dir().0
}

/// The app plus the directory its audio storage writes to.
fn test_app_with_audio_dir() -> (Router, PathBuf) {
    let audio_dir = std::env::temp_dir().join(format!("interview-router-{}", Uuid::new_v4()));
    let vars: HashMap<&str, String> = [
        ("DATABASE_URL", "postgres://unused".to_string()),
        ("AUDIO_STORAGE_DIR", audio_dir.display().to_string()),
    ]
    .into_iter()
    .collect();
    let config = Arc::new(Config::from_lookup(|key| vars.get(key).cloned()).unwrap());

    let platform = InterviewPlatform::builder(Arc::new(MemoryStore::new()), Arc::new(FixedEvaluator))
        .evaluation_mode(EvaluationMode::Inline)
        .build();
    let storage = Arc::new(LocalAudioStorage::new(
        config.audio_storage_dir.clone(),
        config.audio_public_base_url.clone(),
    ));
    let state = Arc::new(AppState {
        platform,
        config,
        transcriber: None,
        storage,
    });
    (build_router(state).unwrap(), audio_dir)
}

fn stored_audio_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

struct Caller {
    id: Uuid,
    role: &'static str,
}

impl Caller {
    fn new(role: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
        }
    }
}

fn request(method: Method, uri: &str, caller: Option<&Caller>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header("x-user-id", caller.id.to_string())
            .header("x-user-role", caller.role);
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn transcript_upload(uri: &str, caller: Option<&Caller>, order: u32, transcript: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"order\"\r\n\r\n{order}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"transcript\"\r\n\r\n{transcript}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
    );
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header("x-user-id", caller.id.to_string())
            .header("x-user-role", caller.role);
    }
    builder
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn audio_upload(uri: &str, caller: Option<&Caller>, order: u32) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"order\"\r\n\r\n{order}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"answer.webm\"\r\n\
         Content-Type: audio/webm\r\n\r\n",
        b = BOUNDARY,
    )
    .into_bytes();
    body.extend_from_slice(&[0x1a, 0x45, 0xdf, 0xa3, 0x00, 0x01]);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header("x-user-id", caller.id.to_string())
            .header("x-user-role", caller.role);
    }
    builder
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Creates a domain whose sessions ask exactly one tier E question.
async fn seeded_domain(app: &Router, admin: &Caller) -> String {
    let (status, domain) = send(
        app,
        request(
            Method::POST,
            "/admin/domains",
            Some(admin),
            Some(json!({"name": "Backend Engineering"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let domain_id = domain["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        request(
            Method::PUT,
            &format!("/admin/domains/{}/configuration", domain_id),
            Some(admin),
            Some(json!({"e": 1, "d": 0, "c": 0, "b": 0, "a": 0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        request(
            Method::POST,
            &format!("/admin/domains/{}/questions", domain_id),
            Some(admin),
            Some(json!({
                "text": "What is a mutex?",
                "ideal_answer": "A lock granting exclusive access",
                "difficulty": "E"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    domain_id
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_need_identity_headers() {
    let app = test_app();
    let (status, body) = send(&app, request(Method::GET, "/user/sessions", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn role_groups_reject_other_roles() {
    let app = test_app();
    let user = Caller::new("regular");
    let company = Caller::new("company");

    let (status, body) = send(&app, request(Method::GET, "/admin/stats", Some(&user), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = send(&app, request(Method::GET, "/user/sessions", Some(&company), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_domains_show_up_in_the_public_catalog() {
    let app = test_app();
    let admin = Caller::new("admin");
    seeded_domain(&app, &admin).await;

    let (status, body) = send(&app, request(Method::GET, "/public/domains", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let domains = body.as_array().unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0]["name"], "Backend Engineering");
    assert_eq!(domains[0]["question_count"], 1);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/admin/domains",
            Some(&admin),
            Some(json!({"name": "backend engineering"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn practice_session_runs_from_start_to_results() {
    let app = test_app();
    let admin = Caller::new("admin");
    let user = Caller::new("regular");
    let domain_id = seeded_domain(&app, &admin).await;

    let (status, started) = send(
        &app,
        request(
            Method::POST,
            "/user/sessions",
            Some(&user),
            Some(json!({"domain_id": domain_id})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["total_questions"], 1);
    assert_eq!(started["first_question"]["text"], "What is a mutex?");
    assert!(started["first_question"].get("ideal_answer").is_none());
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let (status, receipt) = send(
        &app,
        transcript_upload(
            &format!("/user/sessions/{}/responses", session_id),
            Some(&user),
            1,
            "It serializes access to shared state",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["session_completed"], true);
    assert_eq!(receipt["evaluation"], "scored");

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/user/sessions/{}/next-question", session_id),
            Some(&user),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NO_MORE_QUESTIONS");

    let (status, results) = send(
        &app,
        request(
            Method::GET,
            &format!("/user/sessions/{}/results", session_id),
            Some(&user),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["status"], "complete");
    assert_eq!(results["aggregate_score"], 75.0);
    assert_eq!(results["responses"][0]["feedback"], "Well structured");

    let stranger = Caller::new("regular");
    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/user/sessions/{}/results", session_id),
            Some(&stranger),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answers_need_an_order() {
    let app = test_app();
    let admin = Caller::new("admin");
    let user = Caller::new("regular");
    let domain_id = seeded_domain(&app, &admin).await;
    let (_, started) = send(
        &app,
        request(
            Method::POST,
            "/user/sessions",
            Some(&user),
            Some(json!({"domain_id": domain_id})),
        ),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap();

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"transcript\"\r\n\r\nan answer\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let upload = Request::builder()
        .method(Method::POST)
        .uri(format!("/user/sessions/{}/responses", session_id))
        .header("x-user-id", user.id.to_string())
        .header("x-user-role", user.role)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(&app, upload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn candidate_link_is_single_use() {
    let app = test_app();
    let company = Caller::new("company");

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/company/interviews",
            Some(&company),
            Some(json!({
                "title": "Backend Engineer",
                "questions": [
                    {"text": "Introduce yourself", "ideal_answer": "Background and motivation", "difficulty": "E", "pinned": true},
                    {"text": "Design a job queue", "ideal_answer": "Durable, at-least-once delivery", "difficulty": "A"}
                ],
                "candidate_emails": ["ana@example.com"]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let link = created["invitations"][0]["link"].as_str().unwrap();
    assert!(link.starts_with("http://localhost:5173/candidate-interview/"));
    let token = link.rsplit('/').next().unwrap().to_string();
    let interview_id = created["interview"]["id"].as_str().unwrap().to_string();

    let start = |email: &str| {
        request(
            Method::POST,
            &format!("/candidate/{}/start", token),
            None,
            Some(json!({"email": email})),
        )
    };

    let (status, body) = send(&app, start("not-an-email")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "email");

    let (status, body) = send(&app, start("bob@example.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "EMAIL_MISMATCH");

    let (status, started) = send(&app, start("ANA@example.com")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["interview_title"], "Backend Engineer");
    assert_eq!(started["first_question"]["text"], "Introduce yourself");

    let (status, body) = send(&app, start("ana@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TOKEN_ALREADY_USED");

    for order in 1..=2 {
        let (status, receipt) = send(
            &app,
            transcript_upload(
                &format!("/candidate/{}/responses", token),
                None,
                order,
                "a considered answer",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(receipt.get("evaluation").is_none());
    }

    let (status, results) = send(
        &app,
        request(
            Method::GET,
            &format!("/company/interviews/{}/results", interview_id),
            Some(&company),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results[0]["candidate_email"], "ana@example.com");
    assert_eq!(results[0]["aggregate_score"], 75.0);

    let rival = Caller::new("company");
    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/company/interviews/{}", interview_id),
            Some(&rival),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_candidate_token_is_not_found() {
    let app = test_app();
    let (status, body) = send(
        &app,
        request(Method::GET, "/candidate/does-not-exist/next-question", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app();
    let (status, body) = send(&app, request(Method::GET, "/api-docs/openapi.json", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/candidate/{token}/start").is_some());
}

#[tokio::test]
async fn rejected_audio_answers_leave_nothing_in_storage() {
    let (app, audio_dir) = test_app_with_audio_dir();
    let admin = Caller::new("admin");
    let user = Caller::new("regular");
    let company = Caller::new("company");

    let (status, body) = send(&app, audio_upload("/candidate/no-such-token/responses", None, 1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "INVALID_TOKEN");
    assert_eq!(stored_audio_files(&audio_dir), 0);

    let domain_id = seeded_domain(&app, &admin).await;
    let (_, started) = send(
        &app,
        request(
            Method::POST,
            "/user/sessions",
            Some(&user),
            Some(json!({"domain_id": domain_id})),
        ),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap().to_string();
    let stranger = Caller::new("regular");
    let (status, _) = send(
        &app,
        audio_upload(
            &format!("/user/sessions/{}/responses", session_id),
            Some(&stranger),
            1,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(stored_audio_files(&audio_dir), 0);

    let (_, created) = send(
        &app,
        request(
            Method::POST,
            "/company/interviews",
            Some(&company),
            Some(json!({
                "title": "Platform Engineer",
                "questions": [
                    {"text": "Introduce yourself", "ideal_answer": "Background", "difficulty": "E", "pinned": true},
                    {"text": "Explain backpressure", "ideal_answer": "Slow producers down", "difficulty": "C", "pinned": true}
                ],
                "candidate_emails": ["ana@example.com"]
            })),
        ),
    )
    .await;
    let link = created["invitations"][0]["link"].as_str().unwrap();
    let token = link.rsplit('/').next().unwrap().to_string();
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/candidate/{}/start", token),
            None,
            Some(json!({"email": "ana@example.com"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let responses_uri = format!("/candidate/{}/responses", token);
    let (status, _) = send(&app, transcript_upload(&responses_uri, None, 1, "Hello there")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, audio_upload(&responses_uri, None, 1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_RESPONSE");
    assert_eq!(stored_audio_files(&audio_dir), 0);

    let (status, _) = send(&app, audio_upload(&responses_uri, None, 2)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored_audio_files(&audio_dir), 1);
    std::fs::remove_dir_all(&audio_dir).unwrap();
}

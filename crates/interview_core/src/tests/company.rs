use uuid::Uuid;

use super::common::*;
use crate::access::Actor;
use crate::domain::{Difficulty, QuestionDraft, TierQuotas};
use crate::error::InterviewError;
use crate::ports::DatabaseService;
use crate::sessions::EvaluationMode;

fn mixed_questions() -> Vec<QuestionDraft> {
    vec![
        draft("Design a job queue", Difficulty::A, false),
        draft("Introduce yourself", Difficulty::E, true),
        draft("What is a mutex?", Difficulty::D, false),
        draft("Why this company?", Difficulty::E, true),
    ]
}

/// Redeems the invitation for `email` and answers every question.
async fn complete_candidate(
    h: &Harness,
    created: &crate::company::CreatedInterview,
    email: &str,
) -> Uuid {
    let token = token_for(created, email);
    let redeemed = h.platform.candidate_start(&token, email).await.unwrap();
    for order in 1..=redeemed.session.question_count {
        h.platform
            .candidate_submit(&token, order, answer("a considered answer"))
            .await
            .unwrap();
    }
    redeemed.session.id
}

#[tokio::test]
async fn pinned_questions_open_every_candidate_session() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    let created =
        create_interview(&h, &company, mixed_questions(), None, &["ana@example.com"]).await;

    let redeemed = h
        .platform
        .candidate_start(&token_for(&created, "ana@example.com"), "ana@example.com")
        .await
        .unwrap();
    let plan = h.store.session_plan(redeemed.session.id).await.unwrap();
    let texts: Vec<_> = plan.iter().map(|p| p.question.text.as_str()).collect();

    assert_eq!(
        texts,
        vec![
            "Introduce yourself",
            "Why this company?",
            "What is a mutex?",
            "Design a job queue"
        ]
    );
}

#[tokio::test]
async fn interview_needs_questions() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    let result = h
        .platform
        .company
        .create(
            &company,
            crate::company::CreateInterview {
                title: "Empty".to_string(),
                questions: Vec::new(),
                questions_per_tier: Some(TierQuotas::default()),
                candidate_emails: vec!["ana@example.com".to_string()],
            },
        )
        .await;
    assert!(matches!(result, Err(InterviewError::EmptyQuestionPool)));
}

#[tokio::test]
async fn duplicate_and_malformed_emails_are_rejected() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    for emails in [
        vec!["ana@example.com".to_string(), "ANA@example.com".to_string()],
        vec!["not-an-email".to_string()],
    ] {
        let result = h
            .platform
            .company
            .create(
                &company,
                crate::company::CreateInterview {
                    title: "Backend Engineer".to_string(),
                    questions: mixed_questions(),
                    questions_per_tier: None,
                    candidate_emails: emails,
                },
            )
            .await;
        assert!(matches!(result, Err(InterviewError::Validation(_))));
    }
    assert!(h.platform.company.list(&company).await.unwrap().is_empty());
}

#[tokio::test]
async fn finishing_twice_is_a_conflict() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    let created = create_interview(&h, &company, mixed_questions(), None, &[]).await;

    let finished = h
        .platform
        .company
        .finish(&company, created.interview.id)
        .await
        .unwrap();
    assert!(!finished.is_active);

    let again = h.platform.company.finish(&company, created.interview.id).await;
    assert!(matches!(again, Err(InterviewError::Conflict(_))));
    let invite = h
        .platform
        .company
        .invite(&company, created.interview.id, &["late@example.com".to_string()])
        .await;
    assert!(matches!(invite, Err(InterviewError::InterviewClosed)));
}

#[tokio::test]
async fn other_companies_cannot_see_the_interview() {
    let h = harness();
    let owner = Actor::company(Uuid::new_v4());
    let rival = Actor::company(Uuid::new_v4());
    let created =
        create_interview(&h, &owner, mixed_questions(), None, &["ana@example.com"]).await;
    let session_id = complete_candidate(&h, &created, "ana@example.com").await;

    let detail = h.platform.company.get(&rival, created.interview.id).await;
    assert!(matches!(detail, Err(InterviewError::NotFoundOrDenied)));
    let results = h.platform.company.results(&rival, created.interview.id).await;
    assert!(matches!(results, Err(InterviewError::NotFoundOrDenied)));
    let saved = h.platform.company.save_candidate(&rival, session_id).await;
    assert!(matches!(saved, Err(InterviewError::NotFoundOrDenied)));
    assert!(h.platform.company.list(&rival).await.unwrap().is_empty());

    let admin_view = h
        .platform
        .company
        .get(&h.admin, created.interview.id)
        .await
        .expect("admins see every interview");
    assert_eq!(admin_view.questions.len(), 4);
}

#[tokio::test]
async fn candidate_can_be_saved_only_once() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    let created =
        create_interview(&h, &company, mixed_questions(), None, &["ana@example.com"]).await;
    let session_id = complete_candidate(&h, &created, "ana@example.com").await;
    h.platform
        .company
        .results(&company, created.interview.id)
        .await
        .unwrap();

    let saved = h
        .platform
        .company
        .save_candidate(&company, session_id)
        .await
        .expect("first save succeeds");
    assert_eq!(saved.candidate_email, "ana@example.com");
    assert_eq!(saved.interview_title, "Backend Engineer");
    assert_eq!(saved.average_score, Some(80.0));

    let again = h.platform.company.save_candidate(&company, session_id).await;
    assert!(matches!(again, Err(InterviewError::Conflict(_))));
    assert_eq!(h.platform.company.list_saved(&company).await.unwrap().len(), 1);

    let detail = h
        .platform
        .company
        .session_detail(&company, session_id)
        .await
        .unwrap();
    assert_eq!(detail.saved_candidate_id, Some(saved.id));

    h.platform
        .company
        .remove_saved(&company, saved.id)
        .await
        .unwrap();
    assert!(h.platform.company.list_saved(&company).await.unwrap().is_empty());
}

#[tokio::test]
async fn bookmarking_shows_up_in_the_activity_feed() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    let created =
        create_interview(&h, &company, mixed_questions(), None, &["ana@example.com"]).await;
    let session_id = complete_candidate(&h, &created, "ana@example.com").await;

    let saved = h
        .platform
        .company
        .save_candidate(&company, session_id)
        .await
        .unwrap();
    h.platform
        .company
        .remove_saved(&company, saved.id)
        .await
        .unwrap();
    settle().await;

    let feed = h
        .platform
        .catalog
        .recent_activity(&h.admin, 50)
        .await
        .unwrap();
    let kinds: Vec<&str> = feed.iter().map(|e| e.kind.as_str()).collect();
    assert!(kinds.contains(&"candidate_saved"));
    assert!(kinds.contains(&"candidate_removed"));
    assert!(feed
        .iter()
        .any(|e| e.kind == "candidate_saved" && e.description.contains("ana@example.com")));
}

#[tokio::test]
async fn results_list_every_candidate_with_pending_work() {
    let h = harness_with(
        ScriptedEvaluator::scripted(vec![unavailable(), unavailable()]),
        EvaluationMode::Inline,
    );
    let company = Actor::company(Uuid::new_v4());
    let created = create_interview(
        &h,
        &company,
        vec![draft("Explain backpressure", Difficulty::C, false)],
        None,
        &["ana@example.com", "bob@example.com"],
    )
    .await;
    let ana = complete_candidate(&h, &created, "ana@example.com").await;
    h.platform
        .candidate_start(&token_for(&created, "bob@example.com"), "bob@example.com")
        .await
        .unwrap();

    h.evaluator.push(unavailable());
    h.evaluator.push(unavailable());
    let results = h
        .platform
        .company
        .results(&company, created.interview.id)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    let ana_row = results.iter().find(|r| r.session_id == ana).unwrap();
    assert!(ana_row.is_completed);
    assert_eq!(ana_row.pending_evaluations, 1);
    assert_eq!(ana_row.aggregate_score, None);
    let bob_row = results.iter().find(|r| r.session_id != ana).unwrap();
    assert!(!bob_row.is_completed);
    assert_eq!(bob_row.answered, 0);

    // The re-queued attempt fails again; the next poll queues one that succeeds.
    settle().await;
    let still_pending = h
        .platform
        .company
        .results(&company, created.interview.id)
        .await
        .unwrap();
    let ana_row = still_pending.iter().find(|r| r.session_id == ana).unwrap();
    assert_eq!(ana_row.pending_evaluations, 1);
    settle().await;

    let later = h
        .platform
        .company
        .results(&company, created.interview.id)
        .await
        .unwrap();
    let ana_row = later.iter().find(|r| r.session_id == ana).unwrap();
    assert_eq!(ana_row.pending_evaluations, 0);
    assert_eq!(ana_row.aggregate_score, Some(80.0));
}

#[tokio::test]
async fn deleting_an_interview_removes_its_sessions() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    let created =
        create_interview(&h, &company, mixed_questions(), None, &["ana@example.com"]).await;
    let session_id = complete_candidate(&h, &created, "ana@example.com").await;
    h.platform
        .company
        .save_candidate(&company, session_id)
        .await
        .unwrap();

    h.platform
        .company
        .delete(&company, created.interview.id)
        .await
        .expect("interview deleted");

    assert!(h.store.get_session(session_id).await.is_err());
    assert!(h.store.list_responses(session_id).await.unwrap().is_empty());
    assert!(h.platform.company.list_saved(&company).await.unwrap().is_empty());
    let token = token_for(&created, "ana@example.com");
    assert!(matches!(
        h.platform.candidate_start(&token, "ana@example.com").await,
        Err(InterviewError::InvalidToken)
    ));
}

#[tokio::test]
async fn deleting_a_candidate_session_drops_its_bookmark() {
    let h = harness();
    let company = Actor::company(Uuid::new_v4());
    let created =
        create_interview(&h, &company, mixed_questions(), None, &["ana@example.com"]).await;
    let session_id = complete_candidate(&h, &created, "ana@example.com").await;
    h.platform
        .company
        .save_candidate(&company, session_id)
        .await
        .unwrap();

    h.platform
        .sessions
        .delete_session(&company, session_id)
        .await
        .unwrap();

    assert!(h.platform.company.list_saved(&company).await.unwrap().is_empty());
    assert_eq!(candidate_session_count(&h, created.interview.id).await, 0);
}

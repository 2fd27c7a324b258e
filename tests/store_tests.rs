//! Persistence-layer tests against a real SQLite file.
//!
//! - Concurrent `record_attempt` calls never lose an increment
//! - Counters track the sequence of outcomes exactly
//! - The pending-question compare-and-swap lets one grader win

use proptest::prelude::*;
use sqlx::SqlitePool;

use verb_drill_backend::db::config::DbConfig;
use verb_drill_backend::db::operations::{mastery, sessions, users};
use verb_drill_backend::db::Database;
use verb_drill_backend::engine::{ExerciseMode, MasteryRecord, ModePolicy, PendingQuestion};
use verb_drill_backend::prepare_database;

async fn file_db(dir: &tempfile::TempDir) -> Database {
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("store.db").display());
    prepare_database(DbConfig::for_url(url), true).await.unwrap()
}

async fn memory_db() -> Database {
    prepare_database(DbConfig::for_url("sqlite::memory:"), true)
        .await
        .unwrap()
}

async fn user(pool: &SqlitePool, subject: &str) -> String {
    users::upsert_by_subject(pool, subject, None, None)
        .await
        .unwrap()
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_are_all_counted() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;
    let user_id = user(db.pool(), "concurrent").await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let pool = db.pool().clone();
        let user_id = user_id.clone();
        handles.push(tokio::spawn(async move {
            mastery::record_attempt(&pool, &user_id, "gjore", i % 4 == 0)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let record = mastery::find_record(db.pool(), &user_id, "gjore")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.total_attempts, 40);
    assert_eq!(record.correct_attempts, 10);
}

#[tokio::test]
async fn records_are_scoped_per_user() {
    let db = memory_db().await;
    let alice = user(db.pool(), "alice").await;
    let bob = user(db.pool(), "bob").await;

    mastery::record_attempt(db.pool(), &alice, "se", true).await.unwrap();
    mastery::record_attempt(db.pool(), &bob, "se", false).await.unwrap();

    let alice_records = mastery::records_by_item(db.pool(), &alice).await.unwrap();
    assert_eq!(alice_records["se"].correct_attempts, 1);
    assert!(mastery::find_record(db.pool(), &bob, "ta").await.unwrap().is_none());
}

#[tokio::test]
async fn subject_maps_to_one_user() {
    let db = memory_db().await;
    let first = users::upsert_by_subject(db.pool(), "idp|7", Some("a@b.no"), None)
        .await
        .unwrap();
    let second = users::upsert_by_subject(db.pool(), "idp|7", None, Some("Ada"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.email.as_deref(), Some("a@b.no"));
    assert_eq!(second.name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn pending_question_is_completed_once() {
    let db = memory_db().await;
    let pool = db.pool();
    let user_id = user(pool, "cas").await;
    let session = sessions::create_session(pool, &user_id, ModePolicy::Random)
        .await
        .unwrap();

    let question = PendingQuestion {
        question_id: "q-1".into(),
        item_id: "ha".into(),
        mode: ExerciseMode::TenseRecall,
    };
    assert!(sessions::save_presented(pool, &session.id, &question).await.unwrap());

    // A second presentation cannot displace the pending one.
    let other = PendingQuestion {
        question_id: "q-2".into(),
        ..question.clone()
    };
    assert!(!sessions::save_presented(pool, &session.id, &other).await.unwrap());

    // Hint flag changed underneath: swap refused.
    assert!(sessions::arm_hint(pool, &session.id, "q-1").await.unwrap());
    assert!(!sessions::complete_question(pool, &session.id, "q-1", false).await.unwrap());

    assert!(sessions::complete_question(pool, &session.id, "q-1", true).await.unwrap());
    assert!(!sessions::complete_question(pool, &session.id, "q-1", false).await.unwrap());

    let reloaded = sessions::find_session(pool, &session.id).await.unwrap().unwrap();
    assert!(reloaded.state.pending.is_none());
    assert!(!reloaded.state.hint.is_armed());
    assert_eq!(reloaded.state.last_graded_question.as_deref(), Some("q-1"));

    assert!(!sessions::arm_hint(pool, &session.id, "q-1").await.unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn counters_follow_outcomes(outcomes in proptest::collection::vec(any::<bool>(), 1..30)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let record = rt.block_on(async {
            let db = memory_db().await;
            let user_id = user(db.pool(), "prop").await;
            let mut last = None;
            for &correct in &outcomes {
                let before = last.clone();
                let record = mastery::record_attempt(db.pool(), &user_id, "komme", correct)
                    .await
                    .unwrap();
                let (total, right) = before
                    .map(|r: MasteryRecord| (r.total_attempts, r.correct_attempts))
                    .unwrap_or((0, 0));
                assert_eq!(record.total_attempts, total + 1);
                assert_eq!(record.correct_attempts, right + i64::from(correct));
                last = Some(record);
            }
            last.unwrap()
        });

        let expected_correct = outcomes.iter().filter(|c| **c).count() as i64;
        prop_assert_eq!(record.total_attempts, outcomes.len() as i64);
        prop_assert_eq!(record.correct_attempts, expected_correct);
        let ratio = record.ratio().unwrap();
        prop_assert!((ratio - expected_correct as f64 / outcomes.len() as f64).abs() < 1e-12);
    }
}

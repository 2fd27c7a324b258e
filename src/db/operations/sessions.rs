use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::engine::{ExerciseMode, HintToken, ModePolicy, PendingQuestion, SessionState};

const SESSION_COLUMNS: &str = r#""id", "userId", "modePolicy", "pendingQuestionId", "pendingItemId",
    "pendingMode", "hintArmed", "lastGradedQuestionId", "createdAt", "updatedAt""#;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub user_id: String,
    pub state: SessionState,
    pub created_at: i64,
    pub updated_at: i64,
}

fn map_session(row: &SqliteRow) -> Result<StudySession, sqlx::Error> {
    let policy_raw: String = row.try_get("modePolicy")?;
    let question_id: Option<String> = row.try_get("pendingQuestionId")?;
    let item_id: Option<String> = row.try_get("pendingItemId")?;
    let mode_raw: Option<String> = row.try_get("pendingMode")?;
    let hint_armed: i64 = row.try_get("hintArmed")?;

    let pending = match (question_id, item_id, mode_raw.as_deref().and_then(ExerciseMode::parse)) {
        (Some(question_id), Some(item_id), Some(mode)) => Some(PendingQuestion {
            question_id,
            item_id,
            mode,
        }),
        _ => None,
    };
    let hint = if hint_armed != 0 && pending.is_some() {
        HintToken::armed()
    } else {
        HintToken::default()
    };

    Ok(StudySession {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        state: SessionState {
            policy: ModePolicy::parse(&policy_raw).unwrap_or_default(),
            pending,
            hint,
            last_graded_question: row.try_get("lastGradedQuestionId")?,
        },
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

pub async fn create_session(
    pool: &SqlitePool,
    user_id: &str,
    policy: ModePolicy,
) -> Result<StudySession, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp_millis();
    let sql = format!(
        r#"
        INSERT INTO "study_sessions" ("id", "userId", "modePolicy", "createdAt", "updatedAt")
        VALUES (?, ?, ?, ?, ?)
        RETURNING {SESSION_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(&id)
        .bind(user_id)
        .bind(policy.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;
    map_session(&row)
}

pub async fn find_session(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<StudySession>, sqlx::Error> {
    let sql = format!(r#"SELECT {SESSION_COLUMNS} FROM "study_sessions" WHERE "id" = ?"#);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(map_session).transpose()
}

pub async fn update_policy(
    pool: &SqlitePool,
    id: &str,
    policy: ModePolicy,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE "study_sessions" SET "modePolicy" = ?, "updatedAt" = ? WHERE "id" = ?"#,
    )
    .bind(policy.as_str())
    .bind(chrono::Utc::now().timestamp_millis())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Stores a new pending question with a disarmed hint. Returns false when
/// the session is gone or a question is already pending.
pub async fn save_presented(
    pool: &SqlitePool,
    id: &str,
    question: &PendingQuestion,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE "study_sessions"
        SET "pendingQuestionId" = ?, "pendingItemId" = ?, "pendingMode" = ?,
            "hintArmed" = 0, "updatedAt" = ?
        WHERE "id" = ? AND "pendingQuestionId" IS NULL
        "#,
    )
    .bind(&question.question_id)
    .bind(&question.item_id)
    .bind(question.mode.as_str())
    .bind(chrono::Utc::now().timestamp_millis())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Arms the hint only while `question_id` is still the pending question.
pub async fn arm_hint(pool: &SqlitePool, id: &str, question_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE "study_sessions"
        SET "hintArmed" = 1, "updatedAt" = ?
        WHERE "id" = ? AND "pendingQuestionId" = ?
        "#,
    )
    .bind(chrono::Utc::now().timestamp_millis())
    .bind(id)
    .bind(question_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Compare-and-swap from "awaiting `question_id` with the given hint flag"
/// to "graded". Returns false when another request got there first or the
/// hint flag changed underneath the caller.
pub async fn complete_question<'e, E>(
    executor: E,
    id: &str,
    question_id: &str,
    hint_armed: bool,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE "study_sessions"
        SET "pendingQuestionId" = NULL, "pendingItemId" = NULL, "pendingMode" = NULL,
            "hintArmed" = 0, "lastGradedQuestionId" = ?, "updatedAt" = ?
        WHERE "id" = ? AND "pendingQuestionId" = ? AND "hintArmed" = ?
        "#,
    )
    .bind(question_id)
    .bind(chrono::Utc::now().timestamp_millis())
    .bind(id)
    .bind(question_id)
    .bind(i64::from(hint_armed))
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_session(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "study_sessions" WHERE "id" = ?"#)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use crate::engine::MasteryRecord;

fn map_record(row: &SqliteRow) -> Result<MasteryRecord, sqlx::Error> {
    Ok(MasteryRecord {
        user_id: row.try_get("userId")?,
        item_id: row.try_get("verbId")?,
        total_attempts: row.try_get("totalAttempts")?,
        correct_attempts: row.try_get("correctAttempts")?,
        last_reviewed: row.try_get("lastReviewed")?,
    })
}

/// Counts one graded attempt. The increment happens inside a single
/// upsert, so concurrent calls for the same pair never lose an update.
pub async fn record_attempt<'e, E>(
    executor: E,
    user_id: &str,
    item_id: &str,
    correct: bool,
) -> Result<MasteryRecord, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = chrono::Utc::now().timestamp_millis();
    let row = sqlx::query(
        r#"
        INSERT INTO "mastery_records"
            ("userId", "verbId", "totalAttempts", "correctAttempts", "lastReviewed")
        VALUES (?, ?, 1, ?, ?)
        ON CONFLICT ("userId", "verbId") DO UPDATE SET
            "totalAttempts" = "mastery_records"."totalAttempts" + 1,
            "correctAttempts" = "mastery_records"."correctAttempts" + excluded."correctAttempts",
            "lastReviewed" = excluded."lastReviewed"
        RETURNING "userId", "verbId", "totalAttempts", "correctAttempts", "lastReviewed"
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(i64::from(correct))
    .bind(now)
    .fetch_one(executor)
    .await?;

    map_record(&row)
}

pub async fn find_record(
    pool: &SqlitePool,
    user_id: &str,
    item_id: &str,
) -> Result<Option<MasteryRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "userId", "verbId", "totalAttempts", "correctAttempts", "lastReviewed"
        FROM "mastery_records"
        WHERE "userId" = ? AND "verbId" = ?
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_record).transpose()
}

pub async fn list_records(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<MasteryRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "userId", "verbId", "totalAttempts", "correctAttempts", "lastReviewed"
        FROM "mastery_records"
        WHERE "userId" = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_record).collect()
}

/// Records keyed by item id, the shape the selector consumes.
pub async fn records_by_item(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<HashMap<String, MasteryRecord>, sqlx::Error> {
    Ok(list_records(pool, user_id)
        .await?
        .into_iter()
        .map(|record| (record.item_id.clone(), record))
        .collect())
}

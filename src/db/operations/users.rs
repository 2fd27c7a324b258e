use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub auth_provider_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn map_user(row: &SqliteRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        auth_provider_id: row.try_get("authProviderId")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

/// Get-or-create by identity-provider subject. Profile fields are only
/// overwritten when the token carries them.
pub async fn upsert_by_subject(
    pool: &SqlitePool,
    subject: &str,
    email: Option<&str>,
    name: Option<&str>,
) -> Result<UserRecord, sqlx::Error> {
    let now = chrono::Utc::now().timestamp_millis();
    let row = sqlx::query(
        r#"
        INSERT INTO "users" ("id", "authProviderId", "email", "name", "createdAt", "updatedAt")
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT ("authProviderId") DO UPDATE SET
            "email" = COALESCE(excluded."email", "users"."email"),
            "name" = COALESCE(excluded."name", "users"."name"),
            "updatedAt" = excluded."updatedAt"
        RETURNING "id", "authProviderId", "email", "name", "createdAt", "updatedAt"
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(subject)
    .bind(email)
    .bind(name)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    map_user(&row)
}

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::engine::VocabularyItem;

const ITEM_COLUMNS: &str =
    r#""id", "norwegian", "englishMeanings", "past", "pastParticiple", "mnemonic""#;

fn map_item(row: &SqliteRow) -> Result<VocabularyItem, sqlx::Error> {
    Ok(VocabularyItem {
        id: row.try_get("id")?,
        norwegian: row.try_get("norwegian")?,
        english_meanings: row.try_get("englishMeanings")?,
        past: row.try_get("past")?,
        past_participle: row.try_get("pastParticiple")?,
        mnemonic: row.try_get("mnemonic")?,
    })
}

pub async fn list_items(pool: &SqlitePool) -> Result<Vec<VocabularyItem>, sqlx::Error> {
    let sql = format!(r#"SELECT {ITEM_COLUMNS} FROM "verbs" ORDER BY "norwegian""#);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(map_item).collect()
}

pub async fn find_item(pool: &SqlitePool, id: &str) -> Result<Option<VocabularyItem>, sqlx::Error> {
    let sql = format!(r#"SELECT {ITEM_COLUMNS} FROM "verbs" WHERE "id" = ?"#);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(map_item).transpose()
}

pub async fn count_items(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "verbs""#)
        .fetch_one(pool)
        .await
}

/// Inserts items, skipping any whose id or term already exists. Returns
/// the number of rows written.
pub async fn insert_items(pool: &SqlitePool, items: &[VocabularyItem]) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for item in items {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO "verbs"
                ("id", "norwegian", "englishMeanings", "past", "pastParticiple", "mnemonic")
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.norwegian)
        .bind(&item.english_meanings)
        .bind(&item.past)
        .bind(&item.past_participle)
        .bind(item.mnemonic.as_deref())
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

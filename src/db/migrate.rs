use sqlx::SqlitePool;
use thiserror::Error;

const MIGRATIONS: &[(&str, &str)] = &[
    ("001_init_schema", include_str!("../../sql/001_init_schema.sql")),
    ("002_study_sessions", include_str!("../../sql/002_study_sessions.sql")),
];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration {name} failed: {source}")]
    Statement {
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrationError> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> =
        sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
            .fetch_all(pool)
            .await?;

    for &(name, sql) in MIGRATIONS {
        if applied.iter().any(|a| a.as_str() == name) {
            tracing::debug!(migration = name, "already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in split_sql_statements(sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|source| MigrationError::Statement { name, source })?;
        }
        sqlx::query(r#"INSERT INTO "_migrations" ("name", "applied_at") VALUES (?, ?)"#)
            .bind(name)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(migration = name, "applied migration");
    }

    Ok(())
}

/// Splits a script on `;`, ignoring `--` comments and quoted text.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let line = strip_line_comment(line);
        if line.trim().is_empty() {
            continue;
        }

        let mut in_single_quote = false;
        let mut in_double_quote = false;
        for ch in line.chars() {
            match ch {
                '\'' if !in_double_quote => in_single_quote = !in_single_quote,
                '"' if !in_single_quote => in_double_quote = !in_double_quote,
                ';' if !in_single_quote && !in_double_quote => {
                    let stmt = current.trim();
                    if !stmt.is_empty() {
                        statements.push(stmt.to_string());
                    }
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        current.push('\n');
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

fn strip_line_comment(line: &str) -> &str {
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut prev = '\0';
    for (idx, ch) in line.char_indices() {
        match ch {
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            '-' if prev == '-' && !in_single_quote && !in_double_quote => {
                return &line[..idx - 1];
            }
            _ => {}
        }
        prev = ch;
    }
    line
}

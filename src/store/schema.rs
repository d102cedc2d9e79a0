//! Schema Inspector tool.
//!
//! Produces the schema snapshot the SQL sub-agent reasons from: every
//! non-system table with its columns and a few literal sample rows. The
//! snapshot reflects the live store at read time; it is recomputed on
//! every call and never cached.

use sqlx::{Connection, Row};

use crate::config::CONFIG;

const SAMPLE_ROW_COUNT: usize = 3;
const NO_TABLES_SENTINEL: &str = "No tables found in database.";

/// Describe the configured store. Always returns a string; storage
/// errors are embedded in the text.
pub async fn describe_schema() -> String {
    describe_schema_at(&CONFIG.database_url).await
}

/// Describe the store at `url`.
pub async fn describe_schema_at(url: &str) -> String {
    match inspect(url).await {
        Ok(schema) => schema,
        Err(e) => format!("Error loading schema: {e}"),
    }
}

async fn inspect(url: &str) -> Result<String, sqlx::Error> {
    let mut conn = super::connect(url).await?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(&mut conn)
    .await?;

    let mut blocks = Vec::new();
    for table in &tables {
        let columns: Vec<String> = sqlx::query(&format!("PRAGMA table_info({table})"))
            .fetch_all(&mut conn)
            .await?
            .iter()
            .map(|row| {
                format!(
                    "{} ({})",
                    row.get::<String, _>("name"),
                    row.get::<String, _>("type"),
                )
            })
            .collect();

        let samples: Vec<serde_json::Value> =
            sqlx::query(&format!("SELECT * FROM {table} LIMIT {SAMPLE_ROW_COUNT}"))
                .fetch_all(&mut conn)
                .await?
                .iter()
                .map(super::row_to_tuple)
                .collect();

        blocks.push(format!(
            "Table: {table}\nColumns: {}\nSample Rows: {}",
            columns.join(", "),
            serde_json::Value::Array(samples),
        ));
    }

    conn.close().await?;

    if blocks.is_empty() {
        return Ok(NO_TABLES_SENTINEL.to_string());
    }
    Ok(blocks.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    async fn seeded_db(dir: &tempfile::TempDir) -> String {
        let url = format!("sqlite:{}", dir.path().join("schema.db").display());
        let mut conn = crate::store::connect(&url).await.unwrap();
        sqlx::query("CREATE TABLE sales (id INTEGER PRIMARY KEY, region TEXT, amount REAL)")
            .execute(&mut conn)
            .await
            .unwrap();
        for (region, amount) in [("north", 10.5), ("south", 20.0), ("east", 7.0), ("west", 1.0)] {
            sqlx::query("INSERT INTO sales (region, amount) VALUES (?, ?)")
                .bind(region)
                .bind(amount)
                .execute(&mut conn)
                .await
                .unwrap();
        }
        conn.close().await.unwrap();
        url
    }

    #[tokio::test]
    async fn empty_store_returns_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("empty.db").display());
        assert_eq!(describe_schema_at(&url).await, NO_TABLES_SENTINEL);
    }

    #[tokio::test]
    async fn tables_columns_and_samples_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let url = seeded_db(&dir).await;

        let schema = describe_schema_at(&url).await;
        assert!(schema.contains("Table: sales"));
        assert!(schema.contains("id (INTEGER)"));
        assert!(schema.contains("region (TEXT)"));
        assert!(schema.contains("amount (REAL)"));
        // Only the first three rows are sampled.
        assert!(schema.contains("north"));
        assert!(!schema.contains("west"));
    }

    #[tokio::test]
    async fn storage_error_embedded_not_raised() {
        let schema = describe_schema_at("sqlite:/no/such/dir/x.db").await;
        assert!(schema.starts_with("Error loading schema:"));
    }
}

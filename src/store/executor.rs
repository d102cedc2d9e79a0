//! SQL Executor tool.
//!
//! Runs one model-generated statement. Preprocessing strips markdown
//! fences and caps uncapped SELECTs; results are serialized as a list of
//! column→value mappings and hard-truncated so oversized result sets
//! cannot blow up the model's context. Execution errors come back as
//! text for the sub-agent to read and re-query.
//!
//! There is no verb whitelist and no injection defense; the statement
//! runs as given. Known weakness, not a contract.

use tracing::info;

use crate::config::CONFIG;

const SELECT_ROW_CAP: usize = 10;
const RESULT_CHAR_CAP: usize = 2000;
const TRUNCATION_MARKER: &str = "... (truncated)";

/// Strip code fences; append a row cap to uncapped SELECTs.
pub fn preprocess(query: &str) -> String {
    let stripped = query.replace("```sql", "").replace("```", "");
    let mut statement = stripped.trim().to_string();

    let upper = statement.to_uppercase();
    if upper.starts_with("SELECT") && !upper.contains("LIMIT") {
        statement.push_str(&format!(" LIMIT {SELECT_ROW_CAP}"));
    }
    statement
}

/// Execute against the configured store. Always returns a string;
/// execution errors are embedded in the text.
pub async fn execute_sql(query: &str) -> String {
    execute_sql_at(&CONFIG.database_url, query).await
}

/// Execute against the store at `url`.
pub async fn execute_sql_at(url: &str, query: &str) -> String {
    let statement = preprocess(query);
    info!(sql = %statement, "executing SQL");

    match run(url, &statement).await {
        Ok(result) => result,
        Err(e) => format!("Error executing SQL: {e}"),
    }
}

async fn run(url: &str, statement: &str) -> Result<String, sqlx::Error> {
    use sqlx::Connection;

    let mut conn = super::connect(url).await?;
    let rows = sqlx::query(statement).fetch_all(&mut conn).await?;
    conn.close().await?;

    let result: Vec<serde_json::Value> = rows.iter().map(super::row_to_object).collect();
    Ok(truncate_result(serde_json::Value::Array(result).to_string()))
}

fn truncate_result(text: String) -> String {
    if text.chars().count() <= RESULT_CHAR_CAP {
        return text;
    }
    let mut truncated: String = text.chars().take(RESULT_CHAR_CAP).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

//! HTTP surface: the agent query endpoint plus thin table CRUD routes
//! for the bundled data manager UI.
//!
//! CRUD handlers follow the tool layer's convention of never failing the
//! request: database errors come back as `{"error": ...}` JSON with a
//! 200 status, and the UI renders them.

use axum::extract::{Path, Query};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::CONFIG;
use crate::pipeline;
use crate::store;

pub fn router() -> Router {
    let static_root = &CONFIG.static_root;
    Router::new()
        .route("/agent/query", post(query_agent))
        .route("/api/tables", get(list_tables))
        .route(
            "/api/table/{table_name}",
            get(get_table_data).delete(drop_table),
        )
        .route("/api/table/{table_name}/row/{rowid}", delete(delete_row))
        .route("/api/table/{table_name}/insert", post(insert_row))
        .route("/api/create-table", post(create_table))
        .route_service("/", ServeFile::new(format!("{static_root}/index.html")))
        .route_service(
            "/data-manager",
            ServeFile::new(format!("{static_root}/data_manager.html")),
        )
        .nest_service("/static", ServeDir::new(static_root))
        .layer(TraceLayer::new_for_http())
}

/// Gate for names that get interpolated into SQL text: leading letter
/// or underscore, alphanumerics and underscores after.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn error_json(e: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "error": e.to_string() }))
}

#[derive(Deserialize)]
struct AgentQuery {
    prompt: String,
}

async fn query_agent(Query(query): Query<AgentQuery>) -> Json<Value> {
    if query.prompt.trim().is_empty() {
        return error_json("prompt must not be empty");
    }
    info!(prompt = %query.prompt, "agent query received");
    let response = pipeline::answer_question(&query.prompt).await;
    Json(json!({ "response": response }))
}

async fn list_tables() -> Json<Value> {
    let mut conn = match store::connect(&CONFIG.database_url).await {
        Ok(conn) => conn,
        Err(e) => return error_json(e),
    };
    match sqlx::query("SELECT name FROM sqlite_master WHERE type='table'")
        .fetch_all(&mut conn)
        .await
    {
        Ok(rows) => {
            let tables: Vec<Value> = rows
                .iter()
                .map(|row| store::column_value(row, 0))
                .collect();
            Json(json!({ "tables": tables }))
        }
        Err(e) => error_json(e),
    }
}

async fn get_table_data(Path(table_name): Path<String>) -> Json<Value> {
    if !is_identifier(&table_name) {
        return error_json("Invalid table name");
    }
    let mut conn = match store::connect(&CONFIG.database_url).await {
        Ok(conn) => conn,
        Err(e) => return error_json(e),
    };
    match sqlx::query(&format!("SELECT rowid, * FROM {table_name}"))
        .fetch_all(&mut conn)
        .await
    {
        Ok(rows) => {
            let columns: Vec<String> = rows
                .first()
                .map(|row| {
                    use sqlx::{Column, Row};
                    row.columns().iter().map(|c| c.name().to_string()).collect()
                })
                .unwrap_or_default();
            let data: Vec<Value> = rows.iter().map(store::row_to_object).collect();
            Json(json!({ "columns": columns, "data": data }))
        }
        Err(e) => error_json(e),
    }
}

async fn drop_table(Path(table_name): Path<String>) -> Json<Value> {
    if !is_identifier(&table_name) {
        return error_json("Invalid table name");
    }
    let mut conn = match store::connect(&CONFIG.database_url).await {
        Ok(conn) => conn,
        Err(e) => return error_json(e),
    };
    match sqlx::query(&format!("DROP TABLE {table_name}"))
        .execute(&mut conn)
        .await
    {
        Ok(_) => Json(json!({ "message": format!("Table {table_name} deleted") })),
        Err(e) => error_json(e),
    }
}

async fn delete_row(Path((table_name, rowid)): Path<(String, i64)>) -> Json<Value> {
    if !is_identifier(&table_name) {
        return error_json("Invalid table name");
    }
    let mut conn = match store::connect(&CONFIG.database_url).await {
        Ok(conn) => conn,
        Err(e) => return error_json(e),
    };
    match sqlx::query(&format!("DELETE FROM {table_name} WHERE rowid = ?"))
        .bind(rowid)
        .execute(&mut conn)
        .await
    {
        Ok(_) => Json(json!({ "message": "Row deleted" })),
        Err(e) => error_json(e),
    }
}

#[derive(Deserialize)]
struct InsertRowRequest {
    data: serde_json::Map<String, Value>,
}

async fn insert_row(
    Path(table_name): Path<String>,
    Json(request): Json<InsertRowRequest>,
) -> Json<Value> {
    if !is_identifier(&table_name) {
        return error_json("Invalid table name");
    }
    if request.data.is_empty() {
        return error_json("no columns to insert");
    }
    for column in request.data.keys() {
        if !is_identifier(column) {
            return error_json(format!("Invalid column name: {column}"));
        }
    }

    let columns: Vec<&str> = request.data.keys().map(String::as_str).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let statement = format!(
        "INSERT INTO {table_name} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );

    let mut conn = match store::connect(&CONFIG.database_url).await {
        Ok(conn) => conn,
        Err(e) => return error_json(e),
    };
    let mut query = sqlx::query(&statement);
    for value in request.data.values() {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap_or_default()),
            Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(other.to_string()),
        };
    }
    match query.execute(&mut conn).await {
        Ok(_) => Json(json!({ "message": "Row inserted successfully" })),
        Err(e) => error_json(e),
    }
}

#[derive(Deserialize)]
struct ColumnDef {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    not_null: bool,
}

#[derive(Deserialize)]
struct CreateTableRequest {
    name: String,
    columns: Vec<ColumnDef>,
}

const ALLOWED_COLUMN_TYPES: [&str; 5] = ["TEXT", "INTEGER", "REAL", "DATE", "BLOB"];

async fn create_table(Json(request): Json<CreateTableRequest>) -> Json<Value> {
    if !is_identifier(&request.name) {
        return error_json("Invalid table name");
    }

    let mut column_sql = Vec::with_capacity(request.columns.len());
    for column in &request.columns {
        if !is_identifier(&column.name) {
            return error_json(format!("Invalid column name: {}", column.name));
        }
        let column_type = column.column_type.to_uppercase();
        let column_type = if ALLOWED_COLUMN_TYPES.contains(&column_type.as_str()) {
            column_type
        } else {
            "TEXT".to_string()
        };

        let mut definition = format!("{} {column_type}", column.name);
        if column.primary_key {
            definition.push_str(" PRIMARY KEY");
            if column_type == "INTEGER" {
                definition.push_str(" AUTOINCREMENT");
            }
        } else if column.not_null {
            definition.push_str(" NOT NULL");
        }
        column_sql.push(definition);
    }

    let statement = format!("CREATE TABLE {} ({})", request.name, column_sql.join(", "));
    let mut conn = match store::connect(&CONFIG.database_url).await {
        Ok(conn) => conn,
        Err(e) => return error_json(e),
    };
    match sqlx::query(&statement).execute(&mut conn).await {
        Ok(_) => Json(json!({
            "message": format!("Table '{}' created successfully", request.name)
        })),
        Err(e) => error_json(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_gate_rejects_injection_shapes() {
        assert!(is_identifier("sales"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("t2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("sales; DROP TABLE x"));
        assert!(!is_identifier("a-b"));
    }
}

//! SQLite access for the agent toolset.
//!
//! Both operations here are tools first and database code second: they
//! return strings, and data-level failures (bad SQL, missing table,
//! unreadable store) come back as error *text*, never as `Err`. The
//! calling model reads that text as ordinary tool output and can
//! self-correct on its next turn.
//!
//! One connection is opened and closed per call. No pooling, no
//! transactions spanning statements; a schema read and a subsequent
//! execute may observe different store states, which is accepted.

mod executor;
mod schema;

pub use executor::{execute_sql, execute_sql_at, preprocess};
pub use schema::{describe_schema, describe_schema_at};

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use std::str::FromStr;

pub(crate) async fn connect(url: &str) -> Result<SqliteConnection, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    SqliteConnection::connect_with(&options).await
}

/// Decode one column of a dynamically-typed row into JSON.
///
/// SQLite storage classes map directly; anything unrecognized is read as
/// text. Decode failures degrade to null rather than failing the row.
pub(crate) fn column_value(row: &SqliteRow, idx: usize) -> Value {
    let raw = match row.try_get_raw(idx) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }
    let storage_class = raw.type_info().name().to_string();

    match storage_class.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get::<f64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|b| Value::String(format!("<blob {} bytes>", b.len())))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Render a row as an ordered column→value mapping.
pub(crate) fn row_to_object(row: &SqliteRow) -> Value {
    let mut object = serde_json::Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), column_value(row, idx));
    }
    Value::Object(object)
}

/// Render a row as a bare value tuple (schema sample rows).
pub(crate) fn row_to_tuple(row: &SqliteRow) -> Value {
    let values = (0..row.columns().len())
        .map(|idx| column_value(row, idx))
        .collect();
    Value::Array(values)
}

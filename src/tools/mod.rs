//! Tool definitions and executors for the two agent scopes.
//!
//! The root agent holds {query_database, generate_plot}; the SQL
//! sub-agent holds {get_schema, execute_sql}. Executors dispatch by tool
//! name. Data-level failures come back as tool output strings; a tool
//! name outside the scope's capability set is a true error ("Tool call
//! validation failed"), which the response pipeline classifies as a
//! hallucinated capability.

mod chart;
mod definitions;

pub use chart::generate_plot;
pub use definitions::{root_agent_tools, sql_agent_tools};

use anyhow::Result;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::SqlAgent;
use crate::config::CONFIG;
use crate::provider::Provider;
use crate::store;

fn parse_args(arguments: &str) -> Value {
    serde_json::from_str(arguments).unwrap_or_else(|_| json!({}))
}

/// Executor for the SQL sub-agent's capability set.
#[derive(Clone)]
pub struct SqlToolExecutor {
    pub database_url: String,
}

impl SqlToolExecutor {
    pub fn new(database_url: String) -> Self {
        Self { database_url }
    }

    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String> {
        let args = parse_args(arguments);
        match name {
            "get_schema" => Ok(store::describe_schema_at(&self.database_url).await),
            "execute_sql" => {
                let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("");
                Ok(store::execute_sql_at(&self.database_url, query).await)
            }
            other => anyhow::bail!("Tool call validation failed: unknown tool '{other}'"),
        }
    }
}

/// Executor for the root agent's capability set.
#[derive(Clone)]
pub struct RootToolExecutor {
    provider: Arc<dyn Provider>,
    pub database_url: String,
    pub charts_dir: PathBuf,
}

impl RootToolExecutor {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            database_url: CONFIG.database_url.clone(),
            charts_dir: PathBuf::from(&CONFIG.charts_dir),
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_charts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.charts_dir = dir.into();
        self
    }

    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String> {
        let args = parse_args(arguments);
        match name {
            "query_database" => {
                let question = args.get("question").and_then(|v| v.as_str()).unwrap_or("");
                // Each delegation is a fresh, stateless sub-agent run.
                let sub_agent = SqlAgent::new(self.provider.clone())
                    .with_database_url(self.database_url.clone());
                sub_agent.run(question).await
            }
            "generate_plot" => generate_plot(&args, &self.charts_dir),
            other => anyhow::bail!("Tool call validation failed: unknown tool '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sql_executor_rejects_foreign_capability() {
        let executor = SqlToolExecutor::new("sqlite::memory:".into());
        let err = executor.execute("exec_python", "{}").await.unwrap_err();
        assert!(err.to_string().contains("Tool call validation failed"));
    }

    #[tokio::test]
    async fn sql_executor_surfaces_data_errors_in_band() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("t.db").display());
        let executor = SqlToolExecutor::new(url);
        let output = executor
            .execute("execute_sql", r#"{"query": "SELECT FROM"}"#)
            .await
            .unwrap();
        assert!(output.starts_with("Error executing SQL:"));
    }
}

//! Tool schemas for function calling.

use serde_json::json;

use crate::provider::ToolDefinition;

/// Capability set for the root agent.
pub fn root_agent_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "query_database".into(),
            description: "Answer a data question by querying the local database. \
                          Handles schema discovery, SQL generation, and execution. \
                          Pass the user's question exactly as provided."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The user's question, verbatim"
                    }
                },
                "required": ["question"]
            }),
        },
        ToolDefinition {
            name: "generate_plot".into(),
            description: "Render a chart from x/y series and return a markdown \
                          image reference. The only valid way to produce a chart."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "x": {
                        "type": "array",
                        "description": "Category labels or x values"
                    },
                    "y": {
                        "type": "array",
                        "description": "Numeric y values (non-numeric entries become 0)"
                    },
                    "plot_type": {
                        "type": "string",
                        "enum": ["bar", "line", "scatter", "pie"],
                        "description": "Chart kind; defaults to bar"
                    },
                    "title": { "type": "string" },
                    "xlabel": { "type": "string" },
                    "ylabel": { "type": "string" }
                },
                "required": ["x", "y"]
            }),
        },
    ]
}

/// Capability set for the SQL sub-agent.
pub fn sql_agent_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_schema".into(),
            description: "Inspect the database structure: every table with its \
                          columns and a few sample rows. Call this before writing SQL."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "execute_sql".into(),
            description: "Execute one SQL statement and return the serialized rows, \
                          or an error description to correct from."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The SQL statement to run"
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}

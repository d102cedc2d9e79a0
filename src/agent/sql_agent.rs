//! The SQL sub-agent: stateless schema-discover/generate/execute loop.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::agent::{prompts, ToolCallAssembler, MAX_TOOL_ROUNDS};
use crate::config::CONFIG;
use crate::provider::{
    ChatRequest, Message, MessageRole, Provider, StreamEvent, ToolContinueRequest, ToolResult,
};
use crate::tools::{sql_agent_tools, SqlToolExecutor};

/// One delegated data question: fresh conversation, no memory of prior
/// delegations. Returns the sub-agent's final text, or its last tool
/// output when the model ends a round without narrating one.
pub struct SqlAgent {
    provider: Arc<dyn Provider>,
    executor: SqlToolExecutor,
}

impl SqlAgent {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            executor: SqlToolExecutor::new(CONFIG.database_url.clone()),
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.executor.database_url = url.into();
        self
    }

    pub async fn run(&self, question: &str) -> Result<String> {
        let tools = sql_agent_tools();
        let request = ChatRequest::new(&CONFIG.model, prompts::sql_agent_instruction(), question)
            .with_tools(tools.clone());
        let mut rx = self.provider.create_stream(request).await?;

        let mut conversation = vec![Message {
            role: MessageRole::User,
            content: question.to_string(),
        }];
        let mut final_text = String::new();
        let mut last_tool_output: Option<String> = None;

        for round in 0..MAX_TOOL_ROUNDS {
            let (text, tool_results) = self.drain(&mut rx).await?;
            if !text.is_empty() {
                final_text = text;
            }
            if tool_results.is_empty() {
                break;
            }

            if let Some(last) = tool_results.last() {
                last_tool_output = Some(last.output.clone());
            }
            record_tool_round(&mut conversation, &tool_results);
            debug!(round, calls = tool_results.len(), "sql agent continuing");

            rx = self
                .provider
                .continue_with_tools_stream(ToolContinueRequest {
                    model: CONFIG.model.clone(),
                    system: prompts::sql_agent_instruction().to_string(),
                    messages: conversation.clone(),
                    tool_results,
                    tools: tools.clone(),
                    temperature: 0.0,
                })
                .await?;
        }

        if final_text.is_empty() {
            if let Some(output) = last_tool_output {
                return Ok(output);
            }
        }
        Ok(final_text)
    }

    async fn drain(
        &self,
        rx: &mut mpsc::Receiver<StreamEvent>,
    ) -> Result<(String, Vec<ToolResult>)> {
        let mut assembler = ToolCallAssembler::default();
        let mut text = String::new();
        let mut results = Vec::new();

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::TextDelta(delta) => text.push_str(&delta),
                StreamEvent::FunctionCallStart { call_id, name } => {
                    debug!(tool = %name, "sql agent tool call");
                    assembler.start(call_id, name);
                }
                StreamEvent::FunctionCallDelta {
                    call_id,
                    arguments_delta,
                } => assembler.push_args(&call_id, &arguments_delta),
                StreamEvent::FunctionCallEnd { call_id } => {
                    if let Some((name, args)) = assembler.finish(&call_id) {
                        let output = self.executor.execute(&name, &args).await?;
                        results.push(ToolResult {
                            call_id,
                            name,
                            output,
                        });
                    }
                }
                StreamEvent::Error(message) => anyhow::bail!(message),
                StreamEvent::Done => break,
            }
        }
        Ok((text, results))
    }
}

/// Record one tool round in the running conversation: a compact
/// assistant summary of what was called, then each output as a user
/// message so later rounds keep earlier results in context.
pub(crate) fn record_tool_round(conversation: &mut Vec<Message>, results: &[ToolResult]) {
    let summary = results
        .iter()
        .map(|r| format!("[Called {} tool]", r.name))
        .collect::<Vec<_>>()
        .join(" ");
    conversation.push(Message {
        role: MessageRole::Assistant,
        content: summary,
    });
    for result in results {
        conversation.push(Message {
            role: MessageRole::User,
            content: format!("[{} result]: {}", result.name, result.output),
        });
    }
}

//! The root agent: presentation layer over the SQL sub-agent and chart
//! tool. Streams its raw text out through a channel; the response
//! pipeline owns extraction and cleanup.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::agent::sql_agent::record_tool_round;
use crate::agent::{prompts, ToolCallAssembler, MAX_TOOL_ROUNDS};
use crate::config::CONFIG;
use crate::provider::{
    ChatRequest, Message, MessageRole, Provider, StreamEvent, ToolContinueRequest, ToolResult,
};
use crate::tools::{root_agent_tools, RootToolExecutor};

pub struct RootAgent {
    provider: Arc<dyn Provider>,
    executor: RootToolExecutor,
}

impl RootAgent {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        let executor = RootToolExecutor::new(provider.clone());
        Self { provider, executor }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.executor = self.executor.with_database_url(url);
        self
    }

    pub fn with_charts_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.executor = self.executor.with_charts_dir(dir);
        self
    }

    /// Run one question to completion, forwarding every raw text
    /// fragment into `tx` in arrival order.
    pub async fn run(
        &self,
        session: Uuid,
        question: &str,
        tx: mpsc::Sender<String>,
    ) -> Result<()> {
        let system = format!(
            "{}\n\n{}",
            prompts::root_global_instruction(),
            prompts::root_instruction()
        );
        let tools = root_agent_tools();
        debug!(%session, provider = self.provider.name(), "root agent run started");

        let request =
            ChatRequest::new(&CONFIG.model, &system, question).with_tools(tools.clone());
        let mut rx = self.provider.create_stream(request).await?;

        let mut conversation = vec![Message {
            role: MessageRole::User,
            content: question.to_string(),
        }];

        for round in 0..MAX_TOOL_ROUNDS {
            let (text, tool_results) = self.drain(&mut rx, &tx).await?;
            if !text.is_empty() {
                conversation.push(Message {
                    role: MessageRole::Assistant,
                    content: text,
                });
            }
            if tool_results.is_empty() {
                break;
            }

            record_tool_round(&mut conversation, &tool_results);
            debug!(%session, round, calls = tool_results.len(), "root agent continuing");

            rx = self
                .provider
                .continue_with_tools_stream(ToolContinueRequest {
                    model: CONFIG.model.clone(),
                    system: system.clone(),
                    messages: conversation.clone(),
                    tool_results,
                    tools: tools.clone(),
                    temperature: 0.0,
                })
                .await?;
        }
        Ok(())
    }

    async fn drain(
        &self,
        rx: &mut mpsc::Receiver<StreamEvent>,
        tx: &mpsc::Sender<String>,
    ) -> Result<(String, Vec<ToolResult>)> {
        let mut assembler = ToolCallAssembler::default();
        let mut text = String::new();
        let mut results = Vec::new();

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::TextDelta(delta) => {
                    text.push_str(&delta);
                    // Receiver gone means the caller stopped listening.
                    if tx.send(delta).await.is_err() {
                        anyhow::bail!("response channel closed mid-run");
                    }
                }
                StreamEvent::FunctionCallStart { call_id, name } => {
                    debug!(tool = %name, "root agent tool call");
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

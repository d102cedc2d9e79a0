//! OpenAI-compatible Chat Completions provider.
//!
//! Streams completions over SSE and surfaces tool calls as indexed
//! fragments. Transient transport failures (connect errors, 5xx) are
//! retried up to a fixed count; client errors, including 429 rate
//! limits, surface immediately with the backend's body text intact so
//! the response pipeline can classify them.

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::CONFIG;
use crate::core::SseDecoder;

use super::{ChatRequest, Provider, StreamEvent, ToolContinueRequest, ToolDefinition};

const RETRY_BACKOFF_MS: u64 = 250;

pub struct OpenAiProvider {
    client: HttpClient,
    api_key: String,
    base_url: String,
    retries: usize,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String, retries: usize) -> Self {
        Self {
            client: HttpClient::new(),
            api_key,
            base_url,
            retries,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            CONFIG.api_key.clone(),
            CONFIG.api_base_url.clone(),
            CONFIG.transport_retries,
        )
    }

    fn build_messages(request: &ChatRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(&request.system)];

        for msg in &request.messages {
            messages.push(ChatMessage::text(msg.role.as_str(), &msg.content));
        }

        messages.push(ChatMessage::text("user", &request.input));
        messages
    }

    fn build_tool_messages(request: &ToolContinueRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(&request.system)];

        for msg in &request.messages {
            messages.push(ChatMessage::text(msg.role.as_str(), &msg.content));
        }

        // The API requires the assistant's tool_calls turn before any
        // tool results; reconstruct it from the executed calls.
        if !request.tool_results.is_empty() {
            let tool_calls: Vec<ChatToolCall> = request
                .tool_results
                .iter()
                .map(|r| ChatToolCall {
                    id: r.call_id.clone(),
                    call_type: "function".into(),
                    function: ChatToolCallFunction {
                        name: r.name.clone(),
                        arguments: "{}".into(),
                    },
                })
                .collect();

            messages.push(ChatMessage {
                role: "assistant".into(),
                content: None,
                tool_calls: Some(tool_calls),
                tool_call_id: None,
            });

            for result in &request.tool_results {
                messages.push(ChatMessage {
                    role: "tool".into(),
                    content: Some(result.output.clone()),
                    tool_calls: None,
                    tool_call_id: Some(result.call_id.clone()),
                });
            }
        }

        messages
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Option<Vec<ChatTool>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .iter()
                .map(|t| ChatTool {
                    tool_type: "function".into(),
                    function: ChatFunction {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    }

    /// POST with bounded retry on connect errors and server errors.
    async fn post_with_retry(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)).await;
            }

            let sent = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("(failed to read body: {e})"));
                    if status.is_server_error() && attempt < self.retries {
                        warn!(%status, attempt, "backend server error, retrying");
                        attempt += 1;
                        continue;
                    }
                    anyhow::bail!("chat completions API error {status}: {text}");
                }
                Err(e) => {
                    if attempt < self.retries {
                        warn!(error = %e, attempt, "backend request failed, retrying");
                        attempt += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Decode the SSE response into stream events.
    ///
    /// Tool calls are tracked by stream index so interleaved parallel
    /// calls reassemble correctly.
    async fn process_sse_stream(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
        struct InFlightCall {
            id: String,
            name: String,
            started: bool,
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut tool_calls: HashMap<usize, InFlightCall> = HashMap::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    break;
                }
            };

            for frame in decoder.push(&chunk) {
                if frame.is_done() {
                    continue;
                }

                let chunk_data: ChatStreamChunk = match frame.try_parse() {
                    Some(c) => c,
                    None => continue,
                };

                for choice in chunk_data.choices {
                    let delta = choice.delta;

                    if let Some(content) = delta.content {
                        if !content.is_empty() {
                            let _ = tx.send(StreamEvent::TextDelta(content)).await;
                        }
                    }

                    if let Some(delta_tool_calls) = delta.tool_calls {
                        for tc in delta_tool_calls {
                            let call = tool_calls.entry(tc.index).or_insert_with(|| {
                                InFlightCall {
                                    id: String::new(),
                                    name: String::new(),
                                    started: false,
                                }
                            });

                            if let Some(ref id) = tc.id {
                                call.id = id.clone();
                            }
                            if let Some(ref func) = tc.function {
                                if let Some(ref name) = func.name {
                                    call.name = name.clone();
                                }
                            }

                            if !call.started && !call.id.is_empty() && !call.name.is_empty() {
                                call.started = true;
                                let _ = tx
                                    .send(StreamEvent::FunctionCallStart {
                                        call_id: call.id.clone(),
                                        name: call.name.clone(),
                                    })
                                    .await;
                            }

                            if let Some(ref func) = tc.function {
                                if let Some(ref args) = func.arguments {
                                    if !args.is_empty() && call.started {
                                        let _ = tx
                                            .send(StreamEvent::FunctionCallDelta {
                                                call_id: call.id.clone(),
                                                arguments_delta: args.clone(),
                                            })
                                            .await;
                                    }
                                }
                            }
                        }
                    }

                    if choice.finish_reason.is_some() {
                        for (_, call) in tool_calls.drain() {
                            if call.started {
                                let _ = tx
                                    .send(StreamEvent::FunctionCallEnd { call_id: call.id })
                                    .await;
                            }
                        }
                    }
                }
            }
        }

        let _ = tx.send(StreamEvent::Done).await;
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn create_stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: Self::build_messages(&request),
            tools: Self::convert_tools(&request.tools),
            stream: true,
            temperature: request.temperature,
        };

        let response = self.post_with_retry(&body).await?;

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(Self::process_sse_stream(response, tx));
        Ok(rx)
    }

    async fn continue_with_tools_stream(
        &self,
        request: ToolContinueRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: Self::build_tool_messages(&request),
            tools: Self::convert_tools(&request.tools),
            stream: true,
            temperature: request.temperature,
        };

        let response = self.post_with_retry(&body).await?;

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(Self::process_sse_stream(response, tx));
        Ok(rx)
    }
}

// ============================================================================
// Wire types (OpenAI-compatible Chat Completions format)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    stream: bool,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self::text("system", content)
    }

    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ChatToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatToolCallFunction {
    name: String,
    arguments: String,
}

// Streaming chunk types

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ChatStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<ChatStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Message, MessageRole, ToolResult};

    #[test]
    fn messages_carry_system_history_and_input() {
        let request = ChatRequest::new("m", "be terse", "hello").with_messages(vec![Message {
            role: MessageRole::Assistant,
            content: "earlier".into(),
        }]);

        let messages = OpenAiProvider::build_messages(&request);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content.as_deref(), Some("hello"));
    }

    #[test]
    fn tool_continuation_orders_assistant_before_results() {
        let request = ToolContinueRequest {
            model: "m".into(),
            system: "s".into(),
            messages: vec![],
            tool_results: vec![ToolResult {
                call_id: "call-1".into(),
                name: "get_schema".into(),
                output: "Table: sales".into(),
            }],
            tools: vec![],
            temperature: 0.0,
        };

        let messages = OpenAiProvider::build_tool_messages(&request);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, "assistant");
        assert!(messages[1].tool_calls.is_some());
        assert_eq!(messages[2].role, "tool");
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn stream_chunk_parses_tool_call_fragments() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"execute_sql","arguments":"{\"qu"}}]},"finish_reason":null}]}"#;
        let chunk: ChatStreamChunk = serde_json::from_str(data).unwrap();
        let tc = &chunk.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(tc.id.as_deref(), Some("c1"));
        assert_eq!(
            tc.function.as_ref().unwrap().name.as_deref(),
            Some("execute_sql")
        );
    }
}

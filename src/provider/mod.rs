//! Model backend abstraction.
//!
//! One trait, one OpenAI-compatible implementation. Both agent runs go
//! through `Provider` so the loops can be exercised with scripted
//! backends in tests.

mod openai;

pub use openai::OpenAiProvider;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Unified provider trait for chat-completion backends.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Start a streaming completion for a fresh conversation turn.
    async fn create_stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>>;

    /// Continue a conversation with tool results (streaming).
    async fn continue_with_tools_stream(
        &self,
        request: ToolContinueRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Tool definition in provider-neutral form.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Output of one executed tool call, fed back for continuation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub input: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            input: input.into(),
            messages: Vec::new(),
            tools: Vec::new(),
            temperature: 0.0,
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ToolContinueRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub tool_results: Vec<ToolResult>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
}

/// Streamed events out of a completion run.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental text fragment.
    TextDelta(String),
    /// The model started a tool call.
    FunctionCallStart { call_id: String, name: String },
    /// Argument JSON fragment for an in-flight tool call.
    FunctionCallDelta {
        call_id: String,
        arguments_delta: String,
    },
    /// The tool call's arguments are complete.
    FunctionCallEnd { call_id: String },
    /// Stream-level failure; terminates the run.
    Error(String),
    /// End of stream.
    Done,
}

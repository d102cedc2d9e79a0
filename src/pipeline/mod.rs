//! Response pipeline: one question in, one user-facing string out.
//!
//! Owns the per-request session, aggregates the root agent's streamed
//! fragments into raw output, then extracts or recovers the final
//! answer. Any error raised during the run is classified into one of
//! three fixed busy messages; a caller never sees internal detail.

mod classify;
mod extract;

pub use classify::classify_failure;
pub use extract::{clean_response, extract_answer_span, strip_narration};

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::agent::RootAgent;
use crate::provider::{OpenAiProvider, Provider};

/// Answer one question with the configured backend.
pub async fn answer_question(question: &str) -> String {
    let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::from_config());
    answer_question_with(RootAgent::new(provider), question).await
}

/// Same contract, caller-supplied agent. The return value is always a
/// presentable string, either the cleaned answer or a busy message.
pub async fn answer_question_with(agent: RootAgent, question: &str) -> String {
    match run_session(agent, question.to_string()).await {
        Ok(raw) => {
            info!("\n[RAW_AGENT_OUTPUT_START]\n{raw}\n[RAW_AGENT_OUTPUT_END]\n");
            let cleaned = clean_response(&raw);
            info!("\n[CLEANED_OUTPUT_START]\n{cleaned}\n[CLEANED_OUTPUT_END]\n");
            cleaned
        }
        Err(e) => classify_failure(&format!("{e:#}")),
    }
}

/// Run one session to completion, concatenating fragments in arrival
/// order into the raw output.
async fn run_session(agent: RootAgent, question: String) -> Result<String> {
    let session = Uuid::new_v4();
    info!(%session, question = %question, "received query");

    let (tx, mut rx) = mpsc::channel::<String>(64);
    let run = tokio::spawn(async move { agent.run(session, &question, tx).await });

    let mut raw = String::new();
    while let Some(fragment) = rx.recv().await {
        raw.push_str(&fragment);
    }
    run.await??;
    Ok(raw)
}

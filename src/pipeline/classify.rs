//! Failure classification: every run error maps to one of three fixed
//! user-facing messages. Internal detail goes to the log only.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, warn};

static WAIT_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"try again in (\d+(\.\d+)?)s").unwrap());

const DEFAULT_WAIT: &str = "20";

pub fn classify_failure(error_msg: &str) -> String {
    if error_msg.contains("RateLimitError") || error_msg.contains("429") {
        warn!(error = %error_msg, "rate limited");
        let wait = WAIT_SECONDS
            .captures(error_msg)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| DEFAULT_WAIT.to_string());
        return format!(
            "⚠️ **System Busy**: Rate limit reached. Please try again in **{wait} seconds**."
        );
    }

    if error_msg.contains("Tool call validation failed") || error_msg.contains("exec_python") {
        warn!(error = %error_msg, "tool call validation failure");
        return "⚠️ **System Busy**: The AI is momentarily overwhelmed. \
                Please wait 10-15 seconds and try asking again."
            .to_string();
    }

    error!(error = %error_msg, "agent run failed");
    "⚠️ **System Busy**: An internal error occurred. Please wait a moment and try again."
        .to_string()
}

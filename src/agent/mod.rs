//! Agent runs: the root agent and its SQL sub-agent.
//!
//! Both are thin loops over a [`Provider`](crate::provider::Provider)
//! stream: accumulate text deltas, assemble tool calls from argument
//! fragments, execute them, and continue the conversation with the
//! results until the model produces a final turn.

mod prompts;
mod root;
mod sql_agent;

pub use prompts::{root_global_instruction, root_instruction, sql_agent_instruction};
pub use root::RootAgent;
pub use sql_agent::SqlAgent;

use std::collections::HashMap;

/// Upper bound on tool-continuation rounds within one run.
pub(crate) const MAX_TOOL_ROUNDS: usize = 8;

/// Reassembles tool calls from streamed start/delta/end events.
#[derive(Default)]
pub(crate) struct ToolCallAssembler {
    pending: HashMap<String, (String, String)>,
}

impl ToolCallAssembler {
    pub fn start(&mut self, call_id: String, name: String) {
        self.pending.insert(call_id, (name, String::new()));
    }

    pub fn push_args(&mut self, call_id: &str, delta: &str) {
        if let Some((_, args)) = self.pending.get_mut(call_id) {
            args.push_str(delta);
        }
    }

    /// Complete a call, returning its (name, raw argument JSON).
    pub fn finish(&mut self, call_id: &str) -> Option<(String, String)> {
        self.pending.remove(call_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembler_accumulates_argument_fragments() {
        let mut assembler = ToolCallAssembler::default();
        assembler.start("c1".into(), "execute_sql".into());
        assembler.push_args("c1", r#"{"query":"#);
        assembler.push_args("c1", r#" "SELECT 1"}"#);

        let (name, args) = assembler.finish("c1").unwrap();
        assert_eq!(name, "execute_sql");
        assert_eq!(args, r#"{"query": "SELECT 1"}"#);
        assert!(assembler.finish("c1").is_none());
    }

    #[test]
    fn assembler_ignores_deltas_for_unknown_calls() {
        let mut assembler = ToolCallAssembler::default();
        assembler.push_args("ghost", "{}");
        assert!(assembler.finish("ghost").is_none());
    }
}

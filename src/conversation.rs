//! Conversation store for switchboard.
//!
//! A [`ConversationState`] is an ordered log of [`ConversationEntry`] values:
//! plain messages, function calls requested by the model, and the results fed
//! back for them. Entries are only ever appended in production order; the
//! whole sequence is what the model sees on the next round.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The author of a [`ConversationEntry::Message`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Caller-authored instruction text (system prompt).
    #[serde(alias = "system")]
    Developer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "you"),
            Role::Assistant => write!(f, "assistant"),
            Role::Developer => write!(f, "developer"),
        }
    }
}

/// A single turn item in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEntry {
    Message {
        role: Role,
        content: String,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: Value,
    },
    FunctionResult {
        call_id: String,
        output: Value,
    },
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Assistant,
            content: text.into(),
        }
    }

    pub fn developer(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Developer,
            content: text.into(),
        }
    }

    pub fn function_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self::FunctionCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn function_result(call_id: impl Into<String>, output: Value) -> Self {
        Self::FunctionResult {
            call_id: call_id.into(),
            output,
        }
    }

    /// Returns the role if this entry is a plain message.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Message { role, .. } => Some(*role),
            _ => None,
        }
    }
}

/// Session-scoped, ordered conversation log.
///
/// Owned by exactly one session and passed explicitly to the negotiation
/// loop; never shared between sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    entries: Vec<ConversationEntry>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    /// Swaps the whole sequence in one step.
    pub fn replace_all(&mut self, entries: Vec<ConversationEntry>) {
        self.entries = entries;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn history(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every function result answers exactly one earlier,
    /// not yet answered function call.
    pub fn results_are_paired(&self) -> bool {
        let mut open: Vec<&str> = Vec::new();
        for entry in &self.entries {
            match entry {
                ConversationEntry::FunctionCall { call_id, .. } => open.push(call_id.as_str()),
                ConversationEntry::FunctionResult { call_id, .. } => {
                    match open.iter().position(|id| *id == call_id.as_str()) {
                        Some(pos) => {
                            open.remove(pos);
                        }
                        None => return false,
                    }
                }
                ConversationEntry::Message { .. } => {}
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_preserves_order() {
        let mut state = ConversationState::new();
        state.append(ConversationEntry::user("hi"));
        state.append(ConversationEntry::assistant("hello"));
        assert_eq!(state.len(), 2);
        assert_eq!(state.history()[0].role(), Some(Role::User));
        assert_eq!(state.history()[1].role(), Some(Role::Assistant));
    }

    #[test]
    fn test_replace_all_then_history_returns_same_sequence() {
        let seq = vec![
            ConversationEntry::developer("policy"),
            ConversationEntry::user("list clients"),
            ConversationEntry::function_call("c1", "list_clients", json!({})),
            ConversationEntry::function_result("c1", json!([{"id": "1"}])),
            ConversationEntry::assistant("one client"),
        ];
        let mut state = ConversationState::new();
        state.append(ConversationEntry::user("stale"));
        state.replace_all(seq.clone());
        assert_eq!(state.history(), seq.as_slice());
    }

    #[test]
    fn test_clear_empties_state() {
        let mut state = ConversationState::new();
        state.append(ConversationEntry::user("hi"));
        state.clear();
        assert!(state.is_empty());
        assert_eq!(state, ConversationState::new());
    }

    #[test]
    fn test_results_are_paired() {
        let mut state = ConversationState::new();
        state.append(ConversationEntry::function_call("a", "t", json!({})));
        state.append(ConversationEntry::function_result("a", json!(null)));
        assert!(state.results_are_paired());

        state.append(ConversationEntry::function_result("a", json!(null)));
        assert!(!state.results_are_paired());
    }

    #[test]
    fn test_orphan_result_is_unpaired() {
        let mut state = ConversationState::new();
        state.append(ConversationEntry::function_result("ghost", json!(1)));
        assert!(!state.results_are_paired());
    }

    #[test]
    fn test_entry_serializes_with_type_tag() {
        let entry = ConversationEntry::function_call("c1", "get_user", json!({"user_id": "7"}));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "function_call");
        assert_eq!(value["name"], "get_user");

        let parsed: ConversationEntry =
            serde_json::from_value(json!({"type": "message", "role": "system", "content": "x"}))
                .unwrap();
        assert_eq!(parsed.role(), Some(Role::Developer));
    }
}

//! Session-scoped state for switchboard.
//!
//! A [`Session`] owns one [`ConversationState`] for the lifetime of a chat.
//! When a transcript path is given, every committed entry is appended to it
//! as a JSON line, and `reset` is recorded as an event line. JSONL is
//! crash-safe (append-only) and human-readable.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::conversation::{ConversationEntry, ConversationState};

/// One line of the transcript file.
#[derive(Serialize)]
struct TranscriptLine<'a> {
    session: &'a str,
    at: String,
    #[serde(flatten)]
    body: LineBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum LineBody<'a> {
    Entry { entry: &'a ConversationEntry },
    Event { event: &'static str },
}

/// An active conversation session.
pub struct Session {
    pub id: String,
    state: ConversationState,
    transcript: Option<PathBuf>,
}

impl Session {
    /// Creates a new session with a UUID v4 identifier.
    ///
    /// Ensures the transcript's parent directory exists.
    pub fn new(transcript: Option<PathBuf>) -> Result<Self> {
        if let Some(parent) = transcript.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create transcript directory {:?}", parent))?;
            }
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            state: ConversationState::new(),
            transcript,
        })
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript.as_deref()
    }

    /// Writes every entry from index `from` onwards to the transcript.
    ///
    /// Called after a turn commits, with the history length from before it.
    pub fn record_since(&self, from: usize) -> Result<()> {
        let entries = self.state.history().get(from..).unwrap_or_default();
        let bodies: Vec<LineBody<'_>> = entries.iter().map(|entry| LineBody::Entry { entry }).collect();
        self.write_lines(bodies)
    }

    /// Clears the conversation and records the reset.
    pub fn reset(&mut self) -> Result<()> {
        self.state.clear();
        debug!(session = %self.id, "conversation reset");
        self.write_lines(vec![LineBody::Event { event: "reset" }])
    }

    fn write_lines(&self, bodies: Vec<LineBody<'_>>) -> Result<()> {
        let Some(path) = &self.transcript else {
            return Ok(());
        };
        if bodies.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open transcript {:?}", path))?;

        let at = Utc::now().to_rfc3339();
        for body in bodies {
            let line = TranscriptLine {
                session: &self.id,
                at: at.clone(),
                body,
            };
            writeln!(file, "{}", serde_json::to_string(&line)?)?;
        }
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn temp_transcript(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("switchboard-session-{}", std::process::id()));
        let path = dir.join(format!("{name}.jsonl"));
        let _ = fs::remove_file(&path);
        path
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_without_transcript_nothing_is_written() {
        let mut session = Session::new(None).unwrap();
        session.state_mut().append(ConversationEntry::user("hi"));
        session.record_since(0).unwrap();
        session.reset().unwrap();
        assert!(session.state().is_empty());
        assert!(session.transcript_path().is_none());
    }

    #[test]
    fn test_record_since_appends_only_new_entries() {
        let path = temp_transcript("record");
        let mut session = Session::new(Some(path.clone())).unwrap();
        assert_eq!(session.transcript_path(), Some(path.as_path()));

        session.state_mut().append(ConversationEntry::user("list all clients"));
        session.record_since(0).unwrap();
        let before = session.state().len();
        session
            .state_mut()
            .append(ConversationEntry::function_call("c1", "list_clients", json!({})));
        session
            .state_mut()
            .append(ConversationEntry::function_result("c1", json!([])));
        session.record_since(before).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["session"], session.id.as_str());
        assert_eq!(lines[0]["entry"]["type"], "message");
        assert_eq!(lines[1]["entry"]["name"], "list_clients");
        assert_eq!(lines[2]["entry"]["type"], "function_result");
    }

    #[test]
    fn test_reset_clears_state_and_logs_event() {
        let path = temp_transcript("reset");
        let mut session = Session::new(Some(path.clone())).unwrap();
        session.state_mut().append(ConversationEntry::user("hello"));
        session.record_since(0).unwrap();

        session.reset().unwrap();

        assert!(session.state().is_empty());
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["event"], "reset");
        assert!(lines[1].get("entry").is_none());
    }

    #[test]
    fn test_record_since_past_end_is_noop() {
        let path = temp_transcript("noop");
        let session = Session::new(Some(path.clone())).unwrap();
        session.record_since(5).unwrap();
        assert!(!path.exists());
    }
}

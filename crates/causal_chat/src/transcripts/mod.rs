//! Transcript model and loading
//!
//! A dataset is a JSON document `{"transcripts": [...]}`. Each transcript is
//! flattened into ordered [`Turn`] records by [`preprocess_transcripts`]; the
//! analysis stages only ever see turns.

mod preprocess;
mod stats;

pub use preprocess::{label_outcome, preprocess_transcripts};
pub use stats::DatasetStatistics;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AnalysisError;

/// Message as it appears in the dataset. Fields are optional here so that a
/// malformed record surfaces as a validation error instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawMessage {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl RawMessage {
    pub fn new(speaker: &str, text: &str) -> Self {
        Self {
            speaker: Some(speaker.to_string()),
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    pub transcript_id: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub reason_for_call: String,
    #[serde(default)]
    pub conversation: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    transcripts: Vec<Transcript>,
}

/// Final state of a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Escalated,
    Resolved,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Escalated => f.write_str("ESCALATED"),
            Outcome::Resolved => f.write_str("RESOLVED"),
        }
    }
}

/// One message of a conversation, carrying its conversation's metadata.
///
/// `turn_number` is 1-based and contiguous within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub transcript_id: String,
    pub domain: String,
    pub intent: String,
    pub outcome: Outcome,
    pub turn_number: u32,
    pub speaker: String,
    pub text: String,
}

impl Turn {
    pub fn is_escalated(&self) -> bool {
        self.outcome == Outcome::Escalated
    }
}

pub fn parse_transcripts(contents: &str) -> Result<Vec<Transcript>, serde_json::Error> {
    let dataset: Dataset = serde_json::from_str(contents)?;
    Ok(dataset.transcripts)
}

pub fn load_transcripts(path: impl AsRef<Path>) -> Result<Vec<Transcript>, AnalysisError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| AnalysisError::ReadDataset {
        path: path.display().to_string(),
        source,
    })?;

    let transcripts =
        parse_transcripts(&contents).map_err(|source| AnalysisError::ParseDataset {
            path: path.display().to_string(),
            source,
        })?;

    info!(
        path = %path.display(),
        transcripts = transcripts.len(),
        "loaded transcripts"
    );
    Ok(transcripts)
}

// ============================================================================
// Conversation grouping
// ============================================================================

/// The turns of one conversation, in stream order
#[derive(Debug, Clone)]
pub struct ConversationTurns<'a> {
    pub transcript_id: &'a str,
    pub turns: Vec<&'a Turn>,
}

/// Turn surrounding a target turn, see [`ConversationTurns::context`]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContextTurn<'a> {
    pub turn_number: u32,
    pub speaker: &'a str,
    pub text: &'a str,
    pub is_target: bool,
}

impl<'a> ConversationTurns<'a> {
    /// Turns within `window` positions before and after `turn_number`
    pub fn context(&self, turn_number: u32, window: u32) -> Vec<ContextTurn<'a>> {
        let first = turn_number.saturating_sub(window);
        let last = turn_number.saturating_add(window);

        self.turns
            .iter()
            .filter(|t| t.turn_number >= first && t.turn_number <= last)
            .map(|t| ContextTurn {
                turn_number: t.turn_number,
                speaker: &t.speaker,
                text: &t.text,
                is_target: t.turn_number == turn_number,
            })
            .collect()
    }
}

/// Group turns by conversation, keeping conversations in order of first
/// appearance and turns in stream order.
pub fn group_by_conversation(turns: &[Turn]) -> Vec<ConversationTurns<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<ConversationTurns<'_>> = Vec::new();

    for turn in turns {
        let slot = *index.entry(turn.transcript_id.as_str()).or_insert_with(|| {
            groups.push(ConversationTurns {
                transcript_id: turn.transcript_id.as_str(),
                turns: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].turns.push(turn);
    }

    groups
}

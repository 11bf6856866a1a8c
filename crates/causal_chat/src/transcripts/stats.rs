use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{Outcome, Transcript, Turn};

const TOP_INTENTS: usize = 10;

/// Dataset-level counts reported alongside the analysis
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetStatistics {
    pub total_transcripts: usize,
    pub total_turns: usize,
    pub escalated_conversations: usize,
    pub resolved_conversations: usize,
    /// Percentage of transcripts labeled escalated, rounded to 2 decimals
    pub escalation_rate: f64,
    pub avg_turns_per_conversation: f64,
    pub domains: BTreeMap<String, usize>,
    /// Most common intents, most frequent first
    pub top_intents: Vec<(String, usize)>,
    pub total_intents: usize,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl DatasetStatistics {
    pub fn compute(transcripts: &[Transcript], turns: &[Turn]) -> Self {
        let mut outcomes: HashMap<&str, Outcome> = HashMap::new();
        for turn in turns {
            outcomes.entry(&turn.transcript_id).or_insert(turn.outcome);
        }
        let escalated_conversations = outcomes
            .values()
            .filter(|o| **o == Outcome::Escalated)
            .count();
        let resolved_conversations = outcomes.len() - escalated_conversations;

        let mut domains = BTreeMap::new();
        let mut intents: HashMap<&str, usize> = HashMap::new();
        for transcript in transcripts {
            let domain = if transcript.domain.is_empty() {
                "Unknown"
            } else {
                transcript.domain.as_str()
            };
            *domains.entry(domain.to_string()).or_insert(0) += 1;

            let intent = if transcript.intent.is_empty() {
                "Unknown"
            } else {
                transcript.intent.as_str()
            };
            *intents.entry(intent).or_insert(0) += 1;
        }

        let total_intents = intents.len();
        let mut top_intents: Vec<(String, usize)> = intents
            .into_iter()
            .map(|(intent, count)| (intent.to_string(), count))
            .collect();
        top_intents.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_intents.truncate(TOP_INTENTS);

        let total_transcripts = transcripts.len();
        let (escalation_rate, avg_turns_per_conversation) = if total_transcripts == 0 {
            (0.0, 0.0)
        } else {
            (
                round2(escalated_conversations as f64 / total_transcripts as f64 * 100.0),
                round2(turns.len() as f64 / total_transcripts as f64),
            )
        };

        Self {
            total_transcripts,
            total_turns: turns.len(),
            escalated_conversations,
            resolved_conversations,
            escalation_rate,
            avg_turns_per_conversation,
            domains,
            top_intents,
            total_intents,
        }
    }
}

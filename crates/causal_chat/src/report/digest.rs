use std::collections::HashMap;

use serde::Serialize;

use crate::analyzer::AnalysisResults;
use crate::risk::peak_risk;
use crate::signals::{dominant_signal, SignalEngine};
use crate::transcripts::{group_by_conversation, ContextTurn, ConversationTurns, Turn};

/// A warning with the surrounding turns and its conversation's risk picture
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WarningDigest<'a> {
    pub transcript_id: &'a str,
    pub turn_number: u32,
    pub confidence: f64,
    /// Most frequent signal up to and including the warning turn
    pub dominant_signal: Option<&'a str>,
    /// Highest window score of the conversation, if any window was risky
    pub peak_risk: Option<f64>,
    pub context: Vec<ContextTurn<'a>>,
}

/// Digest the first `limit` warnings (single-signal first). Warnings whose
/// conversation is not in `turns` are skipped.
pub fn warning_digests<'a>(
    engine: &'a SignalEngine,
    results: &'a AnalysisResults,
    turns: &'a [Turn],
    context_window: u32,
    limit: usize,
) -> Vec<WarningDigest<'a>> {
    let conversations: HashMap<&str, ConversationTurns<'a>> = group_by_conversation(turns)
        .into_iter()
        .map(|c| (c.transcript_id, c))
        .collect();
    let peaks = peak_risk(&results.risk);

    results
        .warnings()
        .take(limit)
        .filter_map(|warning| {
            let conversation = conversations.get(warning.transcript_id.as_str())?;
            let by_turn = engine.signals_by_turn(conversation.turns.iter().copied());
            let dominant = dominant_signal(
                by_turn
                    .range(..=warning.turn_number)
                    .flat_map(|(_, signals)| signals.iter().copied()),
            );

            Some(WarningDigest {
                transcript_id: conversation.transcript_id,
                turn_number: warning.turn_number,
                confidence: warning.confidence,
                dominant_signal: dominant,
                peak_risk: peaks.get(conversation.transcript_id).copied(),
                context: conversation.context(warning.turn_number, context_window),
            })
        })
        .collect()
}

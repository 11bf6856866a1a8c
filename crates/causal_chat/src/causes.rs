//! Cause aggregation
//!
//! Signals observed in escalated conversations are treated as candidate
//! causes of the escalation and ranked by frequency. This is co-occurrence
//! counting, not causal inference.

use std::collections::BTreeMap;

use common::consts::MAX_EVIDENCE_ITEMS;
use serde::Serialize;
use tracing::debug;

use crate::signals::SignalEngine;
use crate::transcripts::Turn;

/// One concrete occurrence backing a cause
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvidenceItem {
    pub transcript_id: String,
    pub turn_number: u32,
    pub text: String,
}

/// Signal name to occurrence count, escalated conversations only
pub type CauseStatistics = BTreeMap<String, usize>;

/// Signal name to the first [`MAX_EVIDENCE_ITEMS`] occurrences in stream order
pub type Evidence = BTreeMap<String, Vec<EvidenceItem>>;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CauseAnalysis {
    pub statistics: CauseStatistics,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedCause<'a> {
    pub cause: &'a str,
    pub count: usize,
    /// Share of all escalation signals, in percent
    pub share: f64,
}

impl CauseAnalysis {
    pub fn total_signals(&self) -> usize {
        self.statistics.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }

    /// Causes by descending count, ties by name
    pub fn ranked(&self) -> Vec<RankedCause<'_>> {
        let total = self.total_signals();
        let mut ranked: Vec<RankedCause<'_>> = self
            .statistics
            .iter()
            .map(|(cause, count)| RankedCause {
                cause,
                count: *count,
                share: if total == 0 {
                    0.0
                } else {
                    *count as f64 / total as f64 * 100.0
                },
            })
            .collect();
        // BTreeMap iteration is already name-ordered, a stable sort keeps it for ties
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }

    pub fn top_cause(&self) -> Option<RankedCause<'_>> {
        self.ranked().into_iter().next()
    }
}

/// Tally signals over the turns of escalated conversations and keep a bounded
/// evidence sample per signal.
pub fn analyze_causes(engine: &SignalEngine, turns: &[Turn]) -> CauseAnalysis {
    let mut analysis = CauseAnalysis::default();

    for turn in turns.iter().filter(|t| t.is_escalated()) {
        for signal in engine.extract_signals(turn) {
            *analysis.statistics.entry(signal.to_string()).or_insert(0) += 1;

            let samples = analysis.evidence.entry(signal.to_string()).or_default();
            if samples.len() < MAX_EVIDENCE_ITEMS {
                samples.push(EvidenceItem {
                    transcript_id: turn.transcript_id.clone(),
                    turn_number: turn.turn_number,
                    text: turn.text.clone(),
                });
            }
        }
    }

    debug!(
        causes = analysis.statistics.len(),
        total_signals = analysis.total_signals(),
        "aggregated escalation causes"
    );
    analysis
}

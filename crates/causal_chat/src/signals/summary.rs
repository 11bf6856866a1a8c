use std::collections::HashMap;

use serde::Serialize;

use super::SignalEngine;
use crate::transcripts::Turn;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignalCount {
    pub signal: String,
    pub count: usize,
    /// Share of all turns carrying this signal, in percent
    pub percentage: f64,
}

/// Signal frequencies over a set of turns, regardless of outcome
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignalSummary {
    pub total_turns: usize,
    pub total_signals: usize,
    /// Most common first; ties in rule-table order
    pub counts: Vec<SignalCount>,
}

impl SignalSummary {
    pub fn from_turns(engine: &SignalEngine, turns: &[Turn]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for turn in turns {
            for signal in engine.extract_signals(turn) {
                *counts.entry(signal).or_insert(0) += 1;
            }
        }

        let total_turns = turns.len();
        let mut ordered: Vec<SignalCount> = engine
            .signal_names()
            .filter_map(|name| counts.get(name).map(|count| (name, *count)))
            .map(|(name, count)| SignalCount {
                signal: name.to_string(),
                count,
                percentage: if total_turns == 0 {
                    0.0
                } else {
                    count as f64 / total_turns as f64 * 100.0
                },
            })
            .collect();
        // stable sort keeps rule order among equal counts
        ordered.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            total_turns,
            total_signals: ordered.iter().map(|c| c.count).sum(),
            counts: ordered,
        }
    }
}

//! Sliding-window escalation risk
//!
//! Each conversation is scanned with a window of `W` consecutive turns. A
//! window's risk is its signal count normalized so that an average of two
//! signals per turn saturates the score at 1.0.

use std::collections::BTreeMap;

use common::consts::SIGNALS_PER_TURN_SATURATION;
use serde::Serialize;
use tracing::debug;

use crate::signals::SignalEngine;
use crate::transcripts::{group_by_conversation, Turn};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskWindow {
    pub start_turn: u32,
    pub end_turn: u32,
    pub signal_count: usize,
    /// In `(0, 1]`; windows without signals are never emitted
    pub risk_score: f64,
}

impl RiskWindow {
    /// Turn range rendered as `"start-end"`
    pub fn turn_range(&self) -> String {
        format!("{}-{}", self.start_turn, self.end_turn)
    }
}

/// Conversation id to its scored windows. Conversations without any risky
/// window are absent.
pub type RiskScores = BTreeMap<String, Vec<RiskWindow>>;

/// Score every window of `signal_counts`, one entry per turn in order
fn score_windows(
    turn_numbers: &[u32],
    signal_counts: &[usize],
    window_size: usize,
) -> Vec<RiskWindow> {
    if window_size == 0 {
        return Vec::new();
    }

    let saturation = (window_size * SIGNALS_PER_TURN_SATURATION) as f64;
    signal_counts
        .windows(window_size)
        .zip(turn_numbers.windows(window_size))
        .filter_map(|(counts, numbers)| {
            let signal_count: usize = counts.iter().sum();
            let risk_score = (signal_count as f64 / saturation).min(1.0);
            (risk_score > 0.0).then(|| RiskWindow {
                start_turn: numbers[0],
                end_turn: numbers[window_size - 1],
                signal_count,
                risk_score,
            })
        })
        .collect()
}

pub fn analyze_escalation_risk(
    engine: &SignalEngine,
    turns: &[Turn],
    window_size: usize,
) -> RiskScores {
    let mut scores = RiskScores::new();

    for conversation in group_by_conversation(turns) {
        let turn_numbers: Vec<u32> = conversation.turns.iter().map(|t| t.turn_number).collect();
        let signal_counts: Vec<usize> = conversation
            .turns
            .iter()
            .map(|t| engine.signal_count(t))
            .collect();

        let windows = score_windows(&turn_numbers, &signal_counts, window_size);
        if !windows.is_empty() {
            scores.insert(conversation.transcript_id.to_string(), windows);
        }
    }

    debug!(
        window_size,
        conversations = scores.len(),
        "escalation risk scored"
    );
    scores
}

/// Highest window score per conversation
pub fn peak_risk(scores: &RiskScores) -> BTreeMap<&str, f64> {
    scores
        .iter()
        .map(|(id, windows)| {
            let peak = windows.iter().map(|w| w.risk_score).fold(0.0, f64::max);
            (id.as_str(), peak)
        })
        .collect()
}

/// Number of conversations with at least one window scoring above `threshold`
pub fn high_risk_conversations(scores: &RiskScores, threshold: f64) -> usize {
    scores
        .values()
        .filter(|windows| windows.iter().any(|w| w.risk_score > threshold))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::turn;
    use crate::transcripts::Outcome;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_windows_from_counts() {
        let windows = score_windows(&[1, 2, 3, 4], &[1, 0, 1, 2], 3);
        assert_eq!(windows.len(), 2);

        assert_eq!(windows[0].turn_range(), "1-3");
        assert_eq!(windows[0].signal_count, 2);
        assert!((windows[0].risk_score - 2.0 / 6.0).abs() < 1e-9);

        assert_eq!(windows[1].turn_range(), "2-4");
        assert_eq!(windows[1].signal_count, 3);
        assert_eq!(windows[1].risk_score, 0.5);
    }

    #[test]
    fn test_zero_windows_omitted() {
        let windows = score_windows(&[1, 2, 3, 4, 5], &[0, 0, 0, 1, 0], 3);
        let ranges: Vec<String> = windows.iter().map(|w| w.turn_range()).collect();
        assert_eq!(ranges, vec!["2-4", "3-5"]);
    }

    #[test]
    fn test_risk_capped_at_one() {
        let windows = score_windows(&[1, 2], &[3, 4], 2);
        assert_eq!(windows[0].risk_score, 1.0);
        assert_eq!(windows[0].signal_count, 7);
    }

    #[test]
    fn test_short_conversation_has_no_windows() {
        assert!(score_windows(&[1, 2], &[2, 2], 3).is_empty());
        assert!(score_windows(&[1, 2], &[2, 2], 0).is_empty());
    }

    #[test]
    fn test_analyze_escalation_risk() {
        let engine = SignalEngine::default();
        let turns = vec![
            // per-turn signal counts [1, 0, 1, 2]
            turn("A", 1, "customer", "I am upset", Outcome::Escalated),
            turn("A", 2, "agent", "hello", Outcome::Escalated),
            turn("A", 3, "agent", "one moment", Outcome::Escalated),
            turn(
                "A",
                4,
                "agent",
                "sorry, please hold, that is not possible",
                Outcome::Escalated,
            ),
            turn("B", 1, "customer", "I am upset", Outcome::Resolved),
            turn("B", 2, "customer", "very upset", Outcome::Resolved),
            turn("Q", 1, "customer", "hi", Outcome::Resolved),
            turn("Q", 2, "agent", "hello", Outcome::Resolved),
            turn("Q", 3, "customer", "thanks", Outcome::Resolved),
        ];

        let scores = analyze_escalation_risk(&engine, &turns, 3);
        assert_eq!(scores.keys().collect::<Vec<_>>(), vec!["A"]);

        let windows = &scores["A"];
        assert_eq!(
            windows
                .iter()
                .map(|w| (w.turn_range(), w.signal_count))
                .collect::<Vec<_>>(),
            vec![("1-3".to_string(), 2), ("2-4".to_string(), 3)]
        );

        let peaks = peak_risk(&scores);
        assert_eq!(peaks["A"], 0.5);
        assert_eq!(high_risk_conversations(&scores, 0.7), 0);
        assert_eq!(high_risk_conversations(&scores, 0.4), 1);
    }

    #[test]
    fn test_empty_input() {
        let scores = analyze_escalation_risk(&SignalEngine::default(), &[], 3);
        assert!(scores.is_empty());
        assert_eq!(high_risk_conversations(&scores, 0.7), 0);
    }
}

//! Early warning detection
//!
//! Two detectors scan each conversation's turns in order and raise at most
//! one warning per conversation each:
//!
//! - single signal: the target signal has been seen `threshold` times;
//! - multi signal: the weighted sum of all signals seen so far reaches the
//!   confidence threshold.
//!
//! State is held in a tracker built when a conversation starts and dropped
//! once its turns are exhausted, so conversations never share state.

use std::collections::BTreeMap;

use common::configuration::MultiSignalConfig;
use serde::Serialize;
use tracing::debug;

use crate::signals::SignalEngine;
use crate::transcripts::{group_by_conversation, Turn};

// ============================================================================
// Warning records
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningDetail {
    SingleSignal {
        signal: String,
        signal_count: u32,
        first_signal_turn: u32,
    },
    MultiSignal {
        /// Uncapped cumulative weighted score at the firing turn
        score: f64,
        signals_detected: BTreeMap<String, u32>,
    },
}

/// Detection result tied to the turn where a threshold was first crossed
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WarningRecord {
    pub transcript_id: String,
    pub turn_number: u32,
    pub text: String,
    /// Always within `[0, 1]`
    pub confidence: f64,
    #[serde(flatten)]
    pub detail: WarningDetail,
}

impl WarningRecord {
    pub fn is_single_signal(&self) -> bool {
        matches!(self.detail, WarningDetail::SingleSignal { .. })
    }

    pub fn is_multi_signal(&self) -> bool {
        matches!(self.detail, WarningDetail::MultiSignal { .. })
    }
}

// ============================================================================
// Per-conversation trackers
// ============================================================================

/// Counts one target signal within a single conversation
#[derive(Debug)]
pub struct SingleSignalTracker<'a> {
    signal: &'a str,
    threshold: u32,
    count: u32,
    first_occurrence: Option<u32>,
}

impl<'a> SingleSignalTracker<'a> {
    pub fn new(signal: &'a str, threshold: u32) -> Self {
        Self {
            signal,
            threshold,
            count: 0,
            first_occurrence: None,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Feed the next turn and its signals. Returns a warning only at the turn
    /// where the running count becomes equal to the threshold.
    pub fn observe(&mut self, turn: &Turn, signals: &[&str]) -> Option<WarningRecord> {
        if !signals.contains(&self.signal) {
            return None;
        }

        let first_signal_turn = *self.first_occurrence.get_or_insert(turn.turn_number);
        self.count += 1;

        if self.count != self.threshold {
            return None;
        }

        Some(WarningRecord {
            transcript_id: turn.transcript_id.clone(),
            turn_number: turn.turn_number,
            text: turn.text.clone(),
            confidence: (self.count as f64 / self.threshold as f64).min(1.0),
            detail: WarningDetail::SingleSignal {
                signal: self.signal.to_string(),
                signal_count: self.count,
                first_signal_turn,
            },
        })
    }
}

/// Accumulates a weighted score over every signal in a single conversation
#[derive(Debug)]
pub struct MultiSignalTracker<'a> {
    config: &'a MultiSignalConfig,
    score: f64,
    counts: BTreeMap<String, u32>,
    fired: bool,
}

impl<'a> MultiSignalTracker<'a> {
    pub fn new(config: &'a MultiSignalConfig) -> Self {
        Self {
            config,
            score: 0.0,
            counts: BTreeMap::new(),
            fired: false,
        }
    }

    /// Cumulative score. It keeps growing after the warning has fired.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn observe(&mut self, turn: &Turn, signals: &[&str]) -> Option<WarningRecord> {
        let mut warning = None;

        for signal in signals {
            self.score += self.config.weight_for(signal);
            *self.counts.entry(signal.to_string()).or_insert(0) += 1;

            if !self.fired && self.score >= self.config.confidence_threshold {
                self.fired = true;
                warning = Some(WarningRecord {
                    transcript_id: turn.transcript_id.clone(),
                    turn_number: turn.turn_number,
                    text: turn.text.clone(),
                    confidence: self.score.min(1.0),
                    detail: WarningDetail::MultiSignal {
                        score: self.score,
                        signals_detected: self.counts.clone(),
                    },
                });
            }
        }

        warning
    }
}

// ============================================================================
// Detectors
// ============================================================================

/// Raise one warning per conversation at the turn where `signal` has been
/// observed `threshold` times.
pub fn detect_early_warnings(
    engine: &SignalEngine,
    turns: &[Turn],
    threshold: u32,
    signal: &str,
) -> Vec<WarningRecord> {
    let mut warnings = Vec::new();

    for conversation in group_by_conversation(turns) {
        let mut tracker = SingleSignalTracker::new(signal, threshold);
        for turn in &conversation.turns {
            let signals = engine.extract_signals(turn);
            if let Some(warning) = tracker.observe(turn, &signals) {
                warnings.push(warning);
            }
        }
    }

    debug!(
        signal,
        threshold,
        warnings = warnings.len(),
        "single signal detection complete"
    );
    warnings
}

/// Raise one warning per conversation at the turn where the weighted signal
/// score first reaches the configured confidence threshold.
pub fn detect_multi_signal_warnings(
    engine: &SignalEngine,
    turns: &[Turn],
    config: &MultiSignalConfig,
) -> Vec<WarningRecord> {
    let mut warnings = Vec::new();

    for conversation in group_by_conversation(turns) {
        let mut tracker = MultiSignalTracker::new(config);
        for turn in &conversation.turns {
            let signals = engine.extract_signals(turn);
            if let Some(warning) = tracker.observe(turn, &signals) {
                warnings.push(warning);
            }
        }
    }

    debug!(
        confidence_threshold = config.confidence_threshold,
        warnings = warnings.len(),
        "multi signal detection complete"
    );
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::turn;
    use crate::transcripts::Outcome;
    use common::consts::{AGENT_DELAY, AGENT_DENIAL, CUSTOMER_FRUSTRATION};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Frustration on turns 1, 3 and 5 of conversation "C"
    fn frustration_on_odd_turns() -> Vec<Turn> {
        vec![
            turn("C", 1, "customer", "I am upset", Outcome::Escalated),
            turn("C", 2, "agent", "I see", Outcome::Escalated),
            turn("C", 3, "customer", "this is ridiculous", Outcome::Escalated),
            turn("C", 4, "agent", "Understood", Outcome::Escalated),
            turn("C", 5, "customer", "I am angry", Outcome::Escalated),
        ]
    }

    #[test]
    fn test_single_signal_fires_once_at_threshold() {
        let engine = SignalEngine::default();
        let warnings =
            detect_early_warnings(&engine, &frustration_on_odd_turns(), 2, CUSTOMER_FRUSTRATION);

        assert_eq!(warnings.len(), 1);
        let warning = &warnings[0];
        assert_eq!(warning.transcript_id, "C");
        assert_eq!(warning.turn_number, 3);
        assert_eq!(warning.confidence, 1.0);
        assert_eq!(warning.text, "this is ridiculous");
        assert_eq!(
            warning.detail,
            WarningDetail::SingleSignal {
                signal: CUSTOMER_FRUSTRATION.to_string(),
                signal_count: 2,
                first_signal_turn: 1,
            }
        );
        assert!(warning.is_single_signal());
    }

    #[test]
    fn test_single_signal_threshold_not_reached() {
        let engine = SignalEngine::default();
        let warnings =
            detect_early_warnings(&engine, &frustration_on_odd_turns(), 4, CUSTOMER_FRUSTRATION);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_single_signal_threshold_one() {
        let engine = SignalEngine::default();
        let warnings =
            detect_early_warnings(&engine, &frustration_on_odd_turns(), 1, CUSTOMER_FRUSTRATION);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].turn_number, 1);
    }

    #[test]
    fn test_single_signal_per_conversation() {
        let engine = SignalEngine::default();
        let mut turns = frustration_on_odd_turns();
        turns.push(turn("D", 1, "customer", "I am upset", Outcome::Resolved));
        turns.push(turn("D", 2, "customer", "still upset", Outcome::Resolved));
        turns.push(turn("E", 1, "customer", "I am upset", Outcome::Resolved));

        let warnings = detect_early_warnings(&engine, &turns, 2, CUSTOMER_FRUSTRATION);
        let fired: Vec<(&str, u32)> = warnings
            .iter()
            .map(|w| (w.transcript_id.as_str(), w.turn_number))
            .collect();
        assert_eq!(fired, vec![("C", 3), ("D", 2)]);
    }

    #[test]
    fn test_single_signal_other_target() {
        let engine = SignalEngine::default();
        let turns = vec![
            turn("C", 1, "agent", "let me check", Outcome::Resolved),
            turn("C", 2, "agent", "one moment", Outcome::Resolved),
        ];
        let warnings = detect_early_warnings(&engine, &turns, 2, AGENT_DELAY);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].turn_number, 2);

        // unknown target never fires
        assert!(detect_early_warnings(&engine, &turns, 1, "agent_rudeness").is_empty());
    }

    #[test]
    fn test_tracker_ignores_other_signals() {
        let t = turn("C", 1, "agent", "one moment", Outcome::Resolved);
        let mut tracker = SingleSignalTracker::new(CUSTOMER_FRUSTRATION, 1);
        assert_eq!(tracker.observe(&t, &[AGENT_DELAY]), None);
        assert_eq!(tracker.count(), 0);
    }

    fn two_signal_config() -> MultiSignalConfig {
        MultiSignalConfig {
            weights: HashMap::from([
                (CUSTOMER_FRUSTRATION.to_string(), 0.5),
                (AGENT_DELAY.to_string(), 0.3),
            ]),
            confidence_threshold: 0.7,
            ..MultiSignalConfig::default()
        }
    }

    #[test]
    fn test_multi_signal_fires_once() {
        let engine = SignalEngine::default();
        let config = two_signal_config();
        let turns = vec![
            turn("C", 1, "customer", "I am so frustrated", Outcome::Escalated),
            turn("C", 2, "agent", "please hold", Outcome::Escalated),
            turn("C", 3, "customer", "I am angry", Outcome::Escalated),
            turn("C", 4, "agent", "one moment", Outcome::Escalated),
        ];

        let warnings = detect_multi_signal_warnings(&engine, &turns, &config);
        assert_eq!(warnings.len(), 1);

        let warning = &warnings[0];
        assert_eq!(warning.turn_number, 2);
        assert!((warning.confidence - 0.8).abs() < 1e-9);
        assert!(warning.is_multi_signal());
        match &warning.detail {
            WarningDetail::MultiSignal {
                signals_detected, ..
            } => assert_eq!(
                signals_detected,
                &BTreeMap::from([
                    (CUSTOMER_FRUSTRATION.to_string(), 1),
                    (AGENT_DELAY.to_string(), 1),
                ])
            ),
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn test_multi_signal_confidence_capped() {
        let engine = SignalEngine::default();
        let config = MultiSignalConfig {
            weights: HashMap::from([(CUSTOMER_FRUSTRATION.to_string(), 1.5)]),
            confidence_threshold: 0.7,
            ..MultiSignalConfig::default()
        };
        let turns = vec![turn("C", 1, "customer", "I am upset", Outcome::Resolved)];

        let warnings = detect_multi_signal_warnings(&engine, &turns, &config);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].confidence, 1.0);
        assert!(matches!(
            warnings[0].detail,
            WarningDetail::MultiSignal { score, .. } if score == 1.5
        ));
    }

    #[test]
    fn test_multi_signal_unknown_signal_default_weight() {
        let config = MultiSignalConfig {
            confidence_threshold: 0.5,
            default_weight: 0.25,
            ..MultiSignalConfig::default()
        };
        let mut tracker = MultiSignalTracker::new(&config);
        let t = turn("C", 1, "customer", "x", Outcome::Resolved);

        assert_eq!(tracker.observe(&t, &["agent_rudeness"]), None);
        let warning = tracker.observe(&t, &["agent_rudeness"]).unwrap();
        assert_eq!(warning.confidence, 0.5);
    }

    #[test]
    fn test_multi_signal_score_keeps_accumulating() {
        let config = MultiSignalConfig::default();
        let mut tracker = MultiSignalTracker::new(&config);
        let t = turn("C", 1, "customer", "x", Outcome::Resolved);

        assert!(tracker
            .observe(&t, &[CUSTOMER_FRUSTRATION, AGENT_DELAY])
            .is_some());
        assert!(tracker
            .observe(&t, &[CUSTOMER_FRUSTRATION, AGENT_DENIAL])
            .is_none());
        assert!((tracker.score() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_multi_signal_snapshot_taken_at_crossing() {
        let config = MultiSignalConfig::default();
        let mut tracker = MultiSignalTracker::new(&config);
        let t = turn("C", 1, "agent", "x", Outcome::Resolved);

        // 0.5 + 0.3 crosses on the second signal; the denial after it is not in the snapshot
        let warning = tracker
            .observe(&t, &[CUSTOMER_FRUSTRATION, AGENT_DELAY, AGENT_DENIAL])
            .unwrap();
        match warning.detail {
            WarningDetail::MultiSignal {
                signals_detected, ..
            } => {
                assert_eq!(signals_detected.len(), 2);
                assert!(!signals_detected.contains_key(AGENT_DENIAL));
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn test_no_signals_no_warnings() {
        let engine = SignalEngine::default();
        let turns = vec![
            turn("C", 1, "customer", "hello there", Outcome::Resolved),
            turn("C", 2, "agent", "how can I help", Outcome::Resolved),
        ];
        assert!(detect_early_warnings(&engine, &turns, 1, CUSTOMER_FRUSTRATION).is_empty());
        assert!(
            detect_multi_signal_warnings(&engine, &turns, &MultiSignalConfig::default())
                .is_empty()
        );
        assert!(detect_early_warnings(&engine, &[], 2, CUSTOMER_FRUSTRATION).is_empty());
    }

    #[test]
    fn test_warning_serializes_flat() {
        let warning = WarningRecord {
            transcript_id: "C".to_string(),
            turn_number: 3,
            text: "upset".to_string(),
            confidence: 1.0,
            detail: WarningDetail::SingleSignal {
                signal: CUSTOMER_FRUSTRATION.to_string(),
                signal_count: 2,
                first_signal_turn: 1,
            },
        };
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["kind"], "single_signal");
        assert_eq!(value["first_signal_turn"], 1);
        assert_eq!(value["turn_number"], 3);
    }
}

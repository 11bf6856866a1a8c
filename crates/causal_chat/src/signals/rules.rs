//! Signal rule engine
//!
//! Every signal is one declarative [`SignalRuleConfig`] record; this module
//! compiles the rule table once and evaluates it against turns with a single
//! generic interpreter. Evaluation is a pure function of the turn's speaker
//! and text.

use std::collections::BTreeMap;

use common::configuration::{SignalRuleConfig, SignalsConfig, SpeakerRole};

use crate::transcripts::Turn;

// ============================================================================
// Normalized text
// ============================================================================

/// Lowercased text with typographic punctuation folded to ASCII
#[derive(Debug, Clone)]
struct NormalizedText {
    lowered: String,
    word_count: usize,
}

fn normalize(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'") // U+2019/U+2018 SINGLE QUOTATION MARKs
        .replace(['\u{201C}', '\u{201D}'], "\"") // U+201C/U+201D DOUBLE QUOTATION MARKs
        .replace(['\u{2013}', '\u{2014}'], "-") // U+2013/U+2014 EN/EM DASHes
        .to_lowercase()
}

impl NormalizedText {
    fn from_text(text: &str) -> Self {
        Self {
            lowered: normalize(text),
            word_count: text.split_whitespace().count(),
        }
    }

    fn contains(&self, needle: &str) -> bool {
        self.lowered.contains(needle)
    }
}

// ============================================================================
// Compiled rules
// ============================================================================

#[derive(Debug, Clone)]
struct SignalRule {
    name: String,
    role: SpeakerRole,
    keywords: Vec<String>,
    must_contain: Vec<String>,
    min_word_count: Option<usize>,
}

impl SignalRule {
    fn compile(config: &SignalRuleConfig) -> Self {
        Self {
            name: config.name.clone(),
            role: config.role,
            keywords: config.keywords.iter().map(|k| normalize(k)).collect(),
            must_contain: config.must_contain.iter().map(|k| normalize(k)).collect(),
            min_word_count: config.min_word_count,
        }
    }

    fn matches(&self, speaker: &str, text: &NormalizedText) -> bool {
        if !self.role.matches(speaker) {
            return false;
        }

        if !self.keywords.iter().any(|k| text.contains(k)) {
            return false;
        }

        // AND filter layered on top of the keyword OR
        if !self.must_contain.iter().all(|k| text.contains(k)) {
            return false;
        }

        match self.min_word_count {
            Some(min) => text.word_count >= min,
            None => true,
        }
    }

    /// Fraction of this rule's keywords present in the text
    fn keyword_coverage(&self, text: &NormalizedText) -> f64 {
        let matches = self.keywords.iter().filter(|k| text.contains(k)).count();
        (matches as f64 / self.keywords.len().max(1) as f64).min(1.0)
    }
}

// ============================================================================
// Signal engine
// ============================================================================

/// Evaluates the configured rule table against conversation turns.
///
/// The engine is immutable once built and can be shared freely between
/// analyses.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    rules: Vec<SignalRule>,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(&SignalsConfig::default())
    }
}

impl SignalEngine {
    pub fn new(config: &SignalsConfig) -> Self {
        Self {
            rules: config.rules.iter().map(SignalRule::compile).collect(),
        }
    }

    /// Signals triggered by one turn, in rule-table order
    pub fn extract_signals(&self, turn: &Turn) -> Vec<&str> {
        self.extract(&turn.speaker, &turn.text)
    }

    pub fn extract(&self, speaker: &str, text: &str) -> Vec<&str> {
        let normalized = NormalizedText::from_text(text);
        self.rules
            .iter()
            .filter(|rule| rule.matches(speaker, &normalized))
            .map(|rule| rule.name.as_str())
            .collect()
    }

    pub fn signal_count(&self, turn: &Turn) -> usize {
        let normalized = NormalizedText::from_text(&turn.text);
        self.rules
            .iter()
            .filter(|rule| rule.matches(&turn.speaker, &normalized))
            .count()
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn has_signal(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }

    /// Keyword coverage of `signal` in the turn's text, in `[0, 1]`.
    ///
    /// Returns 0.0 for a signal that is not configured. The role filter is not
    /// applied.
    pub fn signal_confidence(&self, turn: &Turn, signal: &str) -> f64 {
        match self.rules.iter().find(|r| r.name == signal) {
            Some(rule) => rule.keyword_coverage(&NormalizedText::from_text(&turn.text)),
            None => 0.0,
        }
    }

    /// Map turn number to its signals, for turns with at least one signal
    ///
    /// Turn numbers repeat across conversations, so pass one conversation.
    pub fn signals_by_turn<'a, 't>(
        &'a self,
        turns: impl IntoIterator<Item = &'t Turn>,
    ) -> BTreeMap<u32, Vec<&'a str>> {
        turns
            .into_iter()
            .filter_map(|turn| {
                let signals = self.extract_signals(turn);
                (!signals.is_empty()).then_some((turn.turn_number, signals))
            })
            .collect()
    }
}

/// Most frequent signal; ties go to the one seen first
pub fn dominant_signal<'a, I>(signals: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for signal in signals {
        match counts.iter_mut().find(|(name, _)| *name == signal) {
            Some((_, count)) => *count += 1,
            None => counts.push((signal, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (name, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name)
}

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{
    AGENT_DELAY, AGENT_DENIAL, CUSTOMER_FRUSTRATION, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_HIGH_RISK_THRESHOLD, DEFAULT_RISK_WINDOW_SIZE, DEFAULT_SIGNAL_WEIGHT,
    DEFAULT_TOP_WARNINGS, DEFAULT_WARNING_THRESHOLD, MAX_EVIDENCE_ITEMS, MAX_WARNING_THRESHOLD,
    MIN_WARNING_THRESHOLD,
};
use crate::errors::ConfigurationError;

// ============================================================================
// Signal rules
// ============================================================================

/// Speaker a signal rule applies to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    Customer,
    Agent,
}

impl SpeakerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerRole::Customer => "customer",
            SpeakerRole::Agent => "agent",
        }
    }

    /// Case-insensitive comparison against a raw speaker label from a transcript.
    ///
    /// Only ASCII is folded; both role labels are ASCII, so a non-ASCII
    /// speaker can never match either role.
    pub fn matches(&self, speaker: &str) -> bool {
        speaker.eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative definition of one signal.
///
/// A rule fires when the speaker matches `role`, ANY keyword is a substring of
/// the lowercased text, ALL `must_contain` substrings are present and the
/// whitespace token count is at least `min_word_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalRuleConfig {
    pub name: String,
    pub role: SpeakerRole,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_contain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_word_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalsConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<SignalRuleConfig>,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

pub fn default_rules() -> Vec<SignalRuleConfig> {
    vec![
        SignalRuleConfig {
            name: CUSTOMER_FRUSTRATION.to_string(),
            role: SpeakerRole::Customer,
            keywords: keywords(&[
                "frustrated",
                "angry",
                "wasted",
                "again",
                "multiple",
                "complaint",
                "supervisor",
                "not getting help",
                "fed up",
                "tired",
                "disappointed",
                "upset",
                "unacceptable",
                "ridiculous",
                "absurd",
                "annoyed",
            ]),
            must_contain: Vec::new(),
            min_word_count: Some(1),
        },
        SignalRuleConfig {
            name: AGENT_DELAY.to_string(),
            role: SpeakerRole::Agent,
            keywords: keywords(&[
                "let me check",
                "please hold",
                "one moment",
                "checking",
                "looking into",
                "bear with me",
                "give me a second",
                "wait",
                "processing",
                "just a moment",
            ]),
            must_contain: Vec::new(),
            min_word_count: Some(1),
        },
        SignalRuleConfig {
            name: AGENT_DENIAL.to_string(),
            role: SpeakerRole::Agent,
            keywords: keywords(&[
                "cannot",
                "not possible",
                "unable",
                "policy",
                "not allowed",
                "sorry",
                "can't",
                "won't",
                "don't allow",
            ]),
            must_contain: keywords(&["sorry"]),
            min_word_count: Some(6),
        },
    ]
}

// ============================================================================
// Early warning
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarlyWarningConfig {
    /// Occurrences of `signal_type` in one conversation before a warning fires
    #[serde(default = "default_warning_threshold")]
    pub threshold: u32,
    #[serde(default = "default_signal_type")]
    pub signal_type: String,
}

fn default_warning_threshold() -> u32 {
    DEFAULT_WARNING_THRESHOLD
}

fn default_signal_type() -> String {
    CUSTOMER_FRUSTRATION.to_string()
}

impl Default for EarlyWarningConfig {
    fn default() -> Self {
        Self {
            threshold: default_warning_threshold(),
            signal_type: default_signal_type(),
        }
    }
}

impl EarlyWarningConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(MIN_WARNING_THRESHOLD..=MAX_WARNING_THRESHOLD).contains(&self.threshold) {
            return Err(ConfigurationError::ThresholdOutOfRange {
                value: self.threshold,
                min: MIN_WARNING_THRESHOLD,
                max: MAX_WARNING_THRESHOLD,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiSignalConfig {
    #[serde(default = "default_weights")]
    pub weights: HashMap<String, f64>,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Weight for signals missing from `weights`
    #[serde(default = "default_signal_weight")]
    pub default_weight: f64,
}

pub fn default_weights() -> HashMap<String, f64> {
    HashMap::from([
        (CUSTOMER_FRUSTRATION.to_string(), 0.5),
        (AGENT_DELAY.to_string(), 0.3),
        (AGENT_DENIAL.to_string(), 0.2),
    ])
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_signal_weight() -> f64 {
    DEFAULT_SIGNAL_WEIGHT
}

impl Default for MultiSignalConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            confidence_threshold: default_confidence_threshold(),
            default_weight: default_signal_weight(),
        }
    }
}

impl MultiSignalConfig {
    pub fn weight_for(&self, signal: &str) -> f64 {
        self.weights
            .get(signal)
            .copied()
            .unwrap_or(self.default_weight)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.confidence_threshold.is_finite() || self.confidence_threshold <= 0.0 {
            return Err(ConfigurationError::InvalidConfidenceThreshold(
                self.confidence_threshold,
            ));
        }

        let default = ("<default>", &self.default_weight);
        for (signal, weight) in self
            .weights
            .iter()
            .map(|(s, w)| (s.as_str(), w))
            .chain(std::iter::once(default))
        {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigurationError::InvalidWeight {
                    signal: signal.to_string(),
                    weight: *weight,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Risk, escalation labeling and reporting
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// A conversation is high risk when any window scores above this
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: f64,
}

fn default_window_size() -> usize {
    DEFAULT_RISK_WINDOW_SIZE
}

fn default_high_risk_threshold() -> f64 {
    DEFAULT_HIGH_RISK_THRESHOLD
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            high_risk_threshold: default_high_risk_threshold(),
        }
    }
}

/// Keywords that mark a transcript as escalated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EscalationConfig {
    #[serde(default = "default_intent_keywords")]
    pub intent_keywords: Vec<String>,
    #[serde(default = "default_reason_keywords")]
    pub reason_keywords: Vec<String>,
}

fn default_intent_keywords() -> Vec<String> {
    keywords(&["escalation", "complaint"])
}

fn default_reason_keywords() -> Vec<String> {
    keywords(&["supervisor", "complaint"])
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            intent_keywords: default_intent_keywords(),
            reason_keywords: default_reason_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Evidence samples printed per cause in the text report
    #[serde(default = "default_evidence_samples")]
    pub evidence_samples: usize,
    #[serde(default = "default_top_warnings")]
    pub top_warnings: usize,
}

fn default_evidence_samples() -> usize {
    MAX_EVIDENCE_ITEMS
}

fn default_top_warnings() -> usize {
    DEFAULT_TOP_WARNINGS
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            evidence_samples: default_evidence_samples(),
            top_warnings: default_top_warnings(),
        }
    }
}

// ============================================================================
// Presets
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPreset {
    /// High recall: warn on the first frustration signal
    Strict,
    Balanced,
    /// Only conversations with repeated frustration
    Relaxed,
}

impl AnalysisPreset {
    pub fn warning_threshold(&self) -> u32 {
        match self {
            AnalysisPreset::Strict => 1,
            AnalysisPreset::Balanced => 2,
            AnalysisPreset::Relaxed => 3,
        }
    }

    pub fn evidence_samples(&self) -> usize {
        match self {
            AnalysisPreset::Strict => 3,
            AnalysisPreset::Balanced | AnalysisPreset::Relaxed => MAX_EVIDENCE_ITEMS,
        }
    }

    pub fn focus(&self) -> &'static str {
        match self {
            AnalysisPreset::Strict => "High precision, catch all escalations",
            AnalysisPreset::Balanced => "Balanced precision and recall",
            AnalysisPreset::Relaxed => "Only critical escalations",
        }
    }
}

impl FromStr for AnalysisPreset {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(AnalysisPreset::Strict),
            "balanced" => Ok(AnalysisPreset::Balanced),
            "relaxed" => Ok(AnalysisPreset::Relaxed),
            other => Err(ConfigurationError::UnknownPreset(other.to_string())),
        }
    }
}

// ============================================================================
// Top-level configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub early_warning: EarlyWarningConfig,
    #[serde(default)]
    pub multi_signal: MultiSignalConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub report: ReportConfig,
    /// Applied on top of the sections above when the file is loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<AnalysisPreset>,
}

impl Configuration {
    /// Parse a YAML document. An empty document yields the built-in defaults.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigurationError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: Configuration = serde_yaml::from_str(contents)?;
        if let Some(preset) = config.preset {
            config.apply_preset(preset);
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn apply_preset(&mut self, preset: AnalysisPreset) {
        self.early_warning.threshold = preset.warning_threshold();
        self.report.evidence_samples = preset.evidence_samples();
        self.preset = Some(preset);
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.early_warning.validate()?;
        self.multi_signal.validate()?;

        if self.risk.window_size == 0 {
            return Err(ConfigurationError::InvalidWindowSize);
        }

        let mut seen = std::collections::HashSet::new();
        for (index, rule) in self.signals.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(ConfigurationError::UnnamedRule { index });
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigurationError::DuplicateRule(rule.name.clone()));
            }
            if rule.keywords.is_empty() {
                return Err(ConfigurationError::EmptyRule(rule.name.clone()));
            }
        }

        Ok(())
    }

    /// Names of all configured signals, in rule order
    pub fn signal_names(&self) -> Vec<&str> {
        self.signals.rules.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Adjustments layered over a loaded configuration, typically from the
/// command line. The preset is applied first so explicit values win over it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfigOverrides {
    pub preset: Option<AnalysisPreset>,
    pub threshold: Option<u32>,
    pub confidence: Option<f64>,
    pub window: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Configuration) {
        if let Some(preset) = self.preset {
            config.apply_preset(preset);
        }
        if let Some(threshold) = self.threshold {
            config.early_warning.threshold = threshold;
        }
        if let Some(confidence) = self.confidence {
            config.multi_signal.confidence_threshold = confidence;
        }
        if let Some(window) = self.window {
            config.risk.window_size = window;
        }
    }
}

use std::time::Instant;

use common::configuration::Configuration;
use common::errors::ConfigurationError;
use serde::Serialize;
use tracing::{info, warn};

use crate::causes::{analyze_causes, CauseAnalysis};
use crate::early_warning::{detect_early_warnings, detect_multi_signal_warnings, WarningRecord};
use crate::risk::{analyze_escalation_risk, high_risk_conversations, RiskScores};
use crate::signals::SignalEngine;
use crate::transcripts::Turn;

/// Everything produced by one pass of [`CausalAnalyzer::analyze`]
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    pub causes: CauseAnalysis,
    pub early_warnings: Vec<WarningRecord>,
    pub multi_signal_warnings: Vec<WarningRecord>,
    pub risk: RiskScores,
}

impl AnalysisResults {
    /// Single-signal warnings followed by multi-signal warnings
    pub fn warnings(&self) -> impl Iterator<Item = &WarningRecord> {
        self.early_warnings
            .iter()
            .chain(self.multi_signal_warnings.iter())
    }

    pub fn warning_count(&self) -> usize {
        self.early_warnings.len() + self.multi_signal_warnings.len()
    }

    pub fn high_risk_conversations(&self, threshold: f64) -> usize {
        high_risk_conversations(&self.risk, threshold)
    }
}

/// Runs cause aggregation, both warning detectors and risk scoring over a
/// turn stream with one validated configuration.
#[derive(Debug, Clone)]
pub struct CausalAnalyzer {
    config: Configuration,
    engine: SignalEngine,
}

impl Default for CausalAnalyzer {
    fn default() -> Self {
        Self {
            config: Configuration::default(),
            engine: SignalEngine::default(),
        }
    }
}

impl CausalAnalyzer {
    pub fn new(config: Configuration) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let engine = SignalEngine::new(&config.signals);
        if !engine.has_signal(&config.early_warning.signal_type) {
            warn!(
                signal = %config.early_warning.signal_type,
                "early warning signal is not produced by any rule, single signal warnings will never fire"
            );
        }

        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    pub fn analyze(&self, turns: &[Turn]) -> AnalysisResults {
        let start = Instant::now();

        let causes = analyze_causes(&self.engine, turns);
        let early_warnings = detect_early_warnings(
            &self.engine,
            turns,
            self.config.early_warning.threshold,
            &self.config.early_warning.signal_type,
        );
        let multi_signal_warnings =
            detect_multi_signal_warnings(&self.engine, turns, &self.config.multi_signal);
        let risk = analyze_escalation_risk(&self.engine, turns, self.config.risk.window_size);

        let results = AnalysisResults {
            causes,
            early_warnings,
            multi_signal_warnings,
            risk,
        };

        info!(
            turns = turns.len(),
            causes = results.causes.statistics.len(),
            total_signals = results.causes.total_signals(),
            early_warnings = results.early_warnings.len(),
            multi_signal_warnings = results.multi_signal_warnings.len(),
            risky_conversations = results.risk.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis complete"
        );
        results
    }
}

//! Report exports and console digests of analysis results

mod csv;
mod digest;
mod text;

pub use self::csv::{evidence_csv, export_evidence_csv, export_warnings_csv, warnings_csv};
pub use self::digest::{warning_digests, WarningDigest};
pub use self::text::{export_text_report, render_text_report};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use common::configuration::Configuration;
use serde::Serialize;
use tracing::info;

use crate::analyzer::AnalysisResults;
use crate::causes::CauseStatistics;
use crate::errors::AnalysisError;
use crate::transcripts::DatasetStatistics;

#[derive(Debug, Serialize)]
pub struct ResultsDocument<'a> {
    pub timestamp: String,
    pub analysis: CauseSection<'a>,
    pub warnings: WarningSection,
    pub risk: RiskSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<&'a DatasetStatistics>,
}

#[derive(Debug, Serialize)]
pub struct CauseSection<'a> {
    pub cause_statistics: &'a CauseStatistics,
    pub total_signals: usize,
    pub unique_causes: usize,
    pub evidence_summary: BTreeMap<&'a str, usize>,
}

#[derive(Debug, Serialize)]
pub struct WarningSection {
    pub early_warnings: usize,
    pub single_signal_warnings: usize,
    pub multi_signal_warnings: usize,
    pub top_warnings: Vec<WarningSummary>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WarningSummary {
    pub transcript_id: String,
    pub turn_number: u32,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct RiskSection {
    pub scored_conversations: usize,
    pub high_risk_conversations: usize,
    pub high_risk_threshold: f64,
}

impl<'a> ResultsDocument<'a> {
    pub fn new(
        results: &'a AnalysisResults,
        dataset: Option<&'a DatasetStatistics>,
        config: &Configuration,
    ) -> Self {
        let causes = &results.causes;
        let high_risk_threshold = config.risk.high_risk_threshold;

        Self {
            timestamp: Utc::now().to_rfc3339(),
            analysis: CauseSection {
                cause_statistics: &causes.statistics,
                total_signals: causes.total_signals(),
                unique_causes: causes.statistics.len(),
                evidence_summary: causes
                    .evidence
                    .iter()
                    .map(|(cause, items)| (cause.as_str(), items.len()))
                    .collect(),
            },
            warnings: WarningSection {
                early_warnings: results.warning_count(),
                single_signal_warnings: results.early_warnings.len(),
                multi_signal_warnings: results.multi_signal_warnings.len(),
                top_warnings: results
                    .warnings()
                    .take(config.report.top_warnings)
                    .map(|w| WarningSummary {
                        transcript_id: w.transcript_id.clone(),
                        turn_number: w.turn_number,
                        confidence: w.confidence,
                    })
                    .collect(),
            },
            risk: RiskSection {
                scored_conversations: results.risk.len(),
                high_risk_conversations: results.high_risk_conversations(high_risk_threshold),
                high_risk_threshold,
            },
            dataset,
        }
    }
}

pub(crate) fn write_report(path: &Path, contents: &str) -> Result<(), AnalysisError> {
    let write_error = |source| AnalysisError::WriteReport {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)?;

    info!(path = %path.display(), bytes = contents.len(), "wrote report");
    Ok(())
}

pub fn export_results_json(
    results: &AnalysisResults,
    dataset: Option<&DatasetStatistics>,
    config: &Configuration,
    path: impl AsRef<Path>,
) -> Result<(), AnalysisError> {
    let document = ResultsDocument::new(results, dataset, config);
    let json = serde_json::to_string_pretty(&document)?;
    write_report(path.as_ref(), &json)
}

/// Truncate to at most `max` characters without splitting a code point
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analyzer::CausalAnalyzer;
    use crate::test_support::turn;
    use crate::transcripts::{Outcome, Turn};
    use common::consts::CUSTOMER_FRUSTRATION;

    pub(crate) fn sample_turns() -> Vec<Turn> {
        vec![
            turn("E1", 1, "customer", "I am frustrated, this is the second call", Outcome::Escalated),
            turn("E1", 2, "agent", "Please hold while I look", Outcome::Escalated),
            turn("E1", 3, "customer", "Unacceptable, I want a supervisor", Outcome::Escalated),
            turn("E2", 1, "customer", "I am upset, \"again\"", Outcome::Escalated),
            turn("E2", 2, "agent", "Sorry, that is not allowed by policy", Outcome::Escalated),
            turn("R1", 1, "customer", "Hi, quick question", Outcome::Resolved),
        ]
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 2), "");
    }

    #[test]
    fn test_results_document() {
        let results = CausalAnalyzer::default().analyze(&sample_turns());
        let config = Configuration::default();

        let document = ResultsDocument::new(&results, None, &config);
        assert_eq!(document.analysis.cause_statistics[CUSTOMER_FRUSTRATION], 3);
        assert_eq!(document.analysis.total_signals, 5);
        assert_eq!(document.analysis.unique_causes, 3);
        assert_eq!(document.analysis.evidence_summary[CUSTOMER_FRUSTRATION], 3);
        assert_eq!(
            document.warnings.early_warnings,
            results.warning_count()
        );
        assert!(document.warnings.top_warnings.len() <= config.report.top_warnings);
    }

    #[test]
    fn test_export_results_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");

        let results = CausalAnalyzer::default().analyze(&sample_turns());
        export_results_json(&results, None, &Configuration::default(), &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["analysis"]["total_signals"], 5);
        assert!(written["timestamp"].is_string());
        assert!(written.get("dataset").is_none());
    }

    #[test]
    fn test_export_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let results = CausalAnalyzer::default().analyze(&[]);
        export_results_json(&results, None, &Configuration::default(), &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["analysis"]["unique_causes"], 0);
        assert_eq!(written["warnings"]["top_warnings"], serde_json::json!([]));
    }
}

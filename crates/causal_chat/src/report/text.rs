use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use chrono::Utc;
use common::consts::MAX_EVIDENCE_ITEMS;

use super::{truncate_chars, write_report};
use crate::analyzer::AnalysisResults;
use crate::errors::AnalysisError;
use crate::transcripts::DatasetStatistics;

const RULE_WIDTH: usize = 80;
const EVIDENCE_TEXT_LIMIT: usize = 80;

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", "-".repeat(RULE_WIDTH));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
}

/// "agent_delay" -> "AGENT DELAY"
fn display_upper(cause: &str) -> String {
    cause.replace('_', " ").to_uppercase()
}

/// "agent_delay" -> "Agent Delay"
fn display_title(cause: &str) -> String {
    cause
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human readable report: summary, ranked causes with evidence samples and
/// recommendations. At most `evidence_samples` (capped at the evidence bound)
/// samples are shown per cause.
pub fn render_text_report(
    results: &AnalysisResults,
    dataset: Option<&DatasetStatistics>,
    evidence_samples: usize,
) -> String {
    let evidence_samples = evidence_samples.min(MAX_EVIDENCE_ITEMS);
    let causes = &results.causes;
    let total_signals = causes.total_signals();
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "CAUSAL CHAT ANALYSIS - COMPREHENSIVE REPORT");
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(
        out,
        "\nGenerated: {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    heading(&mut out, "EXECUTIVE SUMMARY");
    let _ = writeln!(out, "Total Signals Detected: {total_signals}");
    let _ = writeln!(out, "Unique Causes: {}", causes.statistics.len());
    let _ = writeln!(out, "Early Warnings Generated: {}", results.warning_count());
    if let Some(stats) = dataset {
        let _ = writeln!(out, "Transcripts Analyzed: {}", stats.total_transcripts);
        let _ = writeln!(out, "Escalation Rate: {:.2}%", stats.escalation_rate);
    }

    let ranked = causes.ranked();
    if !ranked.is_empty() {
        heading(&mut out, "ROOT CAUSE ANALYSIS");
        for cause in &ranked {
            let _ = writeln!(out, "\n{}", display_upper(cause.cause));
            let _ = writeln!(out, "  Frequency: {} ({:.1}%)", cause.count, cause.share);

            let samples = causes
                .evidence
                .get(cause.cause)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if evidence_samples > 0 && !samples.is_empty() {
                let shown = samples.len().min(evidence_samples);
                let _ = writeln!(
                    out,
                    "  Sample Evidence (showing {shown} of {}):",
                    samples.len()
                );
                for (i, item) in samples.iter().take(shown).enumerate() {
                    let _ = writeln!(
                        out,
                        "    {}. [{} turn {}] \"{}...\"",
                        i + 1,
                        item.transcript_id,
                        item.turn_number,
                        truncate_chars(&item.text, EVIDENCE_TEXT_LIMIT)
                    );
                }
            }
        }
    }

    heading(&mut out, "RECOMMENDATIONS");
    let mut recommendation = 1;
    if let Some(top) = ranked.first() {
        let _ = writeln!(out, "\n{recommendation}. PRIMARY FOCUS");
        let _ = writeln!(
            out,
            "   Address '{}' as priority",
            display_title(top.cause)
        );
        let _ = writeln!(
            out,
            "   This accounts for {:.1}% of escalation signals",
            top.share
        );
        recommendation += 1;
    }
    if results.warning_count() > 0 {
        let _ = writeln!(out, "\n{recommendation}. EARLY INTERVENTION PROGRAM");
        let conversations: HashSet<&str> = results
            .warnings()
            .map(|w| w.transcript_id.as_str())
            .collect();
        let _ = writeln!(
            out,
            "   {} conversations show escalation warning signs",
            conversations.len()
        );
        let _ = writeln!(out, "   Implement real-time monitoring for early detection");
    }
    if ranked.is_empty() && results.warning_count() == 0 {
        let _ = writeln!(out, "\nNo escalation signals detected.");
    }

    let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
    out
}

pub fn export_text_report(
    results: &AnalysisResults,
    dataset: Option<&DatasetStatistics>,
    evidence_samples: usize,
    path: impl AsRef<Path>,
) -> Result<(), AnalysisError> {
    let report = render_text_report(results, dataset, evidence_samples);
    write_report(path.as_ref(), &report)
}

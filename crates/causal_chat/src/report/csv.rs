use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;

use super::{truncate_chars, write_report};
use crate::causes::Evidence;
use crate::early_warning::WarningRecord;
use crate::errors::AnalysisError;

const CSV_TEXT_LIMIT: usize = 100;

/// Quote a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn evidence_csv(evidence: &Evidence) -> String {
    let mut out = String::from("cause,transcript_id,turn_number,text\n");
    for (cause, items) in evidence {
        for item in items {
            let _ = writeln!(
                out,
                "{},{},{},{}",
                escape_field(cause),
                escape_field(&item.transcript_id),
                item.turn_number,
                escape_field(truncate_chars(&item.text, CSV_TEXT_LIMIT)),
            );
        }
    }
    out
}

pub fn warnings_csv<'a>(warnings: impl IntoIterator<Item = &'a WarningRecord>) -> String {
    let mut out = String::from("transcript_id,turn_number,confidence,text\n");
    for warning in warnings {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            escape_field(&warning.transcript_id),
            warning.turn_number,
            warning.confidence,
            escape_field(truncate_chars(&warning.text, CSV_TEXT_LIMIT)),
        );
    }
    out
}

pub fn export_evidence_csv(
    evidence: &Evidence,
    path: impl AsRef<Path>,
) -> Result<(), AnalysisError> {
    write_report(path.as_ref(), &evidence_csv(evidence))
}

pub fn export_warnings_csv<'a>(
    warnings: impl IntoIterator<Item = &'a WarningRecord>,
    path: impl AsRef<Path>,
) -> Result<(), AnalysisError> {
    write_report(path.as_ref(), &warnings_csv(warnings))
}

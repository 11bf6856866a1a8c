use common::errors::ConfigurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("failed to read transcripts from `{path}`: {source}")]
    ReadDataset {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse transcripts from `{path}`: {source}")]
    ParseDataset {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("transcript '{transcript_id}' turn {turn_number} is missing required field `{field}`")]
    MalformedTurn {
        transcript_id: String,
        turn_number: u32,
        field: &'static str,
    },

    #[error("failed to write report `{path}`: {source}")]
    WriteReport {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

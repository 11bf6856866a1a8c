use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to read configuration file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("early warning threshold {value} is outside the allowed range {min}..={max}")]
    ThresholdOutOfRange { value: u32, min: u32, max: u32 },
    #[error("confidence threshold must be a positive finite number, got {0}")]
    InvalidConfidenceThreshold(f64),
    #[error("weight for signal '{signal}' must be a non-negative finite number, got {weight}")]
    InvalidWeight { signal: String, weight: f64 },
    #[error("risk window size must be at least 1")]
    InvalidWindowSize,
    #[error("signal rule {index} has an empty name")]
    UnnamedRule { index: usize },
    #[error("signal rule '{0}' is defined more than once")]
    DuplicateRule(String),
    #[error("signal rule '{0}' has no keywords")]
    EmptyRule(String),
    #[error("unknown analysis preset '{0}' (expected strict, balanced or relaxed)")]
    UnknownPreset(String),
}

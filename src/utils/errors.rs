use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SysIdError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("Undefined correlation for channel '{0}'")]
    UndefinedCorrelation(String),

    #[error("Insufficient samples: {samples} samples for {channels} channels")]
    InsufficientSamples { samples: usize, channels: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid term expression '{term}': {reason}")]
    InvalidTerm { term: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SysIdError {
    /// Errors that indicate a logic error rather than bad data. These abort the
    /// whole run instead of only the current flight condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SysIdError::ShapeMismatch(_))
    }
}

pub type Result<T> = std::result::Result<T, SysIdError>;

use thiserror::Error;

/// A timeline or descriptor that cannot be run. Raised before any unit is shown.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("block '{0}' has no members")]
    EmptyBlock(String),

    #[error("block '{0}' must repeat at least once")]
    ZeroRepetitions(String),

    #[error("trial '{trial}' is malformed: {reason}")]
    MalformedDescriptor { trial: String, reason: String },

    #[error("timeline is empty")]
    EmptyTimeline,
}

impl ConstructionError {
    pub fn malformed(trial: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            trial: trial.into(),
            reason: reason.into(),
        }
    }
}

/// A persistence call was rejected by the backend.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("backend rejected the save: {0}")]
    Rejected(String),

    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("could not encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

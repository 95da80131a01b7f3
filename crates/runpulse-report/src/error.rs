use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Invalid outcome: {0}")]
    InvalidOutcome(String),

    #[error("Result collector is closed; the run has already been finalized")]
    CollectorClosed,

    #[error("Result collector state is unavailable: {0}")]
    CollectorPoisoned(String),

    #[error("Failed to render {artifact}: {message}")]
    Render { artifact: String, message: String },

    #[error("Escalation failed for '{test}': {message}")]
    Escalation { test: String, message: String },

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TestError {
    pub fn render(artifact: impl Into<String>, message: impl ToString) -> Self {
        Self::Render {
            artifact: artifact.into(),
            message: message.to_string(),
        }
    }

    pub fn escalation(test: impl Into<String>, message: impl ToString) -> Self {
        Self::Escalation {
            test: test.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is a caller contract violation during collection,
    /// as opposed to an external dependency failing.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidOutcome(_) | Self::CollectorClosed)
    }
}

pub type Result<T> = std::result::Result<T, TestError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkbenchError {
    /// The request never produced a response. `connectivity` is set when
    /// the service could not be reached at all.
    #[error("Transport error: {message}")]
    Transport { message: String, connectivity: bool },

    #[error("{detail} (Status: {status})")]
    Status { status: u16, detail: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid configuration value for {key}: {details}")]
    Config { key: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WorkbenchError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        WorkbenchError::Transport {
            message: message.into(),
            connectivity: true,
        }
    }

    /// True when the service could not be reached at all, as opposed to
    /// answering with an error status or an unusable body.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            WorkbenchError::Transport {
                connectivity: true,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, WorkbenchError>;

/// Why a regeneration did not commit a fresh statement triple.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("No transactions match the selected filters. Please adjust your filters.")]
    NoMatchingTransactions,

    #[error("{0}")]
    Failed(String),

    /// Filter changed before any ledger was loaded; nothing to regenerate.
    #[error("No transactions loaded")]
    NoLedger,

    #[error("Regeneration #{issued} was superseded by #{latest}")]
    Superseded { issued: u64, latest: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_carries_detail_and_code() {
        let err = WorkbenchError::Status {
            status: 500,
            detail: "engine exploded".to_string(),
        };
        assert_eq!(err.to_string(), "engine exploded (Status: 500)");
        assert!(!err.is_connectivity());
        assert!(WorkbenchError::unreachable("refused").is_connectivity());
    }

    #[test]
    fn test_empty_result_is_distinct_from_failure() {
        let empty = OrchestrationError::NoMatchingTransactions;
        let failed = OrchestrationError::Failed("HTTP 502".to_string());
        assert_ne!(empty, failed);
        assert!(empty.to_string().starts_with("No transactions match"));
    }
}

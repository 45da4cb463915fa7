// Error Types
// Failure taxonomy shared by the detection core and the service boundary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Artifact I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Artifact encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Artifact format v{found} is not supported (expected v{expected})")]
    Incompatible { found: u32, expected: u32 },
    #[error("Artifact is inconsistent: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum DetectionError {
    /// Malformed caller input. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Statistical prediction requested before any artifact exists.
    #[error("Model not trained yet")]
    UntrainedModel,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Detection failed: {0}")]
    DetectionFailed(#[source] anyhow::Error),
}

impl DetectionError {
    pub fn validation(message: impl Into<String>) -> Self {
        DetectionError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DetectionError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, DetectionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_storage_error_keeps_io_source() {
        let err = DetectionError::from(StorageError::Io {
            key: "context_model".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert!(err.to_string().contains("context_model"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_detection_failed_carries_cause() {
        let err = DetectionError::DetectionFailed(anyhow::anyhow!("worker panicked"));
        assert_eq!(err.to_string(), "Detection failed: worker panicked");
        assert!(!err.is_validation());
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidInput,
    MalformedResult,
    Remote,
    Timeout,
    Superseded,
    Unsupported,
    Io,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct CrosswalkError {
    pub code: ErrorCode,
    pub message: String,
}

impl CrosswalkError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn malformed_result(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedResult, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Remote, message)
    }

    /// Remote failures and timeouts can be retried with the in-process aligner.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::Remote | ErrorCode::Timeout | ErrorCode::MalformedResult
        )
    }
}

impl From<std::io::Error> for CrosswalkError {
    fn from(err: std::io::Error) -> Self {
        CrosswalkError::new(ErrorCode::Io, err.to_string())
    }
}

impl From<serde_json::Error> for CrosswalkError {
    fn from(err: serde_json::Error) -> Self {
        CrosswalkError::new(ErrorCode::InvalidInput, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code_and_message() {
        let err = CrosswalkError::remote("job failed with status FAILURE");
        assert_eq!(err.to_string(), "Remote: job failed with status FAILURE");
        assert!(err.is_recoverable());
        assert!(!CrosswalkError::invalid_input("bad").is_recoverable());
    }
}

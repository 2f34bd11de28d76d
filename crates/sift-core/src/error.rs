//! Error types for sift operations.
//!
//! Structured error hierarchy with error codes for programmatic handling.
//! Nothing in the pipeline core treats these as fatal: the processor
//! degrades a failed item to zero entities and keeps going.

use thiserror::Error;

/// Result type alias for sift operations.
pub type SiftResult<T> = Result<T, SiftError>;

/// Main error type for all sift operations.
#[derive(Error, Debug)]
pub enum SiftError {
    /// LLM classification call failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Persistence operation failed.
    #[error("Store error: {message}")]
    Store {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Classifier response could not be parsed.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Store (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl SiftError {
    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code if this error carries one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            SiftError::Llm { code, .. }
            | SiftError::Store { code, .. }
            | SiftError::Parse { code, .. } => Some(*code),
            SiftError::Internal(_) => Some(ErrorCode::Internal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ErrorCode::LlmGenerationFailed.as_str(), "LLM_002");
        assert_eq!(ErrorCode::DbOperationFailed.as_str(), "DB_002");
        assert_eq!(ErrorCode::ParseInvalidJson.as_str(), "PARSE_001");
    }

    #[test]
    fn test_helper_constructors() {
        let err = SiftError::store("insert failed");
        assert_eq!(err.code(), Some(ErrorCode::DbOperationFailed));
        assert!(err.to_string().contains("insert failed"));

        let err = SiftError::parse("bad json");
        assert_eq!(err.code(), Some(ErrorCode::ParseInvalidJson));
    }
}

//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so production logs can be
//! grepped by category.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - PROVIDER_xxx: guard provider errors
//! - BATCH_xxx: batch assessment errors
//! - CFG_xxx: configuration/credential errors
//! - INPUT_xxx: caller input errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Precondition failures never reached the network; remote failures did.
    /// Consumers surface the two differently.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConfigMissingApiKey
                | ErrorCode::ConfigMissingEnv
                | ErrorCode::ConfigInvalidValue
                | ErrorCode::InputMissingIdentifier
                | ErrorCode::InputInvalidAddress
                | ErrorCode::InputInvalidHash
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        // Source errors are not clonable; keep code and message
        Self::new(self.code, self.message.clone())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Guard Provider Errors
    // ============================================
    /// Provider connection failed
    ProviderConnectionFailed,
    /// Provider request timeout
    ProviderTimeout,
    /// Provider rate limited (HTTP 429)
    ProviderRateLimited,
    /// Provider returned an explicit failure envelope
    ProviderFailure,
    /// Provider response did not parse
    ProviderInvalidResponse,

    // ============================================
    // Batch Assessment Errors
    // ============================================
    /// Batch-level failure reported by the provider
    BatchFailed,
    /// A requested hash was absent from the batch response
    BatchHashNotFound,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Missing bearer token for the guard provider
    ConfigMissingApiKey,

    // ============================================
    // Input Errors
    // ============================================
    /// Required identifier (safe address, tx hash) missing
    InputMissingIdentifier,
    /// Malformed address
    InputInvalidAddress,
    /// Malformed safe-tx hash
    InputInvalidHash,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderConnectionFailed => "PROVIDER_CONNECTION_FAILED",
            Self::ProviderTimeout => "PROVIDER_TIMEOUT",
            Self::ProviderRateLimited => "PROVIDER_RATE_LIMITED",
            Self::ProviderFailure => "PROVIDER_FAILURE",
            Self::ProviderInvalidResponse => "PROVIDER_INVALID_RESPONSE",

            Self::BatchFailed => "BATCH_FAILED",
            Self::BatchHashNotFound => "BATCH_HASH_NOT_FOUND",

            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigMissingApiKey => "CFG_MISSING_API_KEY",

            Self::InputMissingIdentifier => "INPUT_MISSING_IDENTIFIER",
            Self::InputInvalidAddress => "INPUT_INVALID_ADDRESS",
            Self::InputInvalidHash => "INPUT_INVALID_HASH",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderTimeout | Self::ProviderRateLimited | Self::ProviderConnectionFailed
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Provider connection failed
    pub fn provider_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderConnectionFailed, msg)
    }

    /// Provider timeout
    pub fn provider_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderTimeout, msg)
    }

    /// Provider rate limited
    pub fn provider_rate_limited() -> Self {
        Self::new(ErrorCode::ProviderRateLimited, "Rate limited (HTTP 429)")
    }

    /// Provider returned an explicit failure envelope
    pub fn provider_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderFailure, msg)
    }

    /// Provider response did not parse
    pub fn provider_invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderInvalidResponse, msg)
    }

    /// Batch-level failure
    pub fn batch_failed(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::BatchFailed,
            format!("{}: {}", reason.into(), message.into()),
        )
    }

    /// Hash missing from batch response
    pub fn hash_not_found(hash: &str) -> Self {
        Self::new(
            ErrorCode::BatchHashNotFound,
            format!("No assessment found for {}", hash),
        )
    }

    /// Missing bearer token
    pub fn missing_api_key() -> Self {
        Self::new(
            ErrorCode::ConfigMissingApiKey,
            "Missing guard provider API key",
        )
    }

    /// Missing required identifier
    pub fn missing_identifier(what: &str) -> Self {
        Self::new(
            ErrorCode::InputMissingIdentifier,
            format!("Missing required identifier: {}", what),
        )
    }

    /// Malformed safe-tx hash
    pub fn invalid_hash(hash: &str) -> Self {
        Self::new(
            ErrorCode::InputInvalidHash,
            format!("Not a 0x-prefixed 32-byte hex string: {}", hash),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ProviderTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::ProviderConnectionFailed, "Connection failed")
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ProviderInvalidResponse, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::provider_timeout("Connection timed out");
        assert_eq!(err.code, ErrorCode::ProviderTimeout);
        assert_eq!(err.code_str(), "PROVIDER_TIMEOUT");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::ProviderTimeout.is_retryable());
        assert!(ErrorCode::ProviderRateLimited.is_retryable());
        assert!(!ErrorCode::BatchHashNotFound.is_retryable());
    }

    #[test]
    fn test_precondition_vs_remote() {
        assert!(AppError::missing_api_key().is_precondition());
        assert!(AppError::invalid_hash("0x123").is_precondition());
        assert!(!AppError::provider_failure("simulation error").is_precondition());
    }
}

//! Harness error types.

use thiserror::Error;

/// Result type for stub and fixture operations.
pub type StubResult<T> = Result<T, HarnessError>;

/// Errors raised by stubbers, service clients and fixtures.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A service call failed. Stubbed client errors surface through this variant.
    #[error("An error occurred ({code}) when calling the service: {message}")]
    Service { code: String, message: String },

    /// No stubber constructor is registered for the service.
    #[error("No stubber registered for service: {0}")]
    NoStubberForService(String),

    /// The registered stubber is not of the requested type.
    #[error("Stubber for service {service} is not a {expected}")]
    StubberTypeMismatch {
        service: String,
        expected: &'static str,
    },

    /// The service model has no such operation.
    #[error("Unknown operation for service {service}: {operation}")]
    UnknownOperation { service: String, operation: String },

    /// A call arrived while the stub queue was empty.
    #[error("Unexpected call to {operation}: no stubbed responses remain")]
    NoStubbedResponse { operation: String },

    /// A call arrived for a different operation than the next stubbed one.
    #[error("Operation mismatch: found {actual}, expected {expected}")]
    UnexpectedCall { expected: String, actual: String },

    /// A call carried different parameters than the stub expected.
    #[error("Expected parameters for {operation}:\n{expected}\nbut received:\n{actual}")]
    ParamMismatch {
        operation: String,
        expected: serde_json::Value,
        actual: serde_json::Value,
    },

    /// Stubbed responses were left unconsumed at teardown.
    #[error("Expected all stubbed responses to be consumed, {} remain: {}", .0.len(), .0.join(", "))]
    PendingResponses(Vec<String>),

    /// The harness configuration could not be parsed.
    #[error("Invalid harness configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Create a service error.
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The service error code, if this is a service error.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check whether this is a service error with the given code.
    pub fn is_service_error(&self, code: &str) -> bool {
        self.error_code() == Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = HarnessError::service("NoSuchBucket", "The bucket does not exist");
        assert_eq!(
            err.to_string(),
            "An error occurred (NoSuchBucket) when calling the service: The bucket does not exist"
        );
        assert_eq!(err.error_code(), Some("NoSuchBucket"));
        assert!(err.is_service_error("NoSuchBucket"));
        assert!(!err.is_service_error("TestException"));
    }

    #[test]
    fn test_non_service_error_has_no_code() {
        let err = HarnessError::NoStubberForService("kinesis".to_string());
        assert_eq!(err.error_code(), None);
        assert_eq!(err.to_string(), "No stubber registered for service: kinesis");
    }

    #[test]
    fn test_pending_responses_display() {
        let err = HarnessError::PendingResponses(vec![
            "CreateBucket".to_string(),
            "PutObject".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Expected all stubbed responses to be consumed, 2 remain: CreateBucket, PutObject"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: HarnessError = json_err.into();
        assert!(matches!(err, HarnessError::Json(_)));
    }
}

//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures raised by the newtype constructors.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid entry path format or content
    #[error("Invalid entry path: {0}")]
    InvalidPath(String),

    /// Invalid transport name
    #[error("Invalid transport name: {0}")]
    InvalidTransportName(String),

    /// Invalid remote reference
    #[error("Invalid remote ref: {0}")]
    InvalidRemoteRef(String),

    /// Invalid content digest
    #[error("Invalid content digest: {0}")]
    InvalidDigest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("a//b".to_string());
        assert_eq!(err.to_string(), "Invalid entry path: a//b");

        let err = DomainError::InvalidTransportName(String::new());
        assert_eq!(err.to_string(), "Invalid transport name: ");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidRemoteRef("x".to_string());
        let err2 = DomainError::InvalidRemoteRef("x".to_string());
        let err3 = DomainError::InvalidRemoteRef("y".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}

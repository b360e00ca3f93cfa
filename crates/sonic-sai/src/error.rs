//! Driver status codes and error handling.
//!
//! Driver calls report an integer status, and traversal visitors hand one
//! back to the driver to continue or stop a walk. [`SaiStatus`] models those
//! codes; [`SaiError`] is what the safe API surface returns.

use std::fmt;
use thiserror::Error;

/// Status codes returned by driver calls and traversal visitors.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaiStatus {
    Success = 0,
    Failure = -1,
}

impl SaiStatus {
    pub fn is_success(&self) -> bool {
        *self == SaiStatus::Success
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> SaiResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SaiError::Status { status: self })
        }
    }
}

impl fmt::Display for SaiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaiStatus::Success => "SAI_STATUS_SUCCESS",
            SaiStatus::Failure => "SAI_STATUS_FAILURE",
        };
        write!(f, "{}", s)
    }
}

/// Error type for driver operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaiError {
    /// The driver returned a non-success status.
    #[error("driver operation failed: {status}")]
    Status { status: SaiStatus },

    /// The requested object does not exist in hardware.
    #[error("item not found: {item}")]
    NotFound { item: String },

    /// Invalid parameter passed to the driver.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },
}

impl SaiError {
    pub fn not_found(item: impl Into<String>) -> Self {
        SaiError::NotFound { item: item.into() }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        SaiError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Returns true if the driver reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SaiError::NotFound { .. })
    }
}

/// Result type for driver operations.
pub type SaiResult<T> = Result<T, SaiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_into_result() {
        assert!(SaiStatus::Success.into_result().is_ok());
        assert_eq!(
            SaiStatus::Failure.into_result().unwrap_err(),
            SaiError::Status {
                status: SaiStatus::Failure
            }
        );
    }

    #[test]
    fn test_not_found_classification() {
        assert!(SaiError::not_found("egress 100002").is_not_found());
        assert!(!SaiError::invalid_parameter("vlan 1").is_not_found());
        assert!(!SaiStatus::Failure.into_result().unwrap_err().is_not_found());
    }

    #[test]
    fn test_display() {
        assert_eq!(SaiStatus::Failure.to_string(), "SAI_STATUS_FAILURE");
        assert_eq!(
            SaiError::not_found("egress 100002").to_string(),
            "item not found: egress 100002"
        );
    }
}

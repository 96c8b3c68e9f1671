//! Error types for Horizon Diagram core systems.

use std::fmt;

/// The main error type for core operations.
#[derive(Debug)]
pub enum CoreError {
    /// Signal-related error.
    Signal(SignalError),
    /// An object was used from a thread other than the one that owns it.
    WrongThread {
        /// Description of the rejected operation.
        operation: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(err) => write!(f, "Signal error: {err}"),
            Self::WrongThread { operation } => {
                write!(f, "{operation} must run on the thread that created the object")
            }
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Signal(err) => Some(err),
            Self::WrongThread { .. } => None,
        }
    }
}

impl From<SignalError> for CoreError {
    fn from(err: SignalError) -> Self {
        Self::Signal(err)
    }
}

/// Signal-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The connection ID is invalid or has already been disconnected.
    InvalidConnection,
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConnection => write!(f, "Invalid or disconnected connection ID"),
        }
    }
}

impl std::error::Error for SignalError {}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_signal_error_is_source() {
        let err = CoreError::from(SignalError::InvalidConnection);
        assert_eq!(err.to_string(), "Signal error: Invalid or disconnected connection ID");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_wrong_thread_display() {
        let err = CoreError::WrongThread {
            operation: "rows_inserted".into(),
        };
        assert!(err.to_string().starts_with("rows_inserted"));
        assert!(err.source().is_none());
    }
}

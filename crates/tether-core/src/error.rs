use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::handle::HandleId;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by bridge operations.
///
/// All of these are raised synchronously on the engine thread and are
/// deterministic for a given input; none are retried automatically.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A constructor dependency was absent, or an argument violated a
    /// documented constraint (empty module name, non-object JSON root).
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The bridge has been torn down; no further operations are accepted.
    #[error("bridge is not initialized")]
    NotInitialized,

    /// The handle was not produced by this bridge, or its root is gone.
    #[error("invalid handle: {0}")]
    InvalidHandle(HandleId),

    /// The call target does not refer to a callable object.
    #[error("handle {0} does not refer to a callable object")]
    NotCallable(HandleId),

    /// The engine reported a failure while evaluating or touching a value,
    /// including promise rejection.
    #[error("engine error: {0}")]
    Engine(String),

    /// JSON conversion across the boundary failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
}

impl BridgeError {
    /// Creates a precondition error with the given message.
    pub fn precondition<T: Into<String>>(message: T) -> Self {
        Self::Precondition(message.into())
    }

    /// Whether this error indicates a misuse the caller must fix, as opposed
    /// to a failure inside the engine.
    #[must_use]
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_) | Self::InvalidHandle(_) | Self::NotCallable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error1 = BridgeError::precondition("host transport is required");
        assert_eq!(
            error1.to_string(),
            "precondition violated: host transport is required"
        );

        let error2 = BridgeError::NotInitialized;
        assert_eq!(error2.to_string(), "bridge is not initialized");
    }

    #[test]
    fn test_caller_fault_classification() {
        assert!(BridgeError::precondition("missing mediator").is_caller_fault());
        assert!(BridgeError::NotCallable(HandleId::fresh()).is_caller_fault());
        assert!(!BridgeError::Engine("SyntaxError".to_owned()).is_caller_fault());
        assert!(!BridgeError::NotInitialized.is_caller_fault());
    }
}

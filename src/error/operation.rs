//! Errors raised at the operation execution boundary.

use thiserror::Error;

use crate::operations::CapabilityTag;

/// Errors surfaced while building or using an operation context.
///
/// Capability violations are programmer errors in the calling operation;
/// they are reported to the caller as internal errors without exposing
/// entity details to external clients.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Entity '{entity}' was not declared by the operation")]
    UndeclaredEntity { entity: String },

    #[error("Entity '{entity}' does not grant the '{capability}' capability")]
    CapabilityNotGranted {
        entity: String,
        capability: CapabilityTag,
    },

    #[error("No delegate available for declared entity '{entity}'")]
    DelegateMissing { entity: String },

    #[error("Operation handler failed: {message}")]
    Handler {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl OperationError {
    /// Wrap a business-logic failure produced inside a handler.
    pub fn handler<S: Into<String>>(message: S) -> Self {
        Self::Handler {
            message: message.into(),
            source: None,
        }
    }

    /// True for capability violations: undeclared entity access and
    /// capability overreach are programmer errors in the calling operation.
    pub fn is_capability_violation(&self) -> bool {
        matches!(
            self,
            Self::UndeclaredEntity { .. } | Self::CapabilityNotGranted { .. }
        )
    }
}

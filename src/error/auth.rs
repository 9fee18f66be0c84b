//! Errors raised while driving a single authentication attempt.
//!
//! These are recoverable per-request failures: they terminate the attempt
//! through the provider's failure route and never abort the process.

use thiserror::Error;

/// The primary error type for the OAuth-style login flow.
#[derive(Debug, Error)]
pub enum AuthFlowError {
    #[error("State token rejected: {0}")]
    InvalidState(String),

    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Provider denied the authorization request: {0}")]
    ProviderDenied(String),

    #[error("Failed to fetch the provider identity: {0}")]
    IdentityFetchFailed(String),

    #[error("Identity store error: {0}")]
    IdentityStore(String),

    #[error("Session store error: {0}")]
    SessionStore(String),
}

impl AuthFlowError {
    /// Stable reason code carried on the failure redirect, safe to show to
    /// the frontend without leaking exchange internals.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "invalid_state",
            Self::ExchangeFailed(_) => "exchange_failed",
            Self::ProviderDenied(_) => "denied",
            Self::IdentityFetchFailed(_) => "identity_fetch_failed",
            Self::IdentityStore(_) => "identity_store",
            Self::SessionStore(_) => "session_store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(
            AuthFlowError::InvalidState("x".into()).reason_code(),
            "invalid_state"
        );
        assert_eq!(
            AuthFlowError::ExchangeFailed("x".into()).reason_code(),
            "exchange_failed"
        );
        assert_eq!(
            AuthFlowError::ProviderDenied("x".into()).reason_code(),
            "denied"
        );
    }

    #[test]
    fn display_keeps_the_detail() {
        let err = AuthFlowError::ExchangeFailed("token endpoint returned 400".into());
        assert!(err.to_string().contains("token endpoint returned 400"));
    }
}

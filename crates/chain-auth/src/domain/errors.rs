//! # Error Taxonomy
//!
//! Errors surfaced by the authorization oracle. The type is `Clone` so a
//! single-flight leader can fan its failure out to every waiter.
//!
//! Negative authorization outcomes are not errors: they come back as
//! denied [`Decision`](super::entities::Decision) values.

use thiserror::Error;

/// Errors produced by authorization decisions and receipt verification.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Logic violation: unknown request kind or a wrong-kind code path.
    /// Non-retryable.
    #[error("internal: {0}")]
    Internal(String),

    /// The principal has more linked wallets than the evaluator is
    /// willing to fan out over. Client-visible, non-retryable.
    #[error("too many wallets linked to the root key: {wallets} (limit {limit})")]
    ResourceExhausted {
        /// Number of wallets resolved for the principal.
        wallets: usize,
        /// Configured fan-out limit.
        limit: usize,
    },

    /// Receipt verification failed. Client-visible, non-retryable. The
    /// message names the mismatching field and both sides.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A transient RPC failure talking to a chain. Retryable at the
    /// caller.
    #[error("downstream network error: {0}")]
    DownstreamNetworkError(String),

    /// Membership could not be established for any linked wallet because
    /// one or more probes failed. Retryable.
    #[error("cannot check entitlements: {0}")]
    CannotCheckEntitlements(String),
}

impl AuthError {
    /// Whether a caller may retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::DownstreamNetworkError(_) | AuthError::CannotCheckEntitlements(_)
        )
    }

    /// Prefix the message with the failing operation, keeping the
    /// variant so retryability survives propagation.
    pub fn with_context(self, context: &str) -> AuthError {
        match self {
            AuthError::Internal(msg) => AuthError::Internal(format!("{context}: {msg}")),
            AuthError::PermissionDenied(msg) => {
                AuthError::PermissionDenied(format!("{context}: {msg}"))
            }
            AuthError::DownstreamNetworkError(msg) => {
                AuthError::DownstreamNetworkError(format!("{context}: {msg}"))
            }
            AuthError::CannotCheckEntitlements(msg) => {
                AuthError::CannotCheckEntitlements(format!("{context}: {msg}"))
            }
            err @ AuthError::ResourceExhausted { .. } => err,
        }
    }
}

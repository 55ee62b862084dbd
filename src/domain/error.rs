//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::money::MoneyError;
use super::payment::PaymentStatus;

/// Business rule violations and domain invariant failures.
///
/// These are independent of the web/persistence layers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Debit attempted beyond the available balance
    #[error("Insufficient funds: requested {requested} kobo, available {available} kobo")]
    InsufficientFunds { requested: i64, available: i64 },

    /// A payment in a terminal state cannot transition again
    #[error("Invalid payment transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Provider reference is attached exactly once, while pending
    #[error("Provider reference already attached")]
    ReferenceAlreadyAttached,

    /// Invalid monetary value
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl DomainError {
    pub fn insufficient_funds(requested: i64, available: i64) -> Self {
        Self::InsufficientFunds {
            requested,
            available,
        }
    }

    /// Check if this is a client error (caller's fault, no retry)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. } | Self::Money(_) | Self::ReferenceAlreadyAttached
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_error() {
        let err = DomainError::insufficient_funds(50_000, 10_000);

        assert!(err.is_client_error());
        assert!(err.to_string().contains("50000"));
        assert!(err.to_string().contains("10000"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = DomainError::InvalidTransition {
            from: PaymentStatus::Success,
            to: PaymentStatus::Failed,
        };

        assert!(!err.is_client_error());
        assert!(err.to_string().contains("SUCCESS"));
        assert!(err.to_string().contains("FAILED"));
    }
}

//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::provider::ProviderError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Payout account unusable: {0}")]
    PayoutAccount(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Persistence errors (conflict or 5xx)
    #[error(transparent)]
    Store(#[from] StoreError),

    // External provider errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // Server errors (5xx)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Check if this is an optimistic-concurrency conflict (retry after
    /// re-fetch may help).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_concurrency_conflict())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "invalid_signature", None)
            }

            // 404 Not Found
            AppError::WalletNotFound(id) => {
                (StatusCode::NOT_FOUND, "wallet_not_found", Some(id.clone()))
            }
            AppError::PaymentNotFound(reference) => (
                StatusCode::NOT_FOUND,
                "payment_not_found",
                Some(reference.clone()),
            ),

            // 422 Unprocessable Entity
            AppError::PayoutAccount(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "payout_account_unusable",
                Some(msg.clone()),
            ),

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => match domain_err {
                DomainError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_funds",
                    Some(domain_err.to_string()),
                ),
                DomainError::Money(_) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_amount",
                    Some(domain_err.to_string()),
                ),
                DomainError::InvalidTransition { .. }
                | DomainError::ReferenceAlreadyAttached => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_payment_state",
                    Some(domain_err.to_string()),
                ),
            },

            // Persistence errors
            AppError::Store(store_err) => match store_err {
                StoreError::Concurrency { .. } => (
                    StatusCode::CONFLICT,
                    "version_conflict",
                    Some(store_err.to_string()),
                ),
                StoreError::Duplicate(constraint) => (
                    StatusCode::CONFLICT,
                    "duplicate_record",
                    Some(constraint.clone()),
                ),
                StoreError::Database(e) => {
                    tracing::error!("Database error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
                }
            },

            // 502 Bad Gateway
            AppError::Provider(e) => {
                tracing::error!("Provider error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "provider_error",
                    Some(e.to_string()),
                )
            }

            // 500 Internal Server Error
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_conflict_detection() {
        let conflict = AppError::Store(StoreError::Concurrency {
            entity: "wallets",
            id: Uuid::nil(),
        });
        assert!(conflict.is_conflict());

        let not_found = AppError::WalletNotFound(Uuid::nil().to_string());
        assert!(!not_found.is_conflict());
    }
}

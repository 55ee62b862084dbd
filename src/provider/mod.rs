//! Payment provider port
//!
//! The interface this service needs from an external transfer provider:
//! hosted-checkout initialization, charge verification, recipient
//! registration, transfer initiation, and webhook signature validation.

pub mod paystack;

pub use paystack::PaystackClient;

use async_trait::async_trait;

use crate::domain::Kobo;

/// Errors from the payment provider boundary
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider configuration missing: {0}")]
    MissingConfig(String),

    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Provider declined the operation: {0}")]
    Declined(String),
}

/// Bank details submitted for recipient registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientDetails {
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
    pub currency: String,
}

/// Provider-issued recipient registration result.
#[derive(Debug, Clone)]
pub struct TransferRecipient {
    pub recipient_code: String,
    pub account_name: String,
}

/// An outbound transfer instruction.
#[derive(Debug, Clone)]
pub struct TransferInstruction {
    pub recipient_code: String,
    pub amount: Kobo,
    pub reference: String,
    pub reason: Option<String>,
    pub currency: String,
}

/// Provider acknowledgment of an initiated transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub provider_reference: String,
    pub status: String,
    pub message: Option<String>,
}

/// Hosted-checkout session for an inbound charge.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Result of verifying an inbound charge.
#[derive(Debug, Clone)]
pub struct ChargeVerification {
    pub reference: String,
    pub amount_kobo: i64,
    pub succeeded: bool,
}

/// Unified interface for payment provider operations
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Initialize an inbound charge, returning a hosted-checkout session
    /// the payer completes out of band.
    async fn initialize_payment(
        &self,
        email: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<CheckoutSession, ProviderError>;

    /// Verify the status of an inbound charge by its reference.
    async fn verify_payment(&self, reference: &str) -> Result<ChargeVerification, ProviderError>;

    /// Register (or re-register) a bank destination, returning the
    /// recipient code required before transfers.
    async fn create_transfer_recipient(
        &self,
        details: &RecipientDetails,
    ) -> Result<TransferRecipient, ProviderError>;

    /// Initiate an outbound transfer to a registered recipient.
    async fn initiate_transfer(
        &self,
        instruction: &TransferInstruction,
    ) -> Result<TransferReceipt, ProviderError>;

    /// Verify that a webhook payload was signed by the provider.
    fn validate_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;
}

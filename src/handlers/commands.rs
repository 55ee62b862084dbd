//! Command definitions
//!
//! Commands represent intentions to change the system state; results are
//! the projections handed back to the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Payment, PaymentStatus, Wallet};

/// Command to withdraw wallet funds to a bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub user_id: Uuid,
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
    /// Amount in major currency units (naira); converted to kobo at the
    /// boundary.
    pub amount: Decimal,
    pub reason: Option<String>,
}

impl WithdrawCommand {
    pub fn new(
        user_id: Uuid,
        name: String,
        account_number: String,
        bank_code: String,
        amount: Decimal,
    ) -> Self {
        Self {
            user_id,
            name,
            account_number,
            bank_code,
            amount,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Command to initialize a wallet deposit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundCommand {
    pub user_id: Uuid,
    pub email: String,
    /// Amount in major currency units (naira)
    pub amount: Decimal,
}

impl FundCommand {
    pub fn new(user_id: Uuid, email: String, amount: Decimal) -> Self {
        Self {
            user_id,
            email,
            amount,
        }
    }
}

/// Wallet projection returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct WalletView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance_kobo: i64,
    pub available_kobo: i64,
    pub currency: String,
}

impl From<&Wallet> for WalletView {
    fn from(wallet: &Wallet) -> Self {
        Self {
            id: wallet.id(),
            user_id: wallet.user_id(),
            balance_kobo: wallet.balance().value(),
            available_kobo: wallet.available().value(),
            currency: wallet.currency().to_string(),
        }
    }
}

/// Payment projection returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount_kobo: i64,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_reference: Option<String>,
    pub system_reference: String,
    pub currency: String,
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id(),
            wallet_id: payment.wallet_id(),
            amount_kobo: payment.amount().value(),
            status: payment.status(),
            provider: payment.provider().to_string(),
            provider_reference: payment.provider_reference().map(str::to_string),
            system_reference: payment.system_reference().to_string(),
            currency: payment.currency().to_string(),
        }
    }
}

/// Result of a withdrawal request
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawResult {
    pub status: String,
    pub payment: PaymentView,
    pub wallet: WalletView,
}

/// Result of initializing a deposit
#[derive(Debug, Clone, Serialize)]
pub struct FundResult {
    pub status: String,
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
    pub payment: PaymentView,
}

/// An authenticated webhook event from the payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

/// Event payload; providers attach event-specific fields beyond the
/// reference, kept opaque here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookData {
    pub reference: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WebhookEvent {
    pub fn new(event: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: WebhookData {
                reference: reference.into(),
                extra: serde_json::Map::new(),
            },
        }
    }

    /// Provider-supplied failure reason, when present.
    pub fn reason(&self) -> Option<&str> {
        self.data.extra.get("reason").and_then(|v| v.as_str())
    }
}

/// Outcome of reconciling a webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WebhookOutcome {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "reversed")]
    Reversed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "already processed")]
    AlreadyProcessed,
    #[serde(rename = "ignored")]
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Reversed => "reversed",
            Self::Failed => "failed",
            Self::AlreadyProcessed => "already processed",
            Self::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for WebhookOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_withdraw_command_builder() {
        let user_id = Uuid::new_v4();
        let cmd = WithdrawCommand::new(
            user_id,
            "Ada Obi".to_string(),
            "0123456789".to_string(),
            "058".to_string(),
            dec!(500),
        )
        .with_reason("Weekly payout".to_string());

        assert_eq!(cmd.user_id, user_id);
        assert_eq!(cmd.amount, dec!(500));
        assert_eq!(cmd.reason, Some("Weekly payout".to_string()));
    }

    #[test]
    fn test_webhook_event_deserializes_extra_fields() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{
                "event": "transfer.failed",
                "data": {
                    "reference": "TRF_123",
                    "reason": "Account resolution failed",
                    "amount": 50000
                }
            }"#,
        )
        .unwrap();

        assert_eq!(event.event, "transfer.failed");
        assert_eq!(event.data.reference, "TRF_123");
        assert_eq!(event.reason(), Some("Account resolution failed"));
        assert_eq!(event.data.extra["amount"], 50_000);
    }

    #[test]
    fn test_webhook_outcome_labels() {
        assert_eq!(WebhookOutcome::AlreadyProcessed.as_str(), "already processed");
        assert_eq!(
            serde_json::to_value(WebhookOutcome::AlreadyProcessed).unwrap(),
            serde_json::json!("already processed")
        );
        assert_eq!(WebhookOutcome::Ignored.to_string(), "ignored");
    }
}

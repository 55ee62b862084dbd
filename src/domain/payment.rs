//! Payment Aggregate
//!
//! One external money movement (withdrawal payout or deposit charge) tied
//! to a wallet. Owns a one-directional state machine: PENDING is the only
//! state from which any outcome is reachable, and SUCCESS, FAILED and
//! REVERSED are sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::DomainError;
use super::money::Kobo;

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Reversed,
}

impl PaymentStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Reversed => "REVERSED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "REVERSED" => Ok(Self::Reversed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Payment Aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    id: Uuid,
    wallet_id: Uuid,
    amount: Kobo,
    status: PaymentStatus,
    provider: String,
    provider_reference: Option<String>,
    system_reference: String,
    currency: String,
    failed_reason: Option<String>,
    cancel_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Plain persistence projection of a [`Payment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount_kobo: i64,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_reference: Option<String>,
    pub system_reference: String,
    pub currency: String,
    pub failed_reason: Option<String>,
    pub cancel_reason: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a new PENDING payment with a fresh, globally unique system
    /// reference. The provider reference is attached later, once the
    /// provider has acknowledged the movement.
    pub fn create(
        wallet_id: Uuid,
        amount: Kobo,
        provider: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            amount,
            status: PaymentStatus::Pending,
            provider: provider.into(),
            provider_reference: None,
            system_reference: format!("PAY-{}", Uuid::new_v4().simple()),
            currency: currency.into(),
            failed_reason: None,
            cancel_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the provider's reference. Allowed only while PENDING, and
    /// exactly once.
    pub fn add_provider_reference(
        &mut self,
        reference: impl Into<String>,
    ) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: self.status,
            });
        }
        if self.provider_reference.is_some() {
            return Err(DomainError::ReferenceAlreadyAttached);
        }
        self.provider_reference = Some(reference.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// PENDING -> SUCCESS
    pub fn mark_success(&mut self) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Success)
    }

    /// PENDING -> FAILED
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Failed)?;
        self.failed_reason = Some(reason.into());
        Ok(())
    }

    /// PENDING -> REVERSED
    pub fn mark_reversed(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Reversed)?;
        self.cancel_reason = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, to: PaymentStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn wallet_id(&self) -> Uuid {
        self.wallet_id
    }

    pub fn amount(&self) -> Kobo {
        self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn provider_reference(&self) -> Option<&str> {
        self.provider_reference.as_deref()
    }

    pub fn system_reference(&self) -> &str {
        &self.system_reference
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn failed_reason(&self) -> Option<&str> {
        self.failed_reason.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// True once the payment reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Extract the persistence projection.
    pub fn snapshot(&self) -> PaymentSnapshot {
        PaymentSnapshot {
            id: self.id,
            wallet_id: self.wallet_id,
            amount_kobo: self.amount.value(),
            status: self.status,
            provider: self.provider.clone(),
            provider_reference: self.provider_reference.clone(),
            system_reference: self.system_reference.clone(),
            currency: self.currency.clone(),
            failed_reason: self.failed_reason.clone(),
            cancel_reason: self.cancel_reason.clone(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild a payment from its stored projection.
    pub fn from_snapshot(snapshot: PaymentSnapshot) -> Result<Self, DomainError> {
        Ok(Self {
            id: snapshot.id,
            wallet_id: snapshot.wallet_id,
            amount: Kobo::new(snapshot.amount_kobo)?,
            status: snapshot.status,
            provider: snapshot.provider,
            provider_reference: snapshot.provider_reference,
            system_reference: snapshot.system_reference,
            currency: snapshot.currency,
            failed_reason: snapshot.failed_reason,
            cancel_reason: snapshot.cancel_reason,
            version: snapshot.version,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }

    /// Called by repositories after a successful save.
    pub(crate) fn mark_persisted(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_payment() -> Payment {
        Payment::create(Uuid::new_v4(), Kobo::new(50_000).unwrap(), "paystack", "NGN")
    }

    #[test]
    fn test_create_is_pending_with_system_reference() {
        let payment = pending_payment();

        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert!(payment.system_reference().starts_with("PAY-"));
        assert!(payment.provider_reference().is_none());
        assert!(!payment.is_settled());
    }

    #[test]
    fn test_system_references_are_unique() {
        let a = pending_payment();
        let b = pending_payment();
        assert_ne!(a.system_reference(), b.system_reference());
    }

    #[test]
    fn test_add_provider_reference_once() {
        let mut payment = pending_payment();

        payment.add_provider_reference("TRF_123").unwrap();
        assert_eq!(payment.provider_reference(), Some("TRF_123"));

        let result = payment.add_provider_reference("TRF_456");
        assert!(matches!(result, Err(DomainError::ReferenceAlreadyAttached)));
        assert_eq!(payment.provider_reference(), Some("TRF_123"));
    }

    #[test]
    fn test_mark_success() {
        let mut payment = pending_payment();
        payment.mark_success().unwrap();

        assert_eq!(payment.status(), PaymentStatus::Success);
        assert!(payment.is_settled());
    }

    #[test]
    fn test_mark_failed_records_reason() {
        let mut payment = pending_payment();
        payment.mark_failed("insufficient provider float").unwrap();

        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert_eq!(payment.failed_reason(), Some("insufficient provider float"));
    }

    #[test]
    fn test_mark_reversed_records_reason() {
        let mut payment = pending_payment();
        payment.mark_reversed("recalled by bank").unwrap();

        assert_eq!(payment.status(), PaymentStatus::Reversed);
        assert_eq!(payment.cancel_reason(), Some("recalled by bank"));
    }

    #[test]
    fn test_terminal_states_are_sinks() {
        let mut success = pending_payment();
        success.mark_success().unwrap();
        assert!(success.mark_failed("late failure").is_err());
        assert!(success.mark_reversed("late reversal").is_err());
        assert_eq!(success.status(), PaymentStatus::Success);

        let mut failed = pending_payment();
        failed.mark_failed("declined").unwrap();
        assert!(failed.mark_success().is_err());
        assert_eq!(failed.status(), PaymentStatus::Failed);

        let mut reversed = pending_payment();
        reversed.mark_reversed("recall").unwrap();
        assert!(reversed.mark_success().is_err());
        assert!(reversed.add_provider_reference("TRF_9").is_err());
        assert_eq!(reversed.status(), PaymentStatus::Reversed);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Success,
            PaymentStatus::Failed,
            PaymentStatus::Reversed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("SETTLED".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut payment = pending_payment();
        payment.add_provider_reference("TRF_123").unwrap();
        payment.mark_persisted();

        let restored = Payment::from_snapshot(payment.snapshot()).unwrap();
        assert_eq!(restored, payment);
    }
}

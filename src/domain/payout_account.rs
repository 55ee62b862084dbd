//! Payout Account Aggregate
//!
//! A user's verified external bank destination. One record per user;
//! created lazily on first withdrawal and re-verified whenever a
//! withdrawal targets different bank details. The provider-issued
//! recipient code must exist before any transfer is initiated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payout Account Aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutAccount {
    id: Uuid,
    user_id: Uuid,
    bank_code: String,
    account_number: String,
    account_name: String,
    recipient_code: Option<String>,
    is_verified: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Plain persistence projection of a [`PayoutAccount`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutAccountSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    pub recipient_code: Option<String>,
    pub is_verified: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayoutAccount {
    /// Create a verified payout account with the provider-issued
    /// recipient code.
    pub fn create(
        user_id: Uuid,
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
        recipient_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            bank_code: bank_code.into(),
            account_number: account_number.into(),
            account_name: account_name.into(),
            recipient_code: Some(recipient_code.into()),
            is_verified: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Point the account at new bank details and the freshly issued
    /// recipient code for them.
    pub fn update_destination(
        &mut self,
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
        recipient_code: impl Into<String>,
    ) {
        self.bank_code = bank_code.into();
        self.account_number = account_number.into();
        self.account_name = account_name.into();
        self.recipient_code = Some(recipient_code.into());
        self.is_verified = true;
        self.updated_at = Utc::now();
    }

    /// True when a withdrawal command names different bank details than
    /// the stored destination.
    pub fn destination_differs(&self, bank_code: &str, account_number: &str) -> bool {
        self.bank_code != bank_code || self.account_number != account_number
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn bank_code(&self) -> &str {
        &self.bank_code
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Provider recipient code, required before transfers.
    pub fn recipient_code(&self) -> Option<&str> {
        self.recipient_code.as_deref().filter(|c| !c.is_empty())
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Extract the persistence projection.
    pub fn snapshot(&self) -> PayoutAccountSnapshot {
        PayoutAccountSnapshot {
            id: self.id,
            user_id: self.user_id,
            bank_code: self.bank_code.clone(),
            account_number: self.account_number.clone(),
            account_name: self.account_name.clone(),
            recipient_code: self.recipient_code.clone(),
            is_verified: self.is_verified,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild a payout account from its stored projection.
    pub fn from_snapshot(snapshot: PayoutAccountSnapshot) -> Self {
        Self {
            id: snapshot.id,
            user_id: snapshot.user_id,
            bank_code: snapshot.bank_code,
            account_number: snapshot.account_number,
            account_name: snapshot.account_name,
            recipient_code: snapshot.recipient_code,
            is_verified: snapshot.is_verified,
            version: snapshot.version,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }

    /// Called by repositories after a successful save.
    pub(crate) fn mark_persisted(&mut self) {
        self.version += 1;
    }
}

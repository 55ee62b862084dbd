//! Ledger Entries
//!
//! Immutable records of completed balance movements. The ledger is
//! append-only: corrections are new REVERSAL rows, never edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::money::Kobo;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Credit,
    Debit,
    Reversal,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
            Self::Reversal => "REVERSAL",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            "REVERSAL" => Ok(Self::Reversal),
            other => Err(format!("unknown entry type: {other}")),
        }
    }
}

/// One immutable ledger line, linked to a wallet and optionally to the
/// payment that caused the movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub amount_kobo: i64,
    pub entry_type: EntryType,
    pub reference: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        wallet_id: Uuid,
        payment_id: Option<Uuid>,
        amount: Kobo,
        entry_type: EntryType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            payment_id,
            amount_kobo: amount.value(),
            entry_type,
            reference: format!("LED-{}", Uuid::new_v4().simple()),
            description: description.into(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: Utc::now(),
        }
    }

    pub fn debit(
        wallet_id: Uuid,
        payment_id: Uuid,
        amount: Kobo,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            wallet_id,
            Some(payment_id),
            amount,
            EntryType::Debit,
            description,
        )
    }

    pub fn credit(
        wallet_id: Uuid,
        payment_id: Option<Uuid>,
        amount: Kobo,
        description: impl Into<String>,
    ) -> Self {
        Self::new(wallet_id, payment_id, amount, EntryType::Credit, description)
    }

    pub fn reversal(
        wallet_id: Uuid,
        payment_id: Uuid,
        amount: Kobo,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            wallet_id,
            Some(payment_id),
            amount,
            EntryType::Reversal,
            description,
        )
    }

    /// Attach opaque metadata to the entry at construction time.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debit_entry() {
        let wallet_id = Uuid::new_v4();
        let payment_id = Uuid::new_v4();
        let entry = LedgerEntry::debit(
            wallet_id,
            payment_id,
            Kobo::new(50_000).unwrap(),
            "withdrawal hold",
        );

        assert_eq!(entry.wallet_id, wallet_id);
        assert_eq!(entry.payment_id, Some(payment_id));
        assert_eq!(entry.amount_kobo, 50_000);
        assert_eq!(entry.entry_type, EntryType::Debit);
        assert!(entry.reference.starts_with("LED-"));
    }

    #[test]
    fn test_credit_entry_without_payment() {
        let entry = LedgerEntry::credit(
            Uuid::new_v4(),
            None,
            Kobo::new(10_000).unwrap(),
            "promotional credit",
        );

        assert!(entry.payment_id.is_none());
        assert_eq!(entry.entry_type, EntryType::Credit);
    }

    #[test]
    fn test_with_metadata() {
        let entry = LedgerEntry::credit(
            Uuid::new_v4(),
            None,
            Kobo::new(10_000).unwrap(),
            "deposit",
        )
        .with_metadata(json!({"channel": "card"}));

        assert_eq!(entry.metadata["channel"], "card");
    }

    #[test]
    fn test_references_are_unique() {
        let wallet_id = Uuid::new_v4();
        let a = LedgerEntry::credit(wallet_id, None, Kobo::new(1).unwrap(), "a");
        let b = LedgerEntry::credit(wallet_id, None, Kobo::new(1).unwrap(), "b");
        assert_ne!(a.reference, b.reference);
    }

    #[test]
    fn test_entry_type_round_trips_through_str() {
        for entry_type in [EntryType::Credit, EntryType::Debit, EntryType::Reversal] {
            assert_eq!(
                entry_type.as_str().parse::<EntryType>().unwrap(),
                entry_type
            );
        }
        assert!("TRANSFER".parse::<EntryType>().is_err());
    }
}

//! Wallet Aggregate
//!
//! A wallet holds one user's funds. Balances move only through `fund` and
//! `debit`; fields are never assigned directly. Wallets are created once
//! per user and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;
use super::money::{Balance, Kobo};

/// Wallet Aggregate
///
/// `available` tracks funds not held for pending outbound transfers and is
/// never greater than `balance`. Both are integer kobo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    id: Uuid,
    user_id: Uuid,
    balance: Balance,
    available: Balance,
    currency: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Plain persistence projection of a [`Wallet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance_kobo: i64,
    pub available_kobo: i64,
    pub currency: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a new, unpersisted wallet with zero balances.
    pub fn create(user_id: Uuid, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: Balance::zero(),
            available: Balance::zero(),
            currency: currency.into(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Credit the wallet. Increases balance and available together.
    pub fn fund(&mut self, amount: Kobo) -> Result<(), DomainError> {
        self.balance = self.balance.credit(amount)?;
        self.available = self.available.credit(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Debit the wallet. Fails fast when the available balance does not
    /// cover the amount; no partial debits.
    pub fn debit(&mut self, amount: Kobo) -> Result<(), DomainError> {
        if !self.available.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                self.available.value(),
            ));
        }
        self.balance = self.balance.debit(amount)?;
        self.available = self.available.debit(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn available(&self) -> Balance {
        self.available
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Version of the persisted state this instance was loaded from
    /// (0 for a wallet that has never been saved).
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Extract the persistence projection.
    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot {
            id: self.id,
            user_id: self.user_id,
            balance_kobo: self.balance.value(),
            available_kobo: self.available.value(),
            currency: self.currency.clone(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild a wallet from its stored projection.
    ///
    /// Stored rows satisfy the balance invariants by schema constraint;
    /// a violating row is a corrupt store and surfaces as an error.
    pub fn from_snapshot(snapshot: WalletSnapshot) -> Result<Self, DomainError> {
        Ok(Self {
            id: snapshot.id,
            user_id: snapshot.user_id,
            balance: Balance::new(snapshot.balance_kobo)?,
            available: Balance::new(snapshot.available_kobo)?,
            currency: snapshot.currency,
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

    fn kobo(value: i64) -> Kobo {
        Kobo::new(value).unwrap()
    }

    #[test]
    fn test_wallet_create() {
        let user_id = Uuid::new_v4();
        let wallet = Wallet::create(user_id, "NGN");

        assert_eq!(wallet.user_id(), user_id);
        assert_eq!(wallet.balance().value(), 0);
        assert_eq!(wallet.available().value(), 0);
        assert_eq!(wallet.currency(), "NGN");
        assert_eq!(wallet.version(), 0);
    }

    #[test]
    fn test_fund_then_debit() {
        let mut wallet = Wallet::create(Uuid::new_v4(), "NGN");

        wallet.fund(kobo(100_000)).unwrap();
        assert_eq!(wallet.balance().value(), 100_000);
        assert_eq!(wallet.available().value(), 100_000);

        wallet.debit(kobo(50_000)).unwrap();
        assert_eq!(wallet.balance().value(), 50_000);
        assert_eq!(wallet.available().value(), 50_000);
    }

    #[test]
    fn test_debit_insufficient_funds_leaves_wallet_unchanged() {
        let mut wallet = Wallet::create(Uuid::new_v4(), "NGN");
        wallet.fund(kobo(10_000)).unwrap();

        let result = wallet.debit(kobo(50_000));
        assert!(matches!(
            result,
            Err(DomainError::InsufficientFunds {
                requested: 50_000,
                available: 10_000,
            })
        ));
        assert_eq!(wallet.balance().value(), 10_000);
        assert_eq!(wallet.available().value(), 10_000);
    }

    #[test]
    fn test_fund_debit_symmetry() {
        let mut wallet = Wallet::create(Uuid::new_v4(), "NGN");
        wallet.fund(kobo(75_000)).unwrap();

        let balance_before = wallet.balance();
        let available_before = wallet.available();

        wallet.fund(kobo(25_000)).unwrap();
        wallet.debit(kobo(25_000)).unwrap();

        assert_eq!(wallet.balance(), balance_before);
        assert_eq!(wallet.available(), available_before);
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut wallet = Wallet::create(Uuid::new_v4(), "NGN");
        wallet.fund(kobo(100_000)).unwrap();

        wallet.debit(kobo(100_000)).unwrap();
        assert_eq!(wallet.balance().value(), 0);
        assert_eq!(wallet.available().value(), 0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut wallet = Wallet::create(Uuid::new_v4(), "NGN");
        wallet.fund(kobo(42_000)).unwrap();
        wallet.mark_persisted();

        let restored = Wallet::from_snapshot(wallet.snapshot()).unwrap();
        assert_eq!(restored, wallet);
        assert_eq!(restored.version(), 1);
    }

    #[test]
    fn test_from_snapshot_rejects_negative_balance() {
        let snapshot = WalletSnapshot {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            balance_kobo: -1,
            available_kobo: 0,
            currency: "NGN".to_string(),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(Wallet::from_snapshot(snapshot).is_err());
    }
}

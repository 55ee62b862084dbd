//! Persistence ports
//!
//! Repository and unit-of-work interfaces over an opaque transactional
//! store. Aggregate saves are guarded by optimistic concurrency: a save
//! that targets a stale version fails with a distinct conflict error
//! instead of silently overwriting, and callers re-fetch before retrying.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{LedgerEntry, Payment, PayoutAccount, Wallet};

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An optimistic-concurrency save targeted a stale record. Callers
    /// must re-fetch before retrying; this layer does not retry.
    #[error("Record not found for update: {entity} {id} was changed concurrently")]
    Concurrency { entity: &'static str, id: Uuid },

    /// A uniqueness constraint was violated
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if this failure means "someone else changed this first"
    /// rather than "this does not exist" or an engine fault.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::Concurrency { .. })
    }
}

/// Wallet lookups
#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn wallet_by_id(&self, id: Uuid) -> Result<Option<Wallet>, StoreError>;
    async fn wallet_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError>;
}

/// Payment lookups
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn payment_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError>;
    async fn payment_by_provider_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError>;
    async fn payment_by_system_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError>;
}

/// Payout account lookups
#[async_trait]
pub trait PayoutAccountRepository: Send + Sync {
    async fn payout_account_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PayoutAccount>, StoreError>;
}

/// Ledger reads
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Entries for a wallet, newest first.
    async fn entries_for_wallet(&self, wallet_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// Scoped transactional boundary. Saves made through one [`StoreTx`]
/// commit or roll back together; dropping the handle without committing
/// rolls back.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

/// Transaction handle supplied by [`UnitOfWork::begin`].
///
/// Saves take `&mut` aggregates and bump the in-memory version on
/// success, so an aggregate can be saved again later in the same flow.
/// After a failed save the instance is stale; re-fetch before retrying.
#[async_trait]
pub trait StoreTx: Send {
    async fn save_wallet(&mut self, wallet: &mut Wallet) -> Result<(), StoreError>;
    async fn save_payment(&mut self, payment: &mut Payment) -> Result<(), StoreError>;
    async fn save_payout_account(
        &mut self,
        account: &mut PayoutAccount,
    ) -> Result<(), StoreError>;
    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Everything the billing use cases need from the store, as one bound.
pub trait BillingStore:
    WalletRepository + PaymentRepository + PayoutAccountRepository + LedgerRepository + UnitOfWork
{
}

impl<T> BillingStore for T where
    T: WalletRepository
        + PaymentRepository
        + PayoutAccountRepository
        + LedgerRepository
        + UnitOfWork
{
}

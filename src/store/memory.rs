//! In-memory store adapter
//!
//! Thread-safe implementation of the persistence ports used by tests and
//! local development. Transaction handles stage their writes and apply
//! them on commit under a single lock, with the same version checks the
//! Postgres adapter gets from conditional updates.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::{
    LedgerEntry, Payment, PaymentSnapshot, PayoutAccount, PayoutAccountSnapshot, Wallet,
    WalletSnapshot,
};

use super::{
    LedgerRepository, PaymentRepository, PayoutAccountRepository, StoreError, StoreTx, UnitOfWork,
    WalletRepository,
};

#[derive(Debug, Default)]
struct MemState {
    wallets: HashMap<Uuid, WalletSnapshot>,
    payments: HashMap<Uuid, PaymentSnapshot>,
    payout_accounts: HashMap<Uuid, PayoutAccountSnapshot>,
    ledger: Vec<LedgerEntry>,
}

/// In-memory billing store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        self.state.lock().expect("store lock poisoned")
    }
}

#[derive(Debug, Clone)]
enum StagedWrite {
    Wallet(WalletSnapshot),
    Payment(PaymentSnapshot),
    PayoutAccount(PayoutAccountSnapshot),
    Ledger(LedgerEntry),
}

fn apply_versioned<T: Clone>(
    map: &mut HashMap<Uuid, T>,
    id: Uuid,
    new: &T,
    new_version: i64,
    current_version: impl Fn(&T) -> i64,
    entity: &'static str,
) -> Result<(), StoreError> {
    match map.get(&id) {
        None if new_version == 1 => {
            map.insert(id, new.clone());
            Ok(())
        }
        Some(existing) if current_version(existing) == new_version - 1 => {
            map.insert(id, new.clone());
            Ok(())
        }
        _ => Err(StoreError::Concurrency { entity, id }),
    }
}

impl MemState {
    fn apply(&mut self, write: &StagedWrite) -> Result<(), StoreError> {
        match write {
            StagedWrite::Wallet(snapshot) => {
                if snapshot.version == 1
                    && self
                        .wallets
                        .values()
                        .any(|w| w.user_id == snapshot.user_id && w.id != snapshot.id)
                {
                    return Err(StoreError::Duplicate("wallets.user_id".to_string()));
                }
                apply_versioned(
                    &mut self.wallets,
                    snapshot.id,
                    snapshot,
                    snapshot.version,
                    |w| w.version,
                    "wallets",
                )
            }
            StagedWrite::Payment(snapshot) => {
                if snapshot.version == 1
                    && self
                        .payments
                        .values()
                        .any(|p| p.system_reference == snapshot.system_reference && p.id != snapshot.id)
                {
                    return Err(StoreError::Duplicate(
                        "payments.system_reference".to_string(),
                    ));
                }
                apply_versioned(
                    &mut self.payments,
                    snapshot.id,
                    snapshot,
                    snapshot.version,
                    |p| p.version,
                    "payments",
                )
            }
            StagedWrite::PayoutAccount(snapshot) => {
                if snapshot.version == 1
                    && self
                        .payout_accounts
                        .values()
                        .any(|a| a.user_id == snapshot.user_id && a.id != snapshot.id)
                {
                    return Err(StoreError::Duplicate("payout_accounts.user_id".to_string()));
                }
                apply_versioned(
                    &mut self.payout_accounts,
                    snapshot.id,
                    snapshot,
                    snapshot.version,
                    |a| a.version,
                    "payout_accounts",
                )
            }
            StagedWrite::Ledger(entry) => {
                if self.ledger.iter().any(|e| e.reference == entry.reference) {
                    return Err(StoreError::Duplicate("ledger_entries.reference".to_string()));
                }
                self.ledger.push(entry.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl WalletRepository for InMemoryStore {
    async fn wallet_by_id(&self, id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let snapshot = self.lock().wallets.get(&id).cloned();
        Ok(snapshot.map(|s| Wallet::from_snapshot(s).expect("stored wallet snapshot is valid")))
    }

    async fn wallet_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let snapshot = self
            .lock()
            .wallets
            .values()
            .find(|w| w.user_id == user_id)
            .cloned();
        Ok(snapshot.map(|s| Wallet::from_snapshot(s).expect("stored wallet snapshot is valid")))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn payment_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        let snapshot = self.lock().payments.get(&id).cloned();
        Ok(snapshot.map(|s| Payment::from_snapshot(s).expect("stored payment snapshot is valid")))
    }

    async fn payment_by_provider_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let snapshot = self
            .lock()
            .payments
            .values()
            .find(|p| p.provider_reference.as_deref() == Some(reference))
            .cloned();
        Ok(snapshot.map(|s| Payment::from_snapshot(s).expect("stored payment snapshot is valid")))
    }

    async fn payment_by_system_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let snapshot = self
            .lock()
            .payments
            .values()
            .find(|p| p.system_reference == reference)
            .cloned();
        Ok(snapshot.map(|s| Payment::from_snapshot(s).expect("stored payment snapshot is valid")))
    }
}

#[async_trait]
impl PayoutAccountRepository for InMemoryStore {
    async fn payout_account_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PayoutAccount>, StoreError> {
        let snapshot = self
            .lock()
            .payout_accounts
            .values()
            .find(|a| a.user_id == user_id)
            .cloned();
        Ok(snapshot.map(PayoutAccount::from_snapshot))
    }
}

#[async_trait]
impl LedgerRepository for InMemoryStore {
    async fn entries_for_wallet(&self, wallet_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut entries: Vec<LedgerEntry> = self
            .lock()
            .ledger
            .iter()
            .filter(|e| e.wallet_id == wallet_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(MemStoreTx {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        }))
    }
}

/// In-memory transaction handle. Writes are staged and applied together
/// on commit; dropping the handle discards them.
pub struct MemStoreTx {
    state: Arc<Mutex<MemState>>,
    staged: Vec<StagedWrite>,
}

impl MemStoreTx {
    /// Validate a staged write against committed state plus what this
    /// transaction has already staged, without applying anything.
    fn check(&self, write: &StagedWrite) -> Result<(), StoreError> {
        let state = self.state.lock().expect("store lock poisoned");
        let mut scratch = MemState {
            wallets: state.wallets.clone(),
            payments: state.payments.clone(),
            payout_accounts: state.payout_accounts.clone(),
            ledger: state.ledger.clone(),
        };
        drop(state);

        for staged in &self.staged {
            scratch.apply(staged)?;
        }
        scratch.apply(write)
    }

    fn stage(&mut self, write: StagedWrite) -> Result<(), StoreError> {
        self.check(&write)?;
        self.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl StoreTx for MemStoreTx {
    async fn save_wallet(&mut self, wallet: &mut Wallet) -> Result<(), StoreError> {
        let mut snapshot = wallet.snapshot();
        snapshot.version += 1;
        self.stage(StagedWrite::Wallet(snapshot))?;
        wallet.mark_persisted();
        Ok(())
    }

    async fn save_payment(&mut self, payment: &mut Payment) -> Result<(), StoreError> {
        let mut snapshot = payment.snapshot();
        snapshot.version += 1;
        self.stage(StagedWrite::Payment(snapshot))?;
        payment.mark_persisted();
        Ok(())
    }

    async fn save_payout_account(
        &mut self,
        account: &mut PayoutAccount,
    ) -> Result<(), StoreError> {
        let mut snapshot = account.snapshot();
        snapshot.version += 1;
        self.stage(StagedWrite::PayoutAccount(snapshot))?;
        account.mark_persisted();
        Ok(())
    }

    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.stage(StagedWrite::Ledger(entry.clone()))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store lock poisoned");
        let mut scratch = MemState {
            wallets: state.wallets.clone(),
            payments: state.payments.clone(),
            payout_accounts: state.payout_accounts.clone(),
            ledger: state.ledger.clone(),
        };

        for write in &self.staged {
            scratch.apply(write)?;
        }

        *state = scratch;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

//! Postgres store adapter
//!
//! Implements the repository and unit-of-work ports on top of sqlx.
//! Aggregate saves are conditional updates (`WHERE id = $1 AND version = $n`);
//! zero rows affected on an existing record surfaces as a concurrency
//! conflict rather than an overwrite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{
    EntryType, LedgerEntry, Payment, PaymentSnapshot, PaymentStatus, PayoutAccount,
    PayoutAccountSnapshot, Wallet, WalletSnapshot,
};

use super::{
    LedgerRepository, PaymentRepository, PayoutAccountRepository, StoreError, StoreTx, UnitOfWork,
    WalletRepository,
};

type WalletRow = (
    Uuid,
    Uuid,
    i64,
    i64,
    String,
    i64,
    DateTime<Utc>,
    DateTime<Utc>,
);

type PaymentRow = (
    Uuid,
    Uuid,
    i64,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    i64,
    DateTime<Utc>,
    DateTime<Utc>,
);

type PayoutAccountRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Option<String>,
    bool,
    i64,
    DateTime<Utc>,
    DateTime<Utc>,
);

type LedgerRow = (
    Uuid,
    Uuid,
    Option<Uuid>,
    i64,
    String,
    String,
    String,
    serde_json::Value,
    DateTime<Utc>,
);

/// Postgres-backed billing store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn corrupt_row<E>(err: E) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StoreError::Database(sqlx::Error::Decode(Box::new(err)))
}

fn wallet_from_row(row: WalletRow) -> Result<Wallet, StoreError> {
    let (id, user_id, balance_kobo, available_kobo, currency, version, created_at, updated_at) =
        row;
    Wallet::from_snapshot(WalletSnapshot {
        id,
        user_id,
        balance_kobo,
        available_kobo,
        currency,
        version,
        created_at,
        updated_at,
    })
    .map_err(corrupt_row)
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, StoreError> {
    let (
        id,
        wallet_id,
        amount_kobo,
        status,
        provider,
        provider_reference,
        system_reference,
        currency,
        failed_reason,
        cancel_reason,
        version,
        created_at,
        updated_at,
    ) = row;
    let status = PaymentStatus::from_str(&status)
        .map_err(|e| corrupt_row(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    Payment::from_snapshot(PaymentSnapshot {
        id,
        wallet_id,
        amount_kobo,
        status,
        provider,
        provider_reference,
        system_reference,
        currency,
        failed_reason,
        cancel_reason,
        version,
        created_at,
        updated_at,
    })
    .map_err(corrupt_row)
}

fn payout_account_from_row(row: PayoutAccountRow) -> PayoutAccount {
    let (
        id,
        user_id,
        bank_code,
        account_number,
        account_name,
        recipient_code,
        is_verified,
        version,
        created_at,
        updated_at,
    ) = row;
    PayoutAccount::from_snapshot(PayoutAccountSnapshot {
        id,
        user_id,
        bank_code,
        account_number,
        account_name,
        recipient_code,
        is_verified,
        version,
        created_at,
        updated_at,
    })
}

fn ledger_entry_from_row(row: LedgerRow) -> Result<LedgerEntry, StoreError> {
    let (id, wallet_id, payment_id, amount_kobo, entry_type, reference, description, metadata, created_at) =
        row;
    let entry_type = EntryType::from_str(&entry_type)
        .map_err(|e| corrupt_row(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    Ok(LedgerEntry {
        id,
        wallet_id,
        payment_id,
        amount_kobo,
        entry_type,
        reference,
        description,
        metadata,
        created_at,
    })
}

fn map_insert_error(err: sqlx::Error, constraint: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(constraint.to_string())
        }
        _ => StoreError::Database(err),
    }
}

const WALLET_COLUMNS: &str =
    "id, user_id, balance_kobo, available_kobo, currency, version, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, wallet_id, amount_kobo, status, provider, provider_reference, \
     system_reference, currency, failed_reason, cancel_reason, version, created_at, updated_at";

const PAYOUT_ACCOUNT_COLUMNS: &str = "id, user_id, bank_code, account_number, account_name, \
     recipient_code, is_verified, version, created_at, updated_at";

#[async_trait]
impl WalletRepository for PgStore {
    async fn wallet_by_id(&self, id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let row: Option<WalletRow> = sqlx::query_as(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(wallet_from_row).transpose()
    }

    async fn wallet_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let row: Option<WalletRow> = sqlx::query_as(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(wallet_from_row).transpose()
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn payment_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(payment_from_row).transpose()
    }

    async fn payment_by_provider_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE provider_reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(payment_from_row).transpose()
    }

    async fn payment_by_system_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE system_reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(payment_from_row).transpose()
    }
}

#[async_trait]
impl PayoutAccountRepository for PgStore {
    async fn payout_account_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PayoutAccount>, StoreError> {
        let row: Option<PayoutAccountRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_ACCOUNT_COLUMNS} FROM payout_accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(payout_account_from_row))
    }
}

#[async_trait]
impl LedgerRepository for PgStore {
    async fn entries_for_wallet(&self, wallet_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, wallet_id, payment_id, amount_kobo, entry_type, reference,
                   description, metadata, created_at
            FROM ledger_entries
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ledger_entry_from_row).collect()
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }
}

/// Postgres transaction handle. Dropping without commit rolls back.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn save_wallet(&mut self, wallet: &mut Wallet) -> Result<(), StoreError> {
        let snapshot = wallet.snapshot();

        if snapshot.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO wallets (id, user_id, balance_kobo, available_kobo,
                                     currency, version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, 1, $6, $7)
                "#,
            )
            .bind(snapshot.id)
            .bind(snapshot.user_id)
            .bind(snapshot.balance_kobo)
            .bind(snapshot.available_kobo)
            .bind(&snapshot.currency)
            .bind(snapshot.created_at)
            .bind(snapshot.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_insert_error(e, "wallets.user_id"))?;
        } else {
            let rows = sqlx::query(
                r#"
                UPDATE wallets
                SET balance_kobo = $2, available_kobo = $3, version = $4, updated_at = $5
                WHERE id = $1 AND version = $6
                "#,
            )
            .bind(snapshot.id)
            .bind(snapshot.balance_kobo)
            .bind(snapshot.available_kobo)
            .bind(snapshot.version + 1)
            .bind(snapshot.updated_at)
            .bind(snapshot.version)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

            if rows == 0 {
                return Err(StoreError::Concurrency {
                    entity: "wallets",
                    id: snapshot.id,
                });
            }
        }

        wallet.mark_persisted();
        Ok(())
    }

    async fn save_payment(&mut self, payment: &mut Payment) -> Result<(), StoreError> {
        let snapshot = payment.snapshot();

        if snapshot.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO payments (id, wallet_id, amount_kobo, status, provider,
                                      provider_reference, system_reference, currency,
                                      failed_reason, cancel_reason, version,
                                      created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1, $11, $12)
                "#,
            )
            .bind(snapshot.id)
            .bind(snapshot.wallet_id)
            .bind(snapshot.amount_kobo)
            .bind(snapshot.status.as_str())
            .bind(&snapshot.provider)
            .bind(&snapshot.provider_reference)
            .bind(&snapshot.system_reference)
            .bind(&snapshot.currency)
            .bind(&snapshot.failed_reason)
            .bind(&snapshot.cancel_reason)
            .bind(snapshot.created_at)
            .bind(snapshot.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_insert_error(e, "payments.system_reference"))?;
        } else {
            let rows = sqlx::query(
                r#"
                UPDATE payments
                SET status = $2, provider_reference = $3, failed_reason = $4,
                    cancel_reason = $5, version = $6, updated_at = $7
                WHERE id = $1 AND version = $8
                "#,
            )
            .bind(snapshot.id)
            .bind(snapshot.status.as_str())
            .bind(&snapshot.provider_reference)
            .bind(&snapshot.failed_reason)
            .bind(&snapshot.cancel_reason)
            .bind(snapshot.version + 1)
            .bind(snapshot.updated_at)
            .bind(snapshot.version)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

            if rows == 0 {
                return Err(StoreError::Concurrency {
                    entity: "payments",
                    id: snapshot.id,
                });
            }
        }

        payment.mark_persisted();
        Ok(())
    }

    async fn save_payout_account(
        &mut self,
        account: &mut PayoutAccount,
    ) -> Result<(), StoreError> {
        let snapshot = account.snapshot();

        if snapshot.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO payout_accounts (id, user_id, bank_code, account_number,
                                             account_name, recipient_code, is_verified,
                                             version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $9)
                "#,
            )
            .bind(snapshot.id)
            .bind(snapshot.user_id)
            .bind(&snapshot.bank_code)
            .bind(&snapshot.account_number)
            .bind(&snapshot.account_name)
            .bind(&snapshot.recipient_code)
            .bind(snapshot.is_verified)
            .bind(snapshot.created_at)
            .bind(snapshot.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_insert_error(e, "payout_accounts.user_id"))?;
        } else {
            let rows = sqlx::query(
                r#"
                UPDATE payout_accounts
                SET bank_code = $2, account_number = $3, account_name = $4,
                    recipient_code = $5, is_verified = $6, version = $7, updated_at = $8
                WHERE id = $1 AND version = $9
                "#,
            )
            .bind(snapshot.id)
            .bind(&snapshot.bank_code)
            .bind(&snapshot.account_number)
            .bind(&snapshot.account_name)
            .bind(&snapshot.recipient_code)
            .bind(snapshot.is_verified)
            .bind(snapshot.version + 1)
            .bind(snapshot.updated_at)
            .bind(snapshot.version)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

            if rows == 0 {
                return Err(StoreError::Concurrency {
                    entity: "payout_accounts",
                    id: snapshot.id,
                });
            }
        }

        account.mark_persisted();
        Ok(())
    }

    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, wallet_id, payment_id, amount_kobo, entry_type,
                                        reference, description, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.wallet_id)
        .bind(entry.payment_id)
        .bind(entry.amount_kobo)
        .bind(entry.entry_type.as_str())
        .bind(&entry.reference)
        .bind(&entry.description)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_insert_error(e, "ledger_entries.reference"))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

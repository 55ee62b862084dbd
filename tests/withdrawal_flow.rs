//! Withdrawal lifecycle tests
//!
//! Exercises the public library API end to end over the in-memory store:
//! hold, provider hand-off, and webhook settlement in both directions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;
use uuid::Uuid;

use gig_billing::domain::{EntryType, Kobo, PaymentStatus, Wallet};
use gig_billing::provider::{
    ChargeVerification, CheckoutSession, PaymentProvider, ProviderError, RecipientDetails,
    TransferInstruction, TransferReceipt, TransferRecipient,
};
use gig_billing::store::{
    InMemoryStore, LedgerRepository, PaymentRepository, StoreTx, UnitOfWork, WalletRepository,
};
use gig_billing::{
    WebhookEvent, WebhookHandler, WebhookOutcome, WithdrawCommand, WithdrawHandler,
};

/// Provider stub that numbers transfer references in order.
struct SequencedProvider {
    transfer_count: Mutex<u32>,
}

impl SequencedProvider {
    fn new() -> Self {
        Self {
            transfer_count: Mutex::new(0),
        }
    }
}

#[async_trait]
impl PaymentProvider for SequencedProvider {
    async fn initialize_payment(
        &self,
        _email: &str,
        _amount: Kobo,
        reference: &str,
    ) -> Result<CheckoutSession, ProviderError> {
        Ok(CheckoutSession {
            authorization_url: format!("https://checkout.test/{reference}"),
            access_code: "AC_test".to_string(),
            reference: reference.to_string(),
        })
    }

    async fn verify_payment(&self, reference: &str) -> Result<ChargeVerification, ProviderError> {
        Ok(ChargeVerification {
            reference: reference.to_string(),
            amount_kobo: 0,
            succeeded: false,
        })
    }

    async fn create_transfer_recipient(
        &self,
        details: &RecipientDetails,
    ) -> Result<TransferRecipient, ProviderError> {
        Ok(TransferRecipient {
            recipient_code: "RCP_flow".to_string(),
            account_name: details.name.clone(),
        })
    }

    async fn initiate_transfer(
        &self,
        _instruction: &TransferInstruction,
    ) -> Result<TransferReceipt, ProviderError> {
        let mut count = self.transfer_count.lock().unwrap();
        *count += 1;
        Ok(TransferReceipt {
            provider_reference: format!("TRF_{count}"),
            status: "pending".to_string(),
            message: None,
        })
    }

    fn validate_webhook_signature(&self, _payload: &[u8], _signature: &str) -> bool {
        true
    }
}

async fn seed_wallet(store: &InMemoryStore, user_id: Uuid, balance_kobo: i64) -> Wallet {
    let mut wallet = Wallet::create(user_id, "NGN");
    wallet.fund(Kobo::new(balance_kobo).unwrap()).unwrap();
    let mut tx = store.begin().await.unwrap();
    tx.save_wallet(&mut wallet).await.unwrap();
    tx.commit().await.unwrap();
    wallet
}

fn withdraw_command(user_id: Uuid, amount: rust_decimal::Decimal) -> WithdrawCommand {
    WithdrawCommand::new(
        user_id,
        "Ada Obi".to_string(),
        "0123456789".to_string(),
        "058".to_string(),
        amount,
    )
}

#[tokio::test]
async fn withdrawal_failure_refund_then_successful_retry() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(SequencedProvider::new());
    let user_id = Uuid::new_v4();
    let wallet = seed_wallet(&store, user_id, 100_000).await;

    let withdraw = WithdrawHandler::new(Arc::clone(&store), Arc::clone(&provider));
    let webhook = WebhookHandler::new(Arc::clone(&store), Arc::clone(&provider));

    // First withdrawal: 600.00 -> 60,000 kobo held
    let first = withdraw
        .execute(withdraw_command(user_id, dec!(600)))
        .await
        .unwrap();
    assert_eq!(first.wallet.available_kobo, 40_000);
    assert_eq!(first.payment.provider_reference.as_deref(), Some("TRF_1"));

    // The provider reports the transfer failed; the hold comes back
    let outcome = webhook
        .execute(WebhookEvent::new("transfer.failed", "TRF_1"))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Failed);

    let refunded = store.wallet_by_user(user_id).await.unwrap().unwrap();
    assert_eq!(refunded.available().value(), 100_000);

    // Retry succeeds and settles
    let second = withdraw
        .execute(withdraw_command(user_id, dec!(600)))
        .await
        .unwrap();
    assert_eq!(second.payment.provider_reference.as_deref(), Some("TRF_2"));

    let outcome = webhook
        .execute(WebhookEvent::new("transfer.success", "TRF_2"))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Success);

    // Replay of the settlement is a no-op
    let replay = webhook
        .execute(WebhookEvent::new("transfer.success", "TRF_2"))
        .await
        .unwrap();
    assert_eq!(replay, WebhookOutcome::AlreadyProcessed);

    // Final state: one consumed hold, both payments terminal
    let final_wallet = store.wallet_by_user(user_id).await.unwrap().unwrap();
    assert_eq!(final_wallet.balance().value(), 40_000);
    assert_eq!(final_wallet.available().value(), 40_000);

    let failed = store
        .payment_by_provider_reference("TRF_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status(), PaymentStatus::Failed);

    let settled = store
        .payment_by_provider_reference("TRF_2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status(), PaymentStatus::Success);

    // Ledger: two holds and one refund, newest first
    let entries = store.entries_for_wallet(wallet.id()).await.unwrap();
    assert_eq!(entries.len(), 3);
    let mut by_type: Vec<EntryType> = entries.iter().map(|e| e.entry_type).collect();
    by_type.sort_by_key(|t| t.as_str());
    assert_eq!(
        by_type,
        vec![EntryType::Debit, EntryType::Debit, EntryType::Reversal]
    );
}

#[tokio::test]
async fn concurrent_withdrawal_loses_version_race() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(SequencedProvider::new());
    let user_id = Uuid::new_v4();
    seed_wallet(&store, user_id, 100_000).await;

    let withdraw = WithdrawHandler::new(Arc::clone(&store), Arc::clone(&provider));

    // A second writer bumps the wallet version between this handler's
    // load and save by completing a full withdrawal first.
    withdraw
        .execute(withdraw_command(user_id, dec!(300)))
        .await
        .unwrap();

    // Stale in-memory copy loses the race when saved directly
    let mut stale = {
        let fresh = store.wallet_by_user(user_id).await.unwrap().unwrap();
        let mut wallet = Wallet::from_snapshot(fresh.snapshot()).unwrap();
        // Roll its version back to simulate a load that happened before
        // the first withdrawal committed.
        let mut snapshot = wallet.snapshot();
        snapshot.version = 1;
        wallet = Wallet::from_snapshot(snapshot).unwrap();
        wallet.debit(Kobo::new(10_000).unwrap()).unwrap();
        wallet
    };

    let mut tx = store.begin().await.unwrap();
    let err = tx.save_wallet(&mut stale).await.unwrap_err();
    assert!(err.is_concurrency_conflict());
}

//! Webhook Handler
//!
//! Reconciles provider webhook events against stored payments. Delivery
//! is at-least-once, so a payment already in a terminal state short-
//! circuits to `already processed` without touching storage. Unrecognized
//! event names are acknowledged and ignored; unknown references are hard
//! errors so a provider/system desync cannot pass silently.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{LedgerEntry, Payment, Wallet};
use crate::error::{AppError, AppResult};
use crate::provider::PaymentProvider;
use crate::store::BillingStore;

use super::{WebhookEvent, WebhookOutcome};

/// Handler for provider webhook reconciliation
pub struct WebhookHandler<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
}

impl<S, P> WebhookHandler<S, P>
where
    S: BillingStore,
    P: PaymentProvider,
{
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    /// Reconcile one webhook event
    pub async fn execute(&self, event: WebhookEvent) -> AppResult<WebhookOutcome> {
        let reference = event.data.reference.clone();

        // Charge events carry the reference this service handed to the
        // provider at initialization; transfer events carry the
        // provider's own transfer reference.
        let payment = if event.event.starts_with("charge.") {
            self.store.payment_by_system_reference(&reference).await?
        } else {
            self.store.payment_by_provider_reference(&reference).await?
        }
        .ok_or_else(|| AppError::PaymentNotFound(reference.clone()))?;

        if payment.is_settled() {
            info!(
                "Webhook {} for payment {} already processed",
                event.event,
                payment.system_reference()
            );
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        match event.event.as_str() {
            "transfer.success" => self.settle_transfer(payment).await,
            "transfer.reversed" => {
                let reason = event.reason().unwrap_or("transfer reversed").to_string();
                self.refund(payment, reason, true).await
            }
            "transfer.failed" => {
                let reason = event.reason().unwrap_or("transfer failed").to_string();
                self.refund(payment, reason, false).await
            }
            "charge.success" => self.settle_charge(payment).await,
            other => {
                info!("Ignoring unsupported webhook event {}", other);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// A confirmed transfer consumes the held funds permanently; only the
    /// payment record changes.
    async fn settle_transfer(&self, mut payment: Payment) -> AppResult<WebhookOutcome> {
        payment.mark_success()?;

        let mut tx = self.store.begin().await?;
        tx.save_payment(&mut payment).await?;
        tx.commit().await?;

        info!("Transfer {} settled as SUCCESS", payment.system_reference());
        Ok(WebhookOutcome::Success)
    }

    /// Failed and reversed transfers are economically equivalent: the
    /// money never left the system, so the hold is returned in full.
    async fn refund(
        &self,
        mut payment: Payment,
        reason: String,
        reversed: bool,
    ) -> AppResult<WebhookOutcome> {
        let mut wallet = self.load_wallet(&payment).await?;

        wallet.fund(payment.amount())?;
        if reversed {
            payment.mark_reversed(reason)?;
        } else {
            payment.mark_failed(reason)?;
        }

        let entry = LedgerEntry::reversal(
            wallet.id(),
            payment.id(),
            payment.amount(),
            if reversed {
                "Transfer reversed, hold returned"
            } else {
                "Transfer failed, hold returned"
            },
        );

        let mut tx = self.store.begin().await?;
        tx.save_wallet(&mut wallet).await?;
        tx.save_payment(&mut payment).await?;
        tx.insert_ledger_entry(&entry).await?;
        tx.commit().await?;

        info!(
            "Returned {} kobo to wallet {} for {} payment {}",
            payment.amount(),
            wallet.id(),
            payment.status(),
            payment.system_reference()
        );

        Ok(if reversed {
            WebhookOutcome::Reversed
        } else {
            WebhookOutcome::Failed
        })
    }

    /// Settle an inbound charge: confirm it with the provider before any
    /// funds are credited.
    async fn settle_charge(&self, mut payment: Payment) -> AppResult<WebhookOutcome> {
        let verification = self
            .provider
            .verify_payment(payment.system_reference())
            .await?;

        if !verification.succeeded || verification.amount_kobo != payment.amount().value() {
            warn!(
                "Charge {} failed verification (succeeded={}, amount={} kobo, expected={} kobo)",
                payment.system_reference(),
                verification.succeeded,
                verification.amount_kobo,
                payment.amount()
            );
            payment.mark_failed("charge verification mismatch")?;

            let mut tx = self.store.begin().await?;
            tx.save_payment(&mut payment).await?;
            tx.commit().await?;

            return Ok(WebhookOutcome::Failed);
        }

        let mut wallet = self.load_wallet(&payment).await?;
        wallet.fund(payment.amount())?;
        payment.mark_success()?;

        let entry = LedgerEntry::credit(
            wallet.id(),
            Some(payment.id()),
            payment.amount(),
            "Wallet deposit",
        );

        let mut tx = self.store.begin().await?;
        tx.save_wallet(&mut wallet).await?;
        tx.save_payment(&mut payment).await?;
        tx.insert_ledger_entry(&entry).await?;
        tx.commit().await?;

        info!(
            "Credited {} kobo to wallet {} for deposit {}",
            payment.amount(),
            wallet.id(),
            payment.system_reference()
        );

        Ok(WebhookOutcome::Success)
    }

    /// The wallet must exist: the payment already references it.
    async fn load_wallet(&self, payment: &Payment) -> AppResult<Wallet> {
        self.store
            .wallet_by_id(payment.wallet_id())
            .await?
            .ok_or_else(|| AppError::WalletNotFound(payment.wallet_id().to_string()))
    }
}

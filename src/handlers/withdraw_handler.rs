//! Withdrawal Handler
//!
//! Orchestrates a wallet-to-bank withdrawal: hold the funds and record the
//! pending payment atomically, then hand the transfer to the provider.
//! The debit commits before the provider call; a provider failure after
//! that point is settled by the webhook reconciliation flow.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{DomainError, Kobo, LedgerEntry, Payment, PayoutAccount};
use crate::error::{AppError, AppResult};
use crate::provider::{PaymentProvider, RecipientDetails, TransferInstruction};
use crate::store::BillingStore;

use super::{WithdrawCommand, WithdrawResult, PROVIDER_NAME};

/// Handler for withdrawal requests
pub struct WithdrawHandler<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
}

impl<S, P> WithdrawHandler<S, P>
where
    S: BillingStore,
    P: PaymentProvider,
{
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    /// Execute the withdrawal command
    pub async fn execute(&self, command: WithdrawCommand) -> AppResult<WithdrawResult> {
        let mut wallet = self
            .store
            .wallet_by_user(command.user_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(command.user_id.to_string()))?;

        let amount = Kobo::from_major(command.amount).map_err(DomainError::from)?;

        let payout_account = self
            .resolve_payout_account(&command, wallet.currency())
            .await?;
        let recipient_code = payout_account
            .recipient_code()
            .ok_or_else(|| {
                AppError::PayoutAccount(
                    "payout destination has no confirmed provider recipient code".to_string(),
                )
            })?
            .to_string();

        // Hold the funds before the provider call. Two concurrent
        // withdrawals cannot both pass a balance check against stale
        // data: the version-guarded save rejects the loser.
        wallet.debit(amount)?;
        let mut payment = Payment::create(wallet.id(), amount, PROVIDER_NAME, wallet.currency());

        let mut tx = self.store.begin().await?;
        tx.save_wallet(&mut wallet).await?;
        tx.save_payment(&mut payment).await?;
        tx.insert_ledger_entry(&LedgerEntry::debit(
            wallet.id(),
            payment.id(),
            amount,
            "Withdrawal to bank account",
        ))
        .await?;
        tx.commit().await?;

        info!(
            "Held {} kobo on wallet {} for payment {}",
            amount,
            wallet.id(),
            payment.system_reference()
        );

        // Network call to the provider, deliberately outside the
        // persistence transaction. If it fails here the held funds are
        // returned through the reversal webhook, not by this handler.
        let receipt = self
            .provider
            .initiate_transfer(&TransferInstruction {
                recipient_code,
                amount,
                reference: payment.system_reference().to_string(),
                reason: command.reason.clone(),
                currency: payment.currency().to_string(),
            })
            .await
            .map_err(|e| {
                warn!(
                    "Transfer initiation failed for payment {} after debit was committed: {}",
                    payment.system_reference(),
                    e
                );
                e
            })?;

        payment.add_provider_reference(receipt.provider_reference.clone())?;

        let mut tx = self.store.begin().await?;
        tx.save_payment(&mut payment).await?;
        tx.commit().await?;

        info!(
            "Transfer {} accepted by provider as {}",
            payment.system_reference(),
            receipt.provider_reference
        );

        Ok(WithdrawResult {
            status: "success".to_string(),
            payment: (&payment).into(),
            wallet: (&wallet).into(),
        })
    }

    /// Load the user's payout destination, registering or re-registering
    /// it with the provider when needed. A stored destination without a
    /// recipient code must never be used for a transfer.
    async fn resolve_payout_account(
        &self,
        command: &WithdrawCommand,
        currency: &str,
    ) -> AppResult<PayoutAccount> {
        let existing = self.store.payout_account_by_user(command.user_id).await?;

        match existing {
            None => {
                let recipient = self
                    .provider
                    .create_transfer_recipient(&RecipientDetails {
                        name: command.name.clone(),
                        account_number: command.account_number.clone(),
                        bank_code: command.bank_code.clone(),
                        currency: currency.to_string(),
                    })
                    .await?;

                let mut account = PayoutAccount::create(
                    command.user_id,
                    command.bank_code.clone(),
                    command.account_number.clone(),
                    recipient.account_name,
                    recipient.recipient_code,
                );

                let mut tx = self.store.begin().await?;
                tx.save_payout_account(&mut account).await?;
                tx.commit().await?;

                info!("Registered payout destination for user {}", command.user_id);
                Ok(account)
            }
            Some(account) if account.recipient_code().is_none() => Err(AppError::PayoutAccount(
                "payout destination has no confirmed provider recipient code".to_string(),
            )),
            Some(mut account)
                if account.destination_differs(&command.bank_code, &command.account_number) =>
            {
                let recipient = self
                    .provider
                    .create_transfer_recipient(&RecipientDetails {
                        name: command.name.clone(),
                        account_number: command.account_number.clone(),
                        bank_code: command.bank_code.clone(),
                        currency: currency.to_string(),
                    })
                    .await?;

                account.update_destination(
                    command.bank_code.clone(),
                    command.account_number.clone(),
                    recipient.account_name,
                    recipient.recipient_code,
                );

                let mut tx = self.store.begin().await?;
                tx.save_payout_account(&mut account).await?;
                tx.commit().await?;

                info!(
                    "Re-registered payout destination for user {}",
                    command.user_id
                );
                Ok(account)
            }
            Some(account) => Ok(account),
        }
    }
}

//! Fund Handler
//!
//! Initializes a wallet deposit: creates the wallet lazily on first use,
//! records a pending payment, and returns the provider's hosted-checkout
//! session. Settlement happens exclusively through the `charge.success`
//! webhook.

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, Kobo, Payment, Wallet};
use crate::error::AppResult;
use crate::provider::PaymentProvider;
use crate::store::BillingStore;

use super::{FundCommand, FundResult, PROVIDER_NAME};

/// Handler for deposit initialization
pub struct FundHandler<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    currency: String,
}

impl<S, P> FundHandler<S, P>
where
    S: BillingStore,
    P: PaymentProvider,
{
    pub fn new(store: Arc<S>, provider: Arc<P>, currency: impl Into<String>) -> Self {
        Self {
            store,
            provider,
            currency: currency.into(),
        }
    }

    /// Execute the fund command
    pub async fn execute(&self, command: FundCommand) -> AppResult<FundResult> {
        let amount = Kobo::from_major(command.amount).map_err(DomainError::from)?;

        let (mut wallet, wallet_is_new) = match self.store.wallet_by_user(command.user_id).await? {
            Some(wallet) => (wallet, false),
            None => (Wallet::create(command.user_id, self.currency.clone()), true),
        };

        let mut payment = Payment::create(wallet.id(), amount, PROVIDER_NAME, wallet.currency());

        let session = self
            .provider
            .initialize_payment(&command.email, amount, payment.system_reference())
            .await?;

        let mut tx = self.store.begin().await?;
        if wallet_is_new {
            tx.save_wallet(&mut wallet).await?;
        }
        tx.save_payment(&mut payment).await?;
        tx.commit().await?;

        info!(
            "Initialized deposit {} of {} kobo for wallet {}",
            payment.system_reference(),
            amount,
            wallet.id()
        );

        Ok(FundResult {
            status: "success".to_string(),
            authorization_url: session.authorization_url,
            access_code: session.access_code,
            reference: session.reference,
            payment: (&payment).into(),
        })
    }
}

//! Paystack integration
//!
//! HTTP adapter for the Paystack REST API: hosted checkout, charge
//! verification, transfer recipients and transfers. All amounts on the
//! wire are integer kobo. Webhook payloads are authenticated with an
//! HMAC-SHA512 signature over the raw body.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha512;
use tracing::info;

use crate::domain::Kobo;

use super::{
    ChargeVerification, CheckoutSession, PaymentProvider, ProviderError, RecipientDetails,
    TransferInstruction, TransferReceipt, TransferRecipient,
};

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

type HmacSha512 = Hmac<Sha512>;

/// Paystack API client
#[derive(Debug, Clone)]
pub struct PaystackClient {
    base_url: String,
    secret_key: String,
    http: Client,
}

/// Paystack wraps every response in the same envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct RecipientData {
    recipient_code: String,
    details: RecipientDetailsData,
}

#[derive(Debug, Deserialize)]
struct RecipientDetailsData {
    account_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransferData {
    transfer_code: String,
    status: String,
}

impl PaystackClient {
    pub fn new(
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let secret_key = secret_key.into();
        if secret_key.is_empty() {
            return Err(ProviderError::MissingConfig(
                "PAYSTACK_SECRET_KEY".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            secret_key,
            http,
        })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let secret_key = std::env::var("PAYSTACK_SECRET_KEY")
            .map_err(|_| ProviderError::MissingConfig("PAYSTACK_SECRET_KEY".to_string()))?;
        let base_url =
            std::env::var("PAYSTACK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(secret_key, base_url)
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Self::unwrap_envelope(path, response).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Self::unwrap_envelope(path, response).await
    }

    async fn unwrap_envelope<T: for<'de> Deserialize<'de>>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let http_status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("{path}: {e} (HTTP {http_status})"))
        })?;

        if !envelope.status {
            return Err(ProviderError::Declined(envelope.message));
        }

        envelope
            .data
            .ok_or_else(|| ProviderError::InvalidResponse(format!("{path}: missing data")))
    }
}

#[async_trait]
impl PaymentProvider for PaystackClient {
    async fn initialize_payment(
        &self,
        email: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<CheckoutSession, ProviderError> {
        let data: InitializeData = self
            .post(
                "/transaction/initialize",
                json!({
                    "email": email,
                    "amount": amount.value(),
                    "reference": reference,
                }),
            )
            .await?;

        info!(reference = %data.reference, "Initialized provider checkout session");

        Ok(CheckoutSession {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify_payment(&self, reference: &str) -> Result<ChargeVerification, ProviderError> {
        let data: VerifyData = self
            .get(&format!("/transaction/verify/{reference}"))
            .await?;

        Ok(ChargeVerification {
            succeeded: data.status == "success",
            amount_kobo: data.amount,
            reference: data.reference,
        })
    }

    async fn create_transfer_recipient(
        &self,
        details: &RecipientDetails,
    ) -> Result<TransferRecipient, ProviderError> {
        let data: RecipientData = self
            .post(
                "/transferrecipient",
                json!({
                    "type": "nuban",
                    "name": details.name,
                    "account_number": details.account_number,
                    "bank_code": details.bank_code,
                    "currency": details.currency,
                }),
            )
            .await?;

        info!(recipient_code = %data.recipient_code, "Registered transfer recipient");

        Ok(TransferRecipient {
            recipient_code: data.recipient_code,
            account_name: data
                .details
                .account_name
                .unwrap_or_else(|| details.name.clone()),
        })
    }

    async fn initiate_transfer(
        &self,
        instruction: &TransferInstruction,
    ) -> Result<TransferReceipt, ProviderError> {
        let data: TransferData = self
            .post(
                "/transfer",
                json!({
                    "source": "balance",
                    "recipient": instruction.recipient_code,
                    "amount": instruction.amount.value(),
                    "reference": instruction.reference,
                    "reason": instruction.reason,
                    "currency": instruction.currency,
                }),
            )
            .await?;

        info!(
            transfer_code = %data.transfer_code,
            status = %data.status,
            "Initiated provider transfer"
        );

        Ok(TransferReceipt {
            provider_reference: data.transfer_code,
            status: data.status,
            message: None,
        })
    }

    fn validate_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        let mut mac = match HmacSha512::new_from_slice(self.secret_key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }
}

/// Constant-time byte comparison to keep signature checks timing-safe.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

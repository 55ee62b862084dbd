//! API Routes
//!
//! HTTP endpoint definitions. Routes stay thin: each constructs a handler
//! over the Postgres store and delegates. The webhook route authenticates
//! the raw payload signature before anything is parsed or dispatched.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{EntryType, LedgerEntry};
use crate::error::AppError;
use crate::handlers::{
    FundCommand, FundHandler, FundResult, WalletView, WebhookEvent, WebhookHandler,
    WebhookOutcome, WithdrawCommand, WithdrawHandler, WithdrawResult,
};
use crate::provider::{PaymentProvider, PaystackClient};
use crate::store::{LedgerRepository, PgStore, WalletRepository};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub provider: Arc<PaystackClient>,
    pub currency: String,
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: Uuid,
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
    pub amount: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub user_id: Uuid,
    pub email: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: WebhookOutcome,
}

#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub payment_id: Option<Uuid>,
    pub amount_kobo: i64,
    pub entry_type: EntryType,
    pub reference: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            payment_id: entry.payment_id,
            amount_kobo: entry.amount_kobo,
            entry_type: entry.entry_type,
            reference: entry.reference,
            description: entry.description,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletTransactionsResponse {
    pub wallet_id: Uuid,
    pub entries: Vec<LedgerEntryResponse>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/wallet/withdraw", post(withdraw))
        .route("/wallet/fund", post(fund))
        .route("/wallets/:user_id", get(get_wallet))
        .route("/wallets/:user_id/transactions", get(get_wallet_transactions))
        .route("/webhooks/paystack", post(paystack_webhook))
}

// =========================================================================
// POST /wallet/withdraw
// =========================================================================

/// Withdraw wallet funds to a bank account
async fn withdraw(
    State(state): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResult>, AppError> {
    let store = Arc::new(PgStore::new(state.pool.clone()));
    let handler = WithdrawHandler::new(store, state.provider.clone());

    let command = WithdrawCommand::new(
        request.user_id,
        request.name,
        request.account_number,
        request.bank_code,
        request.amount,
    );
    let command = match request.reason {
        Some(reason) => command.with_reason(reason),
        None => command,
    };

    let result = handler.execute(command).await?;
    Ok(Json(result))
}

// =========================================================================
// POST /wallet/fund
// =========================================================================

/// Initialize a wallet deposit
async fn fund(
    State(state): State<AppState>,
    Json(request): Json<FundRequest>,
) -> Result<(StatusCode, Json<FundResult>), AppError> {
    let store = Arc::new(PgStore::new(state.pool.clone()));
    let handler = FundHandler::new(store, state.provider.clone(), state.currency.clone());

    let result = handler
        .execute(FundCommand::new(
            request.user_id,
            request.email,
            request.amount,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

// =========================================================================
// GET /wallets/:user_id
// =========================================================================

/// Get a user's wallet balances
async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<WalletView>, AppError> {
    let store = PgStore::new(state.pool.clone());

    let wallet = store
        .wallet_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::WalletNotFound(user_id.to_string()))?;

    Ok(Json(WalletView::from(&wallet)))
}

// =========================================================================
// GET /wallets/:user_id/transactions
// =========================================================================

/// List a wallet's ledger entries, newest first
async fn get_wallet_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<WalletTransactionsResponse>, AppError> {
    let store = PgStore::new(state.pool.clone());

    let wallet = store
        .wallet_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::WalletNotFound(user_id.to_string()))?;

    let entries = store.entries_for_wallet(wallet.id()).await?;

    Ok(Json(WalletTransactionsResponse {
        wallet_id: wallet.id(),
        entries: entries.into_iter().map(Into::into).collect(),
    }))
}

// =========================================================================
// POST /webhooks/paystack
// =========================================================================

/// Receive a provider webhook. The signature over the raw body is checked
/// before the event reaches the reconciliation handler.
async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    if !state.provider.validate_webhook_signature(&body, signature) {
        return Err(AppError::InvalidSignature);
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(format!("malformed webhook payload: {e}")))?;

    let store = Arc::new(PgStore::new(state.pool.clone()));
    let handler = WebhookHandler::new(store, state.provider.clone());

    let status = handler.execute(event).await?;
    Ok(Json(WebhookResponse { status }))
}

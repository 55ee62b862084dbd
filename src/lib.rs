//! gig_billing Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod provider;
pub mod store;

// Private modules (used only by main.rs binary)
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{
    Balance, DomainError, EntryType, Kobo, LedgerEntry, MoneyError, Payment, PaymentStatus,
    PayoutAccount, Wallet,
};
pub use error::{AppError, AppResult};
pub use handlers::{
    FundCommand, FundHandler, WebhookEvent, WebhookHandler, WebhookOutcome, WithdrawCommand,
    WithdrawHandler,
};

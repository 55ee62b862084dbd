//! Domain module
//!
//! Core domain types and business logic.

pub mod error;
pub mod money;
pub mod payment;
pub mod payout_account;
pub mod transaction;
pub mod wallet;

pub use error::DomainError;
pub use money::{Balance, Kobo, MoneyError};
pub use payment::{Payment, PaymentSnapshot, PaymentStatus};
pub use payout_account::{PayoutAccount, PayoutAccountSnapshot};
pub use transaction::{EntryType, LedgerEntry};
pub use wallet::{Wallet, WalletSnapshot};

//! Command Handlers module
//!
//! Use-case handlers that orchestrate business operations. Each handler
//! coordinates aggregates, the store ports, and the payment provider.

mod commands;
mod fund_handler;
mod webhook_handler;
mod withdraw_handler;


pub use commands::*;
pub use fund_handler::FundHandler;
pub use webhook_handler::WebhookHandler;
pub use withdraw_handler::WithdrawHandler;

/// Name of the transfer provider payments are routed through.
pub const PROVIDER_NAME: &str = "paystack";

//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account state and the orders it owns
//! - `command`: Typed commands, quotes and identifiers
//! - `error`: Error types for the trading ledger

pub mod account;
pub mod command;
pub mod error;

pub use account::{Account, PendingOrder, Side, StandingAmount, StandingOrder};
pub use command::{Command, CommandRecord, Quote, Shares, Symbol, TransactionId, UserId};
pub use error::LedgerError;

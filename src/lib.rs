//! Rust Trading Ledger Library
//! # Overview
//!
//! This library provides the account ledger of a brokerage back end: cash
//! deposits, reserve-then-commit buy and sell orders, and standing orders
//! that fire on price quotes. Commands are replayed from a CSV script with
//! either a sync or an async strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Command, LedgerError, etc.)
//! - [`cli`] - CLI arguments parsing and log setup
//! - [`core`] - Business logic components:
//!   - [`core::account_store`] - Per-account locked storage
//!   - [`core::engine`] - The single mutation surface, with audit reporting
//!   - [`core::standing_orders`] - Standing orders and trigger evaluation
//!   - [`core::audit`] - Audit events and sinks
//!   - [`core::batch_processor`] - Concurrent batch execution
//! - [`io`] - CSV command reading and report writing
//! - [`strategy`] - Sync and async processing pipelines
//!
//! # Commands
//!
//! - **authenticate**: Create the user's account if it does not exist
//! - **add**: Deposit cash
//! - **buy / sell**: Reserve cash or shares for an immediate order
//! - **commit / cancel**: Settle or release the pending order on one side
//! - **set amount / set trigger / cancel set**: Manage standing orders
//! - **quote**: Price update that may fire armed standing orders
//!
//! # Account State
//!
//! Each account maintains:
//! - `balance`: Total cash, including reserved cash
//! - `available`: Cash not reserved by a pending or standing buy
//! - `holdings`: Settled shares per symbol
//! - `reserved_for_sale`: Shares held out by pending or standing sells

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{AccountStore, AuditEvent, AuditKind, AuditSink, Fill, TradingEngine};
pub use io::write_accounts_csv;
pub use types::{
    Account, Command, CommandRecord, LedgerError, PendingOrder, Quote, Shares, Side,
    StandingAmount, StandingOrder, Symbol, TransactionId, UserId,
};

//! Core business logic module
//!
//! This module contains the ledger and its orchestration:
//! - `ledger` - Deposits and the checked arithmetic shared by every mutation
//! - `order_lifecycle` - Reserve, commit and cancel for immediate orders
//! - `standing_orders` - Standing reservations, triggers and evaluation
//! - `account_store` - Per-account locked storage
//! - `engine` - The single mutation surface, with audit reporting
//! - `audit` - Audit events and sinks
//! - `batch_processor` - Concurrent batch execution for the async strategy

pub mod account_store;
pub mod audit;
pub mod batch_processor;
pub mod engine;
mod ledger;
mod order_lifecycle;
pub mod standing_orders;

pub use account_store::AccountStore;
pub use audit::{
    AuditEvent, AuditKind, AuditSink, AuditWorker, ChannelAuditSink, MemoryAuditSink,
    TracingAuditSink,
};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use engine::TradingEngine;
pub use standing_orders::Fill;

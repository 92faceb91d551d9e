//! Error types for the trading ledger
//!
//! This module defines all error types that can occur while reading commands
//! and applying them to the ledger. Errors are designed to be descriptive for
//! log output.
//!
//! # Error Categories
//!
//! - **File I/O Errors**: File not found, permission denied, etc.
//! - **Input Errors**: Malformed CSV, unknown commands, missing or invalid fields
//! - **Ledger Errors**: Unknown account, insufficient funds or stock, nothing to
//!   commit or cancel
//! - **Arithmetic Errors**: Overflow in balance or position calculations
//!
//! Ledger errors are always returned before any account field is written, so a
//! failed operation never leaves an account partially updated.

use super::account::Side;
use super::command::{Shares, TransactionId};
use rust_decimal::Decimal;
use std::fmt::Display;
use thiserror::Error;

/// Main error type for the trading ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// File not found at the specified path
    ///
    /// This is a fatal error that prevents processing from starting.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// This is a recoverable error - the malformed row is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The command name is not one the ledger understands
    #[error("Unknown command '{command}' for transaction {tx}")]
    UnknownCommand { command: String, tx: TransactionId },

    /// A field required by the command is absent
    #[error("{command} transaction {tx} requires a {field}")]
    MissingField {
        command: String,
        field: &'static str,
        tx: TransactionId,
    },

    /// A field is present but cannot be parsed
    #[error("Invalid {field} '{value}' for transaction {tx}")]
    InvalidField {
        field: &'static str,
        value: String,
        tx: TransactionId,
    },

    /// No account exists for the user
    #[error("Account not found for user {user}")]
    NotFound { user: String },

    /// Non-positive cash amount, share quantity or price
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount { operation: String, amount: String },

    /// Reservation exceeds available cash
    ///
    /// The account state remains unchanged.
    #[error("Insufficient funds for user {user}: available {available}, requested {requested}")]
    InsufficientFunds {
        user: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Reservation exceeds sellable shares
    #[error("Insufficient stock {stock} for user {user}: sellable {available}, requested {requested}")]
    InsufficientStock {
        user: String,
        stock: String,
        available: Shares,
        requested: Shares,
    },

    /// Commit or cancel with nothing pending on that side
    #[error("No pending {side} order for user {user}")]
    NoPendingOrder { user: String, side: Side },

    /// Trigger or cancel on a standing order that does not exist
    #[error("No standing {side} order on {stock} for user {user}")]
    NoStandingOrder {
        user: String,
        stock: String,
        side: Side,
    },

    /// Arithmetic overflow would occur
    ///
    /// The operation is rejected to maintain account integrity.
    #[error("Arithmetic overflow in {operation} for user {user}")]
    ArithmeticOverflow { operation: String, user: String },
}

// Conversion from io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LedgerError
impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn not_found(user: &str) -> Self {
        LedgerError::NotFound {
            user: user.to_string(),
        }
    }

    pub fn invalid_amount(operation: &str, amount: impl Display) -> Self {
        LedgerError::InvalidAmount {
            operation: operation.to_string(),
            amount: amount.to_string(),
        }
    }

    pub fn insufficient_funds(user: &str, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            user: user.to_string(),
            available,
            requested,
        }
    }

    pub fn insufficient_stock(
        user: &str,
        stock: &str,
        available: Shares,
        requested: Shares,
    ) -> Self {
        LedgerError::InsufficientStock {
            user: user.to_string(),
            stock: stock.to_string(),
            available,
            requested,
        }
    }

    pub fn no_pending_order(user: &str, side: Side) -> Self {
        LedgerError::NoPendingOrder {
            user: user.to_string(),
            side,
        }
    }

    pub fn no_standing_order(user: &str, stock: &str, side: Side) -> Self {
        LedgerError::NoStandingOrder {
            user: user.to_string(),
            stock: stock.to_string(),
            side,
        }
    }

    pub fn arithmetic_overflow(operation: &str, user: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            user: user.to_string(),
        }
    }

    pub fn unknown_command(command: &str, tx: TransactionId) -> Self {
        LedgerError::UnknownCommand {
            command: command.to_string(),
            tx,
        }
    }

    pub fn missing_field(command: &str, field: &'static str, tx: TransactionId) -> Self {
        LedgerError::MissingField {
            command: command.to_string(),
            field,
            tx,
        }
    }

    pub fn invalid_field(field: &'static str, value: &str, tx: TransactionId) -> Self {
        LedgerError::InvalidField {
            field,
            value: value.to_string(),
            tx,
        }
    }
}

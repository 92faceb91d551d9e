//! Command types for the trading ledger
//!
//! Every user-facing action is a variant of [`Command`], validated when it is
//! built (see `io::csv_format`) so that the engine only ever dispatches
//! well-formed requests.

use super::account::{Side, StandingAmount};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// User identifier
pub type UserId = String;

/// Stock symbol
pub type Symbol = String;

/// Caller-supplied transaction identifier
///
/// Used for correlation and auditing only; the ledger does not de-duplicate.
pub type TransactionId = u64;

/// Whole number of shares
pub type Shares = u64;

/// A price observation from the market-data source
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub stock: Symbol,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Create a quote stamped with the current time
    pub fn new(stock: impl Into<Symbol>, price: Decimal) -> Self {
        Self {
            stock: stock.into(),
            price,
            timestamp: Utc::now(),
        }
    }
}

/// A typed request against the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// First contact from a user; creates the account if needed
    Authenticate { user: UserId },

    /// Add cash to the account
    Deposit { user: UserId, amount: Decimal },

    /// Reserve cash for an immediate buy
    Buy {
        user: UserId,
        stock: Symbol,
        amount: Decimal,
        quantity: Shares,
    },
    CommitBuy { user: UserId },
    CancelBuy { user: UserId },

    /// Reserve shares for an immediate sell
    Sell {
        user: UserId,
        stock: Symbol,
        amount: Decimal,
        quantity: Shares,
    },
    CommitSell { user: UserId },
    CancelSell { user: UserId },

    /// Reserve cash or shares for a standing order
    SetStandingAmount {
        user: UserId,
        stock: Symbol,
        amount: StandingAmount,
    },

    /// Arm a standing order with a trigger price
    SetTrigger {
        user: UserId,
        stock: Symbol,
        side: Side,
        price: Decimal,
    },

    /// Drop a standing order and release its reservation
    CancelStanding {
        user: UserId,
        stock: Symbol,
        side: Side,
    },

    /// Price update from the quote source
    Quote(Quote),
}

impl Command {
    /// The user this command acts on, `None` for market-wide commands
    pub fn user(&self) -> Option<&str> {
        match self {
            Command::Authenticate { user }
            | Command::Deposit { user, .. }
            | Command::Buy { user, .. }
            | Command::CommitBuy { user }
            | Command::CancelBuy { user }
            | Command::Sell { user, .. }
            | Command::CommitSell { user }
            | Command::CancelSell { user }
            | Command::SetStandingAmount { user, .. }
            | Command::SetTrigger { user, .. }
            | Command::CancelStanding { user, .. } => Some(user),
            Command::Quote(_) => None,
        }
    }

    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Authenticate { .. } => "authenticate",
            Command::Deposit { .. } => "add",
            Command::Buy { .. } => "buy",
            Command::CommitBuy { .. } => "commit_buy",
            Command::CancelBuy { .. } => "cancel_buy",
            Command::Sell { .. } => "sell",
            Command::CommitSell { .. } => "commit_sell",
            Command::CancelSell { .. } => "cancel_sell",
            Command::SetStandingAmount { amount, .. } => match amount.side() {
                Side::Buy => "set_buy_amount",
                Side::Sell => "set_sell_amount",
            },
            Command::SetTrigger { side, .. } => match side {
                Side::Buy => "set_buy_trigger",
                Side::Sell => "set_sell_trigger",
            },
            Command::CancelStanding { side, .. } => match side {
                Side::Buy => "cancel_set_buy",
                Side::Sell => "cancel_set_sell",
            },
            Command::Quote(_) => "quote",
        }
    }
}

/// A command together with its transaction id, as read from the input
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    pub tx: TransactionId,
    pub command: Command,
}

//! Account-related types for the trading ledger
//!
//! This module defines the Account structure together with the order records
//! an account owns (pending immediate orders and standing conditional orders).
//! The mutation rules live in `core::order_lifecycle` and
//! `core::standing_orders`; this module only carries state and read-only views.

use super::command::{Shares, Symbol, TransactionId, UserId};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

/// Direction of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// An immediate order awaiting commit or cancel
///
/// For a buy, `amount` is the cash taken out of `available`. For a sell,
/// `quantity` is the number of shares held out of the sellable position and
/// `amount` is the cash credited on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub tx: TransactionId,
    pub stock: Symbol,
    pub amount: Decimal,
    pub quantity: Shares,
}

/// What a standing order keeps in reserve
///
/// The direction is carried by the variant: a standing buy reserves cash,
/// a standing sell reserves shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandingAmount {
    Buy(Decimal),
    Sell(Shares),
}

impl StandingAmount {
    pub fn side(&self) -> Side {
        match self {
            StandingAmount::Buy(_) => Side::Buy,
            StandingAmount::Sell(_) => Side::Sell,
        }
    }
}

/// A persistent conditional order
///
/// The order is armed once `trigger_price` is set; until then it only holds
/// its reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingOrder {
    pub tx: TransactionId,
    pub stock: Symbol,
    pub amount: StandingAmount,
    pub trigger_price: Option<Decimal>,
}

impl StandingOrder {
    pub fn side(&self) -> Side {
        self.amount.side()
    }

    pub fn is_armed(&self) -> bool {
        self.trigger_price.is_some()
    }
}

/// Client account state
///
/// Cash moves between `available` and reserved (the difference
/// `balance - available`); shares move between sellable and
/// `reserved_for_sale`. Only the ledger primitives write these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The user this account belongs to
    pub user: UserId,

    /// Total cash owned, including reserved cash
    pub balance: Decimal,

    /// Cash not reserved by a pending or standing buy
    ///
    /// Always satisfies `0 <= available <= balance`.
    pub available: Decimal,

    /// Settled shares per symbol. Symbols are removed when they reach zero.
    pub holdings: BTreeMap<Symbol, Shares>,

    /// Shares earmarked by a pending or standing sell
    pub reserved_for_sale: BTreeMap<Symbol, Shares>,

    pub pending_buy: Option<PendingOrder>,
    pub pending_sell: Option<PendingOrder>,

    /// Standing orders keyed by symbol and direction
    pub standing_orders: BTreeMap<(Symbol, Side), StandingOrder>,
}

impl Account {
    /// Create a new account with zero cash and no positions or orders
    pub fn new(user: impl Into<UserId>) -> Self {
        Account {
            user: user.into(),
            balance: Decimal::ZERO,
            available: Decimal::ZERO,
            holdings: BTreeMap::new(),
            reserved_for_sale: BTreeMap::new(),
            pending_buy: None,
            pending_sell: None,
            standing_orders: BTreeMap::new(),
        }
    }

    /// Settled shares of `stock`, including reserved ones
    pub fn holding(&self, stock: &str) -> Shares {
        self.holdings.get(stock).copied().unwrap_or(0)
    }

    /// Shares of `stock` currently held out by pending or standing sells
    pub fn reserved_shares(&self, stock: &str) -> Shares {
        self.reserved_for_sale.get(stock).copied().unwrap_or(0)
    }

    /// Shares of `stock` that can still be reserved for sale
    pub fn sellable(&self, stock: &str) -> Shares {
        self.holding(stock)
            .saturating_sub(self.reserved_shares(stock))
    }

    /// Whether `quantity` shares of `stock` are owned and not reserved
    pub fn has_stock(&self, stock: &str, quantity: Shares) -> bool {
        quantity <= self.sellable(stock)
    }

    /// Cash held by the pending buy and all standing buys
    pub fn reserved_cash(&self) -> Decimal {
        let pending = self
            .pending_buy
            .as_ref()
            .map(|order| order.amount)
            .unwrap_or(Decimal::ZERO);

        self.standing_orders
            .values()
            .filter_map(|order| match order.amount {
                StandingAmount::Buy(amount) => Some(amount),
                StandingAmount::Sell(_) => None,
            })
            .fold(pending, |total, amount| total + amount)
    }

    pub fn standing_order(&self, stock: &str, side: Side) -> Option<&StandingOrder> {
        self.standing_orders.get(&(stock.to_string(), side))
    }
}

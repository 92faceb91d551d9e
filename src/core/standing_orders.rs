//! Standing orders and trigger evaluation
//!
//! A standing order reserves cash (buy) or shares (sell) indefinitely, keyed by
//! stock and direction. Once a trigger price is set the order is armed, and
//! [`Account::evaluate`] turns it into a trade the first time a quote crosses
//! the trigger:
//!
//! - a buy fires when `price <= trigger`, spending as many whole shares as the
//!   reserved cash covers and returning the remainder to `available`
//! - a sell fires when `price >= trigger`, selling every reserved share
//!
//! A fired order is removed, so it can only fire once.

use super::ledger::{ensure_positive_cash, ensure_positive_quantity};
use crate::types::{
    Account, LedgerError, Shares, Side, StandingAmount, StandingOrder, Symbol, TransactionId,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Settlement produced by a standing order that fired
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Transaction id of the standing order's reservation
    pub tx: TransactionId,
    pub stock: Symbol,
    pub side: Side,
    /// Execution price
    pub price: Decimal,
    /// Shares bought or sold
    pub quantity: Shares,
    /// Cash paid for a buy or received for a sell
    pub amount: Decimal,
    /// Reserved cash returned to `available` (buys only)
    pub refunded: Decimal,
}

impl Account {
    /// Reserve cash or shares for a standing order on `stock`
    ///
    /// A previous standing order for the same stock and direction is replaced:
    /// its reservation is released first and the new one is validated against
    /// the released state. The previous trigger price carries over.
    ///
    /// # Returns
    ///
    /// The standing order this call replaced, if any.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a non-positive cash amount or a zero quantity
    /// - `InsufficientFunds` / `InsufficientStock` if the reservation cannot
    ///   be covered
    pub fn set_standing_amount(
        &mut self,
        stock: &str,
        amount: StandingAmount,
        tx: TransactionId,
    ) -> Result<Option<StandingOrder>, LedgerError> {
        let key = (stock.to_string(), amount.side());
        let prior = self.standing_orders.get(&key);
        let trigger_price = prior.and_then(|order| order.trigger_price);

        match amount {
            StandingAmount::Buy(cash) => {
                ensure_positive_cash("set_buy_amount", cash)?;

                let refund = match prior.map(|order| order.amount) {
                    Some(StandingAmount::Buy(reserved)) => reserved,
                    _ => Decimal::ZERO,
                };
                let spendable = self.add_cash("set_buy_amount", self.available, refund)?;
                if cash > spendable {
                    return Err(LedgerError::insufficient_funds(&self.user, spendable, cash));
                }
                self.available = self.sub_cash("set_buy_amount", spendable, cash)?;
            }
            StandingAmount::Sell(quantity) => {
                ensure_positive_quantity("set_sell_amount", quantity)?;

                let released = match prior.map(|order| order.amount) {
                    Some(StandingAmount::Sell(reserved)) => reserved,
                    _ => 0,
                };
                let reserved = self.reserved_shares(stock) - released;
                let sellable = self.holding(stock).saturating_sub(reserved);
                if quantity > sellable {
                    return Err(LedgerError::insufficient_stock(
                        &self.user, stock, sellable, quantity,
                    ));
                }
                let reserved = self.add_shares("set_sell_amount", reserved, quantity)?;
                self.set_reserved(stock, reserved);
            }
        }

        Ok(self.standing_orders.insert(
            key,
            StandingOrder {
                tx,
                stock: stock.to_string(),
                amount,
                trigger_price,
            },
        ))
    }

    /// Arm the standing order for `stock` and `side` at `price`
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `price <= 0`
    /// - `NoStandingOrder` if nothing has been reserved for that stock and side
    pub fn set_trigger(&mut self, stock: &str, side: Side, price: Decimal) -> Result<(), LedgerError> {
        let operation = match side {
            Side::Buy => "set_buy_trigger",
            Side::Sell => "set_sell_trigger",
        };
        ensure_positive_cash(operation, price)?;

        let user = &self.user;
        let order = self
            .standing_orders
            .get_mut(&(stock.to_string(), side))
            .ok_or_else(|| LedgerError::no_standing_order(user, stock, side))?;

        order.trigger_price = Some(price);
        Ok(())
    }

    /// Remove the standing order for `stock` and `side`, releasing its reservation
    ///
    /// # Errors
    ///
    /// `NoStandingOrder` if there is none.
    pub fn cancel_standing(&mut self, stock: &str, side: Side) -> Result<StandingOrder, LedgerError> {
        let key = (stock.to_string(), side);
        let order = self
            .standing_orders
            .get(&key)
            .cloned()
            .ok_or_else(|| LedgerError::no_standing_order(&self.user, stock, side))?;

        match order.amount {
            StandingAmount::Buy(cash) => {
                self.available = self.add_cash("cancel_standing", self.available, cash)?;
            }
            StandingAmount::Sell(quantity) => {
                let reserved = self.reserved_shares(stock) - quantity;
                self.set_reserved(stock, reserved);
            }
        }

        self.standing_orders.remove(&key);
        Ok(order)
    }

    /// Check the armed standing orders on `stock` against a quote
    ///
    /// Both directions are checked; each order that fires is settled at
    /// `price` and removed. Orders that are not armed, or whose condition does
    /// not hold, are left alone. A buy whose reservation cannot cover a single
    /// share at `price` stays armed.
    ///
    /// # Returns
    ///
    /// The fills produced, buy before sell.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if `price <= 0`, or `ArithmeticOverflow`. On error no
    /// order has fired.
    pub fn evaluate(&mut self, stock: &str, price: Decimal) -> Result<Vec<Fill>, LedgerError> {
        ensure_positive_cash("quote", price)?;

        let mut staged = self.clone();
        let mut fills = Vec::new();

        if let Some(fill) = staged.fire_buy(stock, price)? {
            fills.push(fill);
        }
        if let Some(fill) = staged.fire_sell(stock, price)? {
            fills.push(fill);
        }

        if !fills.is_empty() {
            *self = staged;
        }
        Ok(fills)
    }

    fn armed(&self, stock: &str, side: Side) -> Option<(StandingOrder, Decimal)> {
        let order = self.standing_order(stock, side)?;
        order.trigger_price.map(|trigger| (order.clone(), trigger))
    }

    fn fire_buy(&mut self, stock: &str, price: Decimal) -> Result<Option<Fill>, LedgerError> {
        let Some((order, trigger)) = self.armed(stock, Side::Buy) else {
            return Ok(None);
        };
        let StandingAmount::Buy(reserved) = order.amount else {
            return Ok(None);
        };
        if price > trigger {
            return Ok(None);
        }

        let overflow = || LedgerError::arithmetic_overflow("trigger_buy", &self.user);
        let quantity = reserved
            .checked_div(price)
            .map(|shares| shares.floor())
            .and_then(|shares| shares.to_u64())
            .ok_or_else(overflow)?;
        if quantity == 0 {
            return Ok(None);
        }

        let cost = price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(overflow)?;
        let refunded = self.sub_cash("trigger_buy", reserved, cost)?;
        let balance = self.sub_cash("trigger_buy", self.balance, cost)?;
        let available = self.add_cash("trigger_buy", self.available, refunded)?;
        let holding = self.add_shares("trigger_buy", self.holding(stock), quantity)?;

        self.balance = balance;
        self.available = available;
        self.set_holding(stock, holding);
        self.standing_orders.remove(&(stock.to_string(), Side::Buy));

        Ok(Some(Fill {
            tx: order.tx,
            stock: stock.to_string(),
            side: Side::Buy,
            price,
            quantity,
            amount: cost,
            refunded,
        }))
    }

    fn fire_sell(&mut self, stock: &str, price: Decimal) -> Result<Option<Fill>, LedgerError> {
        let Some((order, trigger)) = self.armed(stock, Side::Sell) else {
            return Ok(None);
        };
        let StandingAmount::Sell(quantity) = order.amount else {
            return Ok(None);
        };
        if price < trigger {
            return Ok(None);
        }

        let proceeds = price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| LedgerError::arithmetic_overflow("trigger_sell", &self.user))?;
        let balance = self.add_cash("trigger_sell", self.balance, proceeds)?;
        let available = self.add_cash("trigger_sell", self.available, proceeds)?;
        let holding = self.holding(stock) - quantity;
        let reserved = self.reserved_shares(stock) - quantity;

        self.balance = balance;
        self.available = available;
        self.set_holding(stock, holding);
        self.set_reserved(stock, reserved);
        self.standing_orders.remove(&(stock.to_string(), Side::Sell));

        Ok(Some(Fill {
            tx: order.tx,
            stock: stock.to_string(),
            side: Side::Sell,
            price,
            quantity,
            amount: proceeds,
            refunded: Decimal::ZERO,
        }))
    }
}

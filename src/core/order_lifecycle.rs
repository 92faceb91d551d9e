//! Immediate buy and sell orders
//!
//! Each side of an account runs the state machine
//! `Idle -> Pending -> {Committed, Canceled} -> Idle`:
//!
//! - **reserve**: a buy takes cash out of `available`, a sell earmarks shares
//!   in `reserved_for_sale`; `balance` and `holdings` are untouched
//! - **commit**: settles the reservation into `balance` and `holdings`
//! - **cancel**: releases the reservation with no settlement effect
//!
//! Only one order per side can be pending. Reserving again replaces the
//! pending order: its reservation is released and the new one is taken in a
//! single step, validated against the state after the release. The replaced
//! order is returned so the caller can report it as canceled.

use super::ledger::{ensure_positive_cash, ensure_positive_quantity};
use crate::types::{Account, LedgerError, PendingOrder, Shares, Side, TransactionId};
use rust_decimal::Decimal;

impl Account {
    /// Reserve cash for an immediate buy
    ///
    /// # Returns
    ///
    /// The pending buy this reservation replaced, if any.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0` or `quantity == 0`
    /// - `InsufficientFunds` if `amount` exceeds available cash (including the
    ///   refund of a replaced pending buy)
    pub fn reserve_buy(
        &mut self,
        stock: &str,
        amount: Decimal,
        quantity: Shares,
        tx: TransactionId,
    ) -> Result<Option<PendingOrder>, LedgerError> {
        ensure_positive_cash("buy", amount)?;
        ensure_positive_quantity("buy", quantity)?;

        let refund = self
            .pending_buy
            .as_ref()
            .map_or(Decimal::ZERO, |order| order.amount);
        let spendable = self.add_cash("buy", self.available, refund)?;

        if amount > spendable {
            return Err(LedgerError::insufficient_funds(&self.user, spendable, amount));
        }
        let available = self.sub_cash("buy", spendable, amount)?;

        self.available = available;
        Ok(self.pending_buy.replace(PendingOrder {
            tx,
            stock: stock.to_string(),
            amount,
            quantity,
        }))
    }

    /// Settle the pending buy
    ///
    /// `balance` drops by the reserved cash and the shares are added to
    /// `holdings`. `available` already reflects the reservation.
    ///
    /// # Errors
    ///
    /// `NoPendingOrder` if no buy is pending.
    pub fn commit_buy(&mut self) -> Result<PendingOrder, LedgerError> {
        let order = self
            .pending_buy
            .clone()
            .ok_or_else(|| LedgerError::no_pending_order(&self.user, Side::Buy))?;

        let balance = self.sub_cash("commit_buy", self.balance, order.amount)?;
        let holding = self.add_shares("commit_buy", self.holding(&order.stock), order.quantity)?;

        self.balance = balance;
        self.set_holding(&order.stock, holding);
        self.pending_buy = None;
        Ok(order)
    }

    /// Drop the pending buy and refund its cash to `available`
    ///
    /// # Errors
    ///
    /// `NoPendingOrder` if no buy is pending.
    pub fn cancel_buy(&mut self) -> Result<PendingOrder, LedgerError> {
        let order = self
            .pending_buy
            .clone()
            .ok_or_else(|| LedgerError::no_pending_order(&self.user, Side::Buy))?;

        let available = self.add_cash("cancel_buy", self.available, order.amount)?;

        self.available = available;
        self.pending_buy = None;
        Ok(order)
    }

    /// Hold shares out of the sellable position for an immediate sell
    ///
    /// # Returns
    ///
    /// The pending sell this reservation replaced, if any.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0` or `quantity == 0`
    /// - `InsufficientStock` if `quantity` exceeds the sellable shares
    ///   (including the release of a replaced pending sell on the same stock)
    pub fn reserve_sell(
        &mut self,
        stock: &str,
        amount: Decimal,
        quantity: Shares,
        tx: TransactionId,
    ) -> Result<Option<PendingOrder>, LedgerError> {
        ensure_positive_cash("sell", amount)?;
        ensure_positive_quantity("sell", quantity)?;

        // Reserved counts for the replaced order's stock and the new stock,
        // after the replaced order is released.
        let released = self.pending_sell.as_ref().map(|order| {
            (
                order.stock.clone(),
                self.reserved_shares(&order.stock) - order.quantity,
            )
        });
        let reserved = match &released {
            Some((released_stock, remaining)) if released_stock == stock => *remaining,
            _ => self.reserved_shares(stock),
        };

        let sellable = self.holding(stock).saturating_sub(reserved);
        if quantity > sellable {
            return Err(LedgerError::insufficient_stock(
                &self.user, stock, sellable, quantity,
            ));
        }
        let reserved = self.add_shares("sell", reserved, quantity)?;

        if let Some((released_stock, remaining)) = released {
            self.set_reserved(&released_stock, remaining);
        }
        self.set_reserved(stock, reserved);
        Ok(self.pending_sell.replace(PendingOrder {
            tx,
            stock: stock.to_string(),
            amount,
            quantity,
        }))
    }

    /// Settle the pending sell
    ///
    /// The shares leave `holdings` and `reserved_for_sale`; the sale proceeds
    /// are credited to both `balance` and `available`.
    ///
    /// # Errors
    ///
    /// `NoPendingOrder` if no sell is pending.
    pub fn commit_sell(&mut self) -> Result<PendingOrder, LedgerError> {
        let order = self
            .pending_sell
            .clone()
            .ok_or_else(|| LedgerError::no_pending_order(&self.user, Side::Sell))?;

        let holding = self.holding(&order.stock) - order.quantity;
        let reserved = self.reserved_shares(&order.stock) - order.quantity;
        let balance = self.add_cash("commit_sell", self.balance, order.amount)?;
        let available = self.add_cash("commit_sell", self.available, order.amount)?;

        self.set_holding(&order.stock, holding);
        self.set_reserved(&order.stock, reserved);
        self.balance = balance;
        self.available = available;
        self.pending_sell = None;
        Ok(order)
    }

    /// Drop the pending sell and make its shares sellable again
    ///
    /// # Errors
    ///
    /// `NoPendingOrder` if no sell is pending.
    pub fn cancel_sell(&mut self) -> Result<PendingOrder, LedgerError> {
        let order = self
            .pending_sell
            .take()
            .ok_or_else(|| LedgerError::no_pending_order(&self.user, Side::Sell))?;

        let reserved = self.reserved_shares(&order.stock) - order.quantity;
        self.set_reserved(&order.stock, reserved);
        Ok(order)
    }
}

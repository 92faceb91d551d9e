//! Trading engine
//!
//! This module provides the `TradingEngine`, the single surface through which
//! accounts are mutated. Every operation resolves the user to its account,
//! runs one ledger primitive under that account's lock, releases the lock and
//! then publishes audit events.
//!
//! # Architecture
//!
//! ```text
//! TradingEngine
//!     ├── Arc<AccountStore>   (per-account locked state)
//!     └── Arc<dyn AuditSink>  (best-effort event reporting)
//! ```
//!
//! # Thread Safety
//!
//! The engine is cheap to clone and every clone shares the same store, so it
//! can be handed to threads or tokio tasks freely. Operations on one account
//! are serialized; operations on different accounts run in parallel.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::account_store::AccountStore;
use super::audit::{AuditEvent, AuditKind, AuditSink, TracingAuditSink};
use super::standing_orders::Fill;
use crate::types::{
    Account, Command, CommandRecord, LedgerError, PendingOrder, Quote, Shares, Side,
    StandingAmount, StandingOrder, TransactionId, UserId,
};

/// Brokerage ledger orchestrator
#[derive(Clone)]
pub struct TradingEngine {
    store: Arc<AccountStore>,
    audit: Arc<dyn AuditSink>,
}

impl Default for TradingEngine {
    fn default() -> Self {
        Self::new(Arc::new(TracingAuditSink))
    }
}

impl fmt::Debug for TradingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradingEngine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl TradingEngine {
    /// Create an engine with an empty account store
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self::with_store(Arc::new(AccountStore::new()), audit)
    }

    /// Create an engine over an existing store
    pub fn with_store(store: Arc<AccountStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Create the account for `user` unless it already exists
    ///
    /// # Returns
    ///
    /// The account as it is after the call; an existing account is returned
    /// unchanged.
    pub fn create_account(&self, user: &str) -> Account {
        let (account, created) = self.store.create(user);
        if created {
            tracing::debug!(user, "Account created");
        }
        account
    }

    /// Snapshot of the account for `user`
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist.
    pub fn account(&self, user: &str) -> Result<Account, LedgerError> {
        self.store.lookup(user)
    }

    /// Snapshot of every account, sorted by user id
    pub fn accounts(&self) -> Vec<Account> {
        self.store.snapshot()
    }

    pub fn deposit(&self, user: &str, amount: Decimal, tx: TransactionId) -> Result<(), LedgerError> {
        self.store
            .with_account(user, |account| account.deposit(amount))?;

        tracing::debug!(user, tx, %amount, "Deposit applied");
        self.publish(user, tx, AuditKind::Deposited { amount });
        Ok(())
    }

    /// Reserve cash for an immediate buy, replacing any pending buy
    pub fn reserve_buy(
        &self,
        user: &str,
        stock: &str,
        amount: Decimal,
        quantity: Shares,
        tx: TransactionId,
    ) -> Result<(), LedgerError> {
        let replaced = self.store.with_account(user, |account| {
            account.reserve_buy(stock, amount, quantity, tx)
        })?;

        tracing::debug!(user, tx, stock, %amount, quantity, "Buy reserved");
        if let Some(order) = replaced {
            self.publish_canceled(user, Side::Buy, order);
        }
        Ok(())
    }

    pub fn commit_buy(&self, user: &str, tx: TransactionId) -> Result<PendingOrder, LedgerError> {
        let order = self.store.with_account(user, Account::commit_buy)?;

        tracing::debug!(user, tx, order_tx = order.tx, "Buy committed");
        self.publish(
            user,
            tx,
            AuditKind::BuyCommitted {
                stock: order.stock.clone(),
                amount: order.amount,
                quantity: order.quantity,
            },
        );
        Ok(order)
    }

    pub fn cancel_buy(&self, user: &str, tx: TransactionId) -> Result<PendingOrder, LedgerError> {
        let order = self.store.with_account(user, Account::cancel_buy)?;

        tracing::debug!(user, tx, order_tx = order.tx, "Buy canceled");
        self.publish_canceled(user, Side::Buy, order.clone());
        Ok(order)
    }

    /// Reserve shares for an immediate sell, replacing any pending sell
    pub fn reserve_sell(
        &self,
        user: &str,
        stock: &str,
        amount: Decimal,
        quantity: Shares,
        tx: TransactionId,
    ) -> Result<(), LedgerError> {
        let replaced = self.store.with_account(user, |account| {
            account.reserve_sell(stock, amount, quantity, tx)
        })?;

        tracing::debug!(user, tx, stock, %amount, quantity, "Sell reserved");
        if let Some(order) = replaced {
            self.publish_canceled(user, Side::Sell, order);
        }
        Ok(())
    }

    pub fn commit_sell(&self, user: &str, tx: TransactionId) -> Result<PendingOrder, LedgerError> {
        let order = self.store.with_account(user, Account::commit_sell)?;

        tracing::debug!(user, tx, order_tx = order.tx, "Sell committed");
        self.publish(
            user,
            tx,
            AuditKind::SellCommitted {
                stock: order.stock.clone(),
                amount: order.amount,
                quantity: order.quantity,
            },
        );
        Ok(order)
    }

    pub fn cancel_sell(&self, user: &str, tx: TransactionId) -> Result<PendingOrder, LedgerError> {
        let order = self.store.with_account(user, Account::cancel_sell)?;

        tracing::debug!(user, tx, order_tx = order.tx, "Sell canceled");
        self.publish_canceled(user, Side::Sell, order.clone());
        Ok(order)
    }

    /// Reserve cash or shares for a standing order, replacing any on the same
    /// stock and side
    pub fn set_standing_amount(
        &self,
        user: &str,
        stock: &str,
        amount: StandingAmount,
        tx: TransactionId,
    ) -> Result<(), LedgerError> {
        let replaced = self.store.with_account(user, |account| {
            account.set_standing_amount(stock, amount, tx)
        })?;

        tracing::debug!(user, tx, stock, ?amount, "Standing amount set");
        if let Some(order) = replaced {
            self.publish(
                user,
                order.tx,
                AuditKind::StandingCanceled {
                    stock: order.stock,
                    side: amount.side(),
                },
            );
        }
        Ok(())
    }

    pub fn set_trigger(
        &self,
        user: &str,
        stock: &str,
        side: Side,
        price: Decimal,
        tx: TransactionId,
    ) -> Result<(), LedgerError> {
        self.store
            .with_account(user, |account| account.set_trigger(stock, side, price))?;

        tracing::debug!(user, tx, stock, %side, %price, "Trigger set");
        Ok(())
    }

    pub fn cancel_standing(
        &self,
        user: &str,
        stock: &str,
        side: Side,
        tx: TransactionId,
    ) -> Result<StandingOrder, LedgerError> {
        let order = self
            .store
            .with_account(user, |account| account.cancel_standing(stock, side))?;

        tracing::debug!(user, tx, stock, %side, "Standing order canceled");
        self.publish(
            user,
            tx,
            AuditKind::StandingCanceled {
                stock: stock.to_string(),
                side,
            },
        );
        Ok(order)
    }

    /// Check one account's standing orders on `stock` against `price`
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidAmount` for a non-positive price, or
    /// `ArithmeticOverflow`.
    pub fn evaluate(&self, user: &str, stock: &str, price: Decimal) -> Result<Vec<Fill>, LedgerError> {
        self.evaluate_quote(user, &Quote::new(stock, price))
    }

    /// Fan a quote out to every account with a standing order on its stock
    ///
    /// Accounts are evaluated one at a time, each under its own lock. A
    /// failure on one account is logged and does not stop the others.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if the quoted price is not positive.
    pub fn apply_quote(&self, quote: &Quote) -> Result<Vec<(UserId, Fill)>, LedgerError> {
        if quote.price <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount("quote", quote.price));
        }

        let mut fills = Vec::new();
        for user in self.store.users_with_standing_orders(&quote.stock) {
            match self.evaluate_quote(&user, quote) {
                Ok(user_fills) => {
                    fills.extend(user_fills.into_iter().map(|fill| (user.clone(), fill)));
                }
                Err(e) => {
                    tracing::warn!(user = %user, stock = %quote.stock, "Quote evaluation failed: {}", e);
                }
            }
        }

        tracing::debug!(
            stock = %quote.stock,
            price = %quote.price,
            quoted_at = %quote.timestamp,
            fills = fills.len(),
            "Quote applied"
        );
        Ok(fills)
    }

    /// Dispatch a parsed command
    ///
    /// `authenticate` creates the account; every other user command requires
    /// it to exist.
    pub fn execute(&self, record: CommandRecord) -> Result<(), LedgerError> {
        let tx = record.tx;
        match record.command {
            Command::Authenticate { user } => {
                self.create_account(&user);
                Ok(())
            }
            Command::Deposit { user, amount } => self.deposit(&user, amount, tx),
            Command::Buy {
                user,
                stock,
                amount,
                quantity,
            } => self.reserve_buy(&user, &stock, amount, quantity, tx),
            Command::CommitBuy { user } => self.commit_buy(&user, tx).map(drop),
            Command::CancelBuy { user } => self.cancel_buy(&user, tx).map(drop),
            Command::Sell {
                user,
                stock,
                amount,
                quantity,
            } => self.reserve_sell(&user, &stock, amount, quantity, tx),
            Command::CommitSell { user } => self.commit_sell(&user, tx).map(drop),
            Command::CancelSell { user } => self.cancel_sell(&user, tx).map(drop),
            Command::SetStandingAmount {
                user,
                stock,
                amount,
            } => self.set_standing_amount(&user, &stock, amount, tx),
            Command::SetTrigger {
                user,
                stock,
                side,
                price,
            } => self.set_trigger(&user, &stock, side, price, tx),
            Command::CancelStanding { user, stock, side } => {
                self.cancel_standing(&user, &stock, side, tx).map(drop)
            }
            Command::Quote(quote) => self.apply_quote(&quote).map(drop),
        }
    }

    fn evaluate_quote(&self, user: &str, quote: &Quote) -> Result<Vec<Fill>, LedgerError> {
        let fills = self
            .store
            .with_account(user, |account| account.evaluate(&quote.stock, quote.price))?;

        for fill in &fills {
            tracing::debug!(
                user,
                tx = fill.tx,
                stock = %quote.stock,
                side = %fill.side,
                quantity = fill.quantity,
                price = %quote.price,
                quoted_at = %quote.timestamp,
                "Standing order triggered"
            );
            self.publish(
                user,
                fill.tx,
                AuditKind::Triggered {
                    stock: fill.stock.clone(),
                    side: fill.side,
                    price: fill.price,
                    quantity: fill.quantity,
                    amount: fill.amount,
                    quoted_at: quote.timestamp,
                },
            );
        }
        Ok(fills)
    }

    fn publish(&self, user: &str, tx: TransactionId, kind: AuditKind) {
        self.audit.publish(AuditEvent::new(user, tx, kind));
    }

    fn publish_canceled(&self, user: &str, side: Side, order: PendingOrder) {
        let PendingOrder {
            tx,
            stock,
            amount,
            quantity,
        } = order;
        let kind = match side {
            Side::Buy => AuditKind::BuyCanceled {
                stock,
                amount,
                quantity,
            },
            Side::Sell => AuditKind::SellCanceled {
                stock,
                amount,
                quantity,
            },
        };
        self.publish(user, tx, kind);
    }
}

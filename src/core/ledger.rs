//! Reservation ledger primitives shared by every account mutation
//!
//! The rules for moving cash and shares between available, reserved and
//! committed are split across three modules, all implemented directly on
//! [`Account`]:
//!
//! - this module: deposits plus the checked arithmetic and validation helpers
//! - `order_lifecycle`: reserve / commit / cancel for immediate orders
//! - `standing_orders`: standing reservations, triggers and evaluation
//!
//! Every primitive computes all new field values first and only writes once
//! nothing can fail any more. A returned error therefore always means the
//! account is exactly as it was.

use crate::types::{Account, LedgerError, Shares, Symbol};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

impl Account {
    /// Add cash to the account
    ///
    /// Increases both `balance` and `available`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `ArithmeticOverflow` if either field would overflow
    pub fn deposit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        ensure_positive_cash("deposit", amount)?;

        let balance = self.add_cash("deposit", self.balance, amount)?;
        let available = self.add_cash("deposit", self.available, amount)?;

        self.balance = balance;
        self.available = available;
        Ok(())
    }

    pub(crate) fn add_cash(
        &self,
        operation: &str,
        current: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &self.user))
    }

    pub(crate) fn sub_cash(
        &self,
        operation: &str,
        current: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        current
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &self.user))
    }

    pub(crate) fn add_shares(
        &self,
        operation: &str,
        current: Shares,
        quantity: Shares,
    ) -> Result<Shares, LedgerError> {
        current
            .checked_add(quantity)
            .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &self.user))
    }

    pub(crate) fn set_holding(&mut self, stock: &str, quantity: Shares) {
        set_position(&mut self.holdings, stock, quantity);
    }

    pub(crate) fn set_reserved(&mut self, stock: &str, quantity: Shares) {
        set_position(&mut self.reserved_for_sale, stock, quantity);
    }
}

fn set_position(positions: &mut BTreeMap<Symbol, Shares>, stock: &str, quantity: Shares) {
    if quantity == 0 {
        positions.remove(stock);
    } else {
        positions.insert(stock.to_string(), quantity);
    }
}

pub(crate) fn ensure_positive_cash(operation: &str, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(operation, amount));
    }
    Ok(())
}

pub(crate) fn ensure_positive_quantity(operation: &str, quantity: Shares) -> Result<(), LedgerError> {
    if quantity == 0 {
        return Err(LedgerError::invalid_amount(operation, quantity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn test_deposit_credits_balance_and_available() {
        let mut account = Account::new("u1");

        account.deposit(dec("100.01")).unwrap();

        assert_eq!(account.balance, dec("100.01"));
        assert_eq!(account.available, dec("100.01"));
    }

    #[test]
    fn test_deposit_accumulates_exactly() {
        let mut account = Account::new("u1");

        for _ in 0..10 {
            account.deposit(dec("0.10")).unwrap();
        }

        assert_eq!(account.balance, dec("1.00"));
        assert_eq!(account.available, dec("1.00"));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-5.00")]
    fn test_deposit_rejects_non_positive(#[case] amount: &str) {
        let mut account = Account::new("u1");

        let result = account.deposit(dec(amount));

        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
        assert_eq!(account, Account::new("u1"));
    }

    #[test]
    fn test_deposit_overflow_leaves_account_unchanged() {
        let mut account = Account::new("u1");
        account.deposit(Decimal::MAX).unwrap();
        let before = account.clone();

        let result = account.deposit(Decimal::ONE);

        assert!(matches!(result, Err(LedgerError::ArithmeticOverflow { .. })));
        assert_eq!(account, before);
    }

    #[test]
    fn test_set_holding_removes_empty_positions() {
        let mut account = Account::new("u1");

        account.set_holding("S", 4);
        assert_eq!(account.holding("S"), 4);

        account.set_holding("S", 0);
        assert!(account.holdings.is_empty());
    }
}

//! Thread-safe account store
//!
//! This module provides the `AccountStore` struct, which owns every account and
//! hands out exclusive access to one account at a time.
//!
//! # Design
//!
//! Accounts live in a `DashMap<UserId, Arc<Mutex<Account>>>`. The map's shard
//! lock is only held while the account handle is cloned out of the map; the
//! logical operation itself then runs under that account's own `Mutex`. Two
//! operations on the same account are serialized, while operations on accounts
//! that happen to share a shard never wait on each other.
//!
//! A second map indexes, per stock, the users holding a standing order on it.
//! The index is updated while the changed account is still locked, so a quote
//! finds its candidates without touching any account lock.
//!
//! # Thread Safety
//!
//! No reference to an `Account` escapes a locked section. Readers receive
//! clones taken under the lock. Index shards are only ever locked after an
//! account lock, never before.

use crate::types::{Account, LedgerError, Symbol, UserId};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to a single account
type AccountHandle = Arc<Mutex<Account>>;

/// Owned table of accounts with one lock per account
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: DashMap<UserId, AccountHandle>,
    standing_index: DashMap<Symbol, BTreeSet<UserId>>,
}

impl AccountStore {
    /// Create a new empty AccountStore
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            standing_index: DashMap::new(),
        }
    }

    /// Create the account for `user` if it does not exist yet
    ///
    /// Creation is idempotent: an existing account is returned unchanged.
    ///
    /// # Returns
    ///
    /// A snapshot of the account and whether it was created by this call.
    pub fn create(&self, user: &str) -> (Account, bool) {
        let mut created = false;
        let handle = Arc::clone(
            self.accounts
                .entry(user.to_string())
                .or_insert_with(|| {
                    created = true;
                    Arc::new(Mutex::new(Account::new(user)))
                })
                .value(),
        );

        let account = lock(&handle).clone();
        (account, created)
    }

    /// Look up a snapshot of the account for `user`
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if no account exists.
    pub fn lookup(&self, user: &str) -> Result<Account, LedgerError> {
        self.with_account(user, |account| Ok(account.clone()))
    }

    /// Whether an account exists for `user`
    pub fn contains(&self, user: &str) -> bool {
        self.accounts.contains_key(user)
    }

    /// Run `f` with exclusive access to the account for `user`
    ///
    /// The account lock is held for the duration of `f` and released on every
    /// exit path. `f` must validate before writing: if it returns an error the
    /// account must be untouched.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if no account exists, otherwise whatever
    /// `f` returns.
    pub fn with_account<T, F>(&self, user: &str, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Account) -> Result<T, LedgerError>,
    {
        let handle = self
            .accounts
            .get(user)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::not_found(user))?;

        let mut account = lock(&handle);
        let before = standing_stocks(&account);
        let result = f(&mut account);
        let after = standing_stocks(&account);
        if before != after {
            self.reindex(user, &before, &after);
        }
        result
    }

    /// Users with at least one standing order on `stock`, sorted
    ///
    /// Read from the index alone. The result is a hint for the quote fan-out,
    /// which re-checks under each account lock before acting.
    pub fn users_with_standing_orders(&self, stock: &str) -> Vec<UserId> {
        self.standing_index
            .get(stock)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn reindex(&self, user: &str, before: &BTreeSet<Symbol>, after: &BTreeSet<Symbol>) {
        for stock in after.difference(before) {
            self.standing_index
                .entry(stock.clone())
                .or_default()
                .insert(user.to_string());
        }
        for stock in before.difference(after) {
            if let Some(mut users) = self.standing_index.get_mut(stock) {
                users.remove(user);
            }
            self.standing_index
                .remove_if(stock, |_, users| users.is_empty());
        }
    }

    /// Snapshot of every account, sorted by user id
    pub fn snapshot(&self) -> Vec<Account> {
        let handles: Vec<AccountHandle> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts: Vec<Account> = handles.iter().map(|handle| lock(handle).clone()).collect();
        accounts.sort_by(|a, b| a.user.cmp(&b.user));
        accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

fn standing_stocks(account: &Account) -> BTreeSet<Symbol> {
    account
        .standing_orders
        .keys()
        .map(|(stock, _)| stock.clone())
        .collect()
}

// Every ledger primitive validates before it writes, so the state behind a
// poisoned lock is still consistent.
fn lock(handle: &Mutex<Account>) -> MutexGuard<'_, Account> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

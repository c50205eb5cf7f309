// Account registry - bounded arena of accounts in order of first credit

use crate::identity::Address;
use crate::ledger::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registration-index parity, used to split bulk passes into two cohorts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// Parity of a registration index
    pub fn of(index: usize) -> Self {
        if index % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    /// Check whether a registration index belongs to this cohort
    pub fn matches(self, index: usize) -> bool {
        Parity::of(index) == self
    }
}

/// Registry of every account that has ever been credited
///
/// Indices are assigned in order of first credit and never change, so the
/// parity cohorts are stable for the lifetime of the ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountRegistry {
    /// Accounts by registration index
    accounts: Vec<Address>,
    /// Index: address -> registration index
    #[serde(skip)]
    index: HashMap<Address, usize>,
    /// Maximum number of accounts the registry accepts
    capacity: usize,
}

impl AccountRegistry {
    /// Create an empty registry holding at most `capacity` accounts
    pub fn new(capacity: usize) -> Self {
        Self {
            accounts: Vec::new(),
            index: HashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of accounts that can still be registered
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.accounts.len())
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.index.contains_key(account)
    }

    /// Registration index of an account, if it has been credited before
    pub fn index_of(&self, account: &Address) -> Option<usize> {
        self.index.get(account).copied()
    }

    /// Account registered at an index
    pub fn get(&self, index: usize) -> Option<&Address> {
        self.accounts.get(index)
    }

    /// Fail with `RegistryFull` if `new_accounts` more registrations would not fit
    pub fn ensure_room_for(&self, new_accounts: usize) -> Result<(), LedgerError> {
        if new_accounts > self.remaining() {
            return Err(LedgerError::RegistryFull {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Register an account, returning its index (existing accounts keep theirs)
    pub fn register(&mut self, account: Address) -> Result<usize, LedgerError> {
        if let Some(index) = self.index_of(&account) {
            return Ok(index);
        }
        self.ensure_room_for(1)?;

        let index = self.accounts.len();
        self.accounts.push(account);
        self.index.insert(account, index);
        Ok(index)
    }

    /// All accounts with their registration index, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Address)> {
        self.accounts.iter().enumerate()
    }

    /// Accounts of one parity cohort, in registration order
    pub fn cohort(&self, parity: Parity) -> impl Iterator<Item = &Address> {
        self.accounts
            .iter()
            .enumerate()
            .filter(move |(i, _)| parity.matches(*i))
            .map(|(_, account)| account)
    }

    /// Rebuild the lookup index (after deserialization)
    pub(crate) fn rebuild_index(&mut self) {
        self.index = self
            .accounts
            .iter()
            .enumerate()
            .map(|(i, account)| (*account, i))
            .collect();
    }
}

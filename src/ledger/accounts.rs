// Account ledger - spendable balances, allowances and the supply totals

use crate::identity::Address;
use crate::ledger::registry::AccountRegistry;
use crate::ledger::supply::SupplyCounters;
use crate::ledger::treasury::Treasury;
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during account ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("Insufficient allowance: allowed {allowed}, required {required}")]
    InsufficientAllowance { allowed: Amount, required: Amount },

    #[error("Allowance underflow: current {current}, requested decrease {requested}")]
    AllowanceUnderflow { current: Amount, requested: Amount },

    #[error("Allowance overflow: current {current}, requested increase {requested}")]
    AllowanceOverflow { current: Amount, requested: Amount },

    #[error("Balance would overflow")]
    BalanceOverflow,

    #[error("Supply counter would overflow")]
    SupplyOverflow,

    #[error("Account registry is full (capacity {capacity})")]
    RegistryFull { capacity: usize },
}

/// What a successful transfer did with the funds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    /// Recipient balance was credited
    Credited,
    /// Recipient was the treasury: the amount was burned
    Redeemed,
}

/// The spendable side of the distribution
///
/// Every operation checks all of its preconditions before the first write,
/// so a returned error always means the ledger is unchanged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountLedger {
    /// Accounts in order of first credit
    registry: AccountRegistry,
    /// Spendable balance per account
    balances: BTreeMap<Address, Amount>,
    /// owner -> spender -> amount
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    /// Minted, released and burned totals
    supply: SupplyCounters,
    /// Redemption sink
    treasury: Treasury,
}

impl AccountLedger {
    /// Create an empty ledger with the given treasury and registry bound
    pub fn new(treasury: Address, max_accounts: usize) -> Self {
        Self {
            registry: AccountRegistry::new(max_accounts),
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            supply: SupplyCounters::new(),
            treasury: Treasury::new(treasury),
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub fn supply(&self) -> SupplyCounters {
        self.supply
    }

    pub fn spendable_balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_minted(&self) -> Amount {
        self.supply.total_minted()
    }

    pub fn total_released(&self) -> Amount {
        self.supply.total_released()
    }

    pub fn total_burned(&self) -> Amount {
        self.supply.total_burned()
    }

    pub fn total_spendable_supply(&self) -> Amount {
        self.supply.total_spendable_supply()
    }

    /// Sum of every account balance, treasury included
    pub fn sum_of_balances(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0u128, |acc, balance| acc.checked_add(*balance))
    }

    // ========================================================================
    // ISSUANCE
    // ========================================================================

    /// Check that `amount` new spendable units could be issued to `account`
    pub fn check_issue(&self, account: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.supply
            .checked_mint(amount)
            .ok_or(LedgerError::SupplyOverflow)?;
        self.check_credit(account, amount)
    }

    /// Issue new spendable units to an account, growing the minted total
    pub fn issue(&mut self, account: Address, amount: Amount) -> Result<(), LedgerError> {
        self.check_issue(&account, amount)?;
        if amount == 0 {
            return Ok(());
        }

        let minted = self.supply.total_minted() + amount;
        self.credit(account, amount)?;
        self.supply.set_minted(minted);
        Ok(())
    }

    /// Check that `amount` escrowed units could be credited to `account`
    pub fn check_release(&self, account: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.supply
            .checked_release(amount)
            .ok_or(LedgerError::SupplyOverflow)?;
        self.check_credit(account, amount)
    }

    /// Credit units leaving escrow; the minted total does not move
    pub fn credit_release(&mut self, account: Address, amount: Amount) -> Result<(), LedgerError> {
        self.check_release(&account, amount)?;
        if amount == 0 {
            return Ok(());
        }

        let released = self.supply.total_released() + amount;
        self.credit(account, amount)?;
        self.supply.set_released(released);
        Ok(())
    }

    fn check_credit(&self, account: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.spendable_balance_of(account)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        if amount > 0 && !self.registry.contains(account) {
            self.registry.ensure_room_for(1)?;
        }
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self
            .spendable_balance_of(&account)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        self.registry.register(account)?;
        self.balances.insert(account, balance);
        Ok(())
    }

    // ========================================================================
    // TRANSFERS
    // ========================================================================

    /// Move spendable units; a transfer to the treasury burns them instead
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<TransferOutcome, LedgerError> {
        let available = self.spendable_balance_of(&from);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        if self.treasury.is_redemption(&to) {
            if amount == 0 {
                return Ok(TransferOutcome::Redeemed);
            }
            let burned = self
                .supply
                .checked_burn(amount)
                .ok_or(LedgerError::SupplyOverflow)?;
            self.balances.insert(from, available - amount);
            self.supply.set_burned(burned);
            return Ok(TransferOutcome::Redeemed);
        }

        if from == to || amount == 0 {
            return Ok(TransferOutcome::Credited);
        }

        let credited = self
            .spendable_balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        self.registry.register(to)?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(TransferOutcome::Credited)
    }

    /// Spend an allowance: `spender` moves `owner`'s units to `to`
    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<TransferOutcome, LedgerError> {
        let allowed = self.allowance(&owner, &spender);
        if amount > allowed {
            return Err(LedgerError::InsufficientAllowance {
                allowed,
                required: amount,
            });
        }

        let outcome = self.transfer(owner, to, amount)?;
        self.set_allowance(owner, spender, allowed - amount);
        Ok(outcome)
    }

    // ========================================================================
    // ALLOWANCES
    // ========================================================================

    /// Set an allowance to an absolute value (last write wins)
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.set_allowance(owner, spender, amount);
    }

    /// Raise an allowance, returning the new value
    pub fn increase_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        added: Amount,
    ) -> Result<Amount, LedgerError> {
        let current = self.allowance(&owner, &spender);
        let updated = current
            .checked_add(added)
            .ok_or(LedgerError::AllowanceOverflow {
                current,
                requested: added,
            })?;
        self.set_allowance(owner, spender, updated);
        Ok(updated)
    }

    /// Lower an allowance, returning the new value
    pub fn decrease_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        subtracted: Amount,
    ) -> Result<Amount, LedgerError> {
        let current = self.allowance(&owner, &spender);
        let updated = current
            .checked_sub(subtracted)
            .ok_or(LedgerError::AllowanceUnderflow {
                current,
                requested: subtracted,
            })?;
        self.set_allowance(owner, spender, updated);
        Ok(updated)
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            if let Some(spenders) = self.allowances.get_mut(&owner) {
                spenders.remove(&spender);
                if spenders.is_empty() {
                    self.allowances.remove(&owner);
                }
            }
            return;
        }
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    /// Rebuild lookup indexes (after deserialization)
    pub(crate) fn rebuild_indexes(&mut self) {
        self.registry.rebuild_index();
    }
}

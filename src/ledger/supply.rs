// Aggregate supply counters for the spendable unit

use crate::ledger::Amount;
use serde::{Deserialize, Serialize};

/// Minted, released and burned totals of the spendable unit
///
/// `minted` grows only through mints and treasury auto-mints. Locked claims
/// that become spendable are counted in `released`, so an unlock never moves
/// `minted`. The spendable supply is `minted + released - burned`, and the
/// account ledger only burns units an account holds, so it cannot underflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyCounters {
    total_minted: Amount,
    total_released: Amount,
    total_burned: Amount,
}

impl SupplyCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_minted(&self) -> Amount {
        self.total_minted
    }

    /// Locked units converted to spendable form by unlocks
    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    /// Minted units not yet burned; unlocks leave this unchanged
    pub fn net_minted(&self) -> Amount {
        self.total_minted.saturating_sub(self.total_burned)
    }

    /// Units currently in spendable form (`minted + released - burned`)
    pub fn total_spendable_supply(&self) -> Amount {
        self.total_minted
            .saturating_add(self.total_released)
            .saturating_sub(self.total_burned)
    }

    pub(crate) fn checked_mint(&self, amount: Amount) -> Option<Amount> {
        self.total_minted.checked_add(amount)
    }

    pub(crate) fn checked_release(&self, amount: Amount) -> Option<Amount> {
        self.total_released.checked_add(amount)
    }

    pub(crate) fn checked_burn(&self, amount: Amount) -> Option<Amount> {
        self.total_burned.checked_add(amount)
    }

    pub(crate) fn set_minted(&mut self, total: Amount) {
        self.total_minted = total;
    }

    pub(crate) fn set_released(&mut self, total: Amount) {
        self.total_released = total;
    }

    pub(crate) fn set_burned(&mut self, total: Amount) {
        self.total_burned = total;
    }
}

/// Point-in-time view of every aggregate the distribution tracks
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyStats {
    pub total_minted: Amount,
    pub total_released: Amount,
    pub total_burned: Amount,
    pub total_spendable_supply: Amount,
    pub total_locked_supply: Amount,
    /// Spendable plus locked: everything issued and not burned
    pub total_issued: Amount,
    pub treasury_balance: Amount,
    pub account_count: usize,
}

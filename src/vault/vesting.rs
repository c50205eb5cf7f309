// Vesting ledger - locked claims, open unlock windows and releases

use crate::distribution::Stage;
use crate::identity::Address;
use crate::ledger::Amount;
use crate::vault::claim::LockedClaim;
use crate::vault::schedule::{UnlockSchedule, UnlockWindow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors that can occur during vesting operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VestingError {
    #[error("Account {account} has nothing to unlock")]
    NotEligible { account: Address },

    #[error("Invalid unlock schedule: {0}")]
    InvalidSchedule(String),

    #[error("Locked supply would overflow")]
    LockedOverflow,
}

/// A planned release for one account, split by grant round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub account: Address,
    pub amount: Amount,
    pub rounds: Vec<(Stage, Amount)>,
}

/// Locked side of the distribution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingLedger {
    schedule: UnlockSchedule,
    claims: BTreeMap<Address, LockedClaim>,
    /// (round, opens_at) keys of the windows opened so far
    open_windows: BTreeSet<(Stage, Stage)>,
    total_locked: Amount,
}

impl VestingLedger {
    pub fn new(schedule: UnlockSchedule) -> Self {
        Self {
            schedule,
            claims: BTreeMap::new(),
            open_windows: BTreeSet::new(),
            total_locked: 0,
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn schedule(&self) -> &UnlockSchedule {
        &self.schedule
    }

    pub fn total_locked_supply(&self) -> Amount {
        self.total_locked
    }

    pub fn locked_balance_of(&self, account: &Address) -> Amount {
        self.claims
            .get(account)
            .map(LockedClaim::locked_balance)
            .unwrap_or(0)
    }

    pub fn claim(&self, account: &Address) -> Option<&LockedClaim> {
        self.claims.get(account)
    }

    /// Accounts holding any claim, settled or not
    pub fn claimants(&self) -> impl Iterator<Item = &Address> {
        self.claims.keys()
    }

    pub fn is_window_open(&self, window: &UnlockWindow) -> bool {
        self.open_windows.contains(&window.key())
    }

    pub fn open_windows(&self) -> impl Iterator<Item = &(Stage, Stage)> {
        self.open_windows.iter()
    }

    /// Sum of every account's locked balance
    pub fn sum_of_locked(&self) -> Option<Amount> {
        self.claims
            .values()
            .try_fold(0u128, |acc, claim| acc.checked_add(claim.locked_balance()))
    }

    /// Sum of every grant ever escrowed, released or not
    pub fn sum_of_granted(&self) -> Option<Amount> {
        self.claims
            .values()
            .flat_map(|claim| claim.grants())
            .try_fold(0u128, |acc, (_, grant)| acc.checked_add(grant.granted()))
    }

    /// Sum of everything released from escrow so far
    pub fn sum_of_released(&self) -> Option<Amount> {
        self.claims
            .values()
            .flat_map(|claim| claim.grants())
            .try_fold(0u128, |acc, (_, grant)| acc.checked_add(grant.released()))
    }

    // ========================================================================
    // LOCKING
    // ========================================================================

    pub fn check_lock(&self, account: &Address, amount: Amount) -> Result<(), VestingError> {
        self.total_locked
            .checked_add(amount)
            .ok_or(VestingError::LockedOverflow)?;
        self.locked_balance_of(account)
            .checked_add(amount)
            .ok_or(VestingError::LockedOverflow)?;
        Ok(())
    }

    /// Escrow `amount` for `account` as a grant of `round`
    pub fn lock(&mut self, account: Address, round: Stage, amount: Amount) -> Result<(), VestingError> {
        self.check_lock(&account, amount)?;
        if amount == 0 {
            return Ok(());
        }
        self.claims
            .entry(account)
            .or_default()
            .add(round, amount)
            .ok_or(VestingError::LockedOverflow)?;
        self.total_locked += amount;
        Ok(())
    }

    // ========================================================================
    // WINDOWS
    // ========================================================================

    /// Open every window scheduled for `stage`, returning the ones newly opened
    pub fn open_windows_at(&mut self, stage: Stage) -> Vec<UnlockWindow> {
        let opening: Vec<UnlockWindow> = self.schedule.opening_at(stage).copied().collect();
        opening
            .into_iter()
            .filter(|window| self.open_windows.insert(window.key()))
            .collect()
    }

    // ========================================================================
    // RELEASES
    // ========================================================================

    /// Units an account could unlock right now
    pub fn releasable_of(&self, account: &Address) -> Amount {
        self.claims
            .get(account)
            .map(|claim| self.releasable_rounds(claim).iter().map(|(_, a)| a).sum())
            .unwrap_or(0)
    }

    /// Work out what `unlock` would release, without changing anything
    pub fn plan_release(&self, account: &Address) -> Result<Release, VestingError> {
        let claim = self
            .claims
            .get(account)
            .ok_or(VestingError::NotEligible { account: *account })?;

        let rounds = self.releasable_rounds(claim);
        let amount: Amount = rounds.iter().map(|(_, a)| a).sum();
        if amount == 0 {
            return Err(VestingError::NotEligible { account: *account });
        }

        Ok(Release {
            account: *account,
            amount,
            rounds,
        })
    }

    /// Apply a release produced by `plan_release` against the current state
    pub(crate) fn apply_release(&mut self, release: &Release) {
        if let Some(claim) = self.claims.get_mut(&release.account) {
            for (round, amount) in &release.rounds {
                claim.release(*round, *amount);
            }
            self.total_locked -= release.amount;
        }
    }

    fn releasable_rounds(&self, claim: &LockedClaim) -> Vec<(Stage, Amount)> {
        claim
            .grants()
            .filter_map(|(round, grant)| {
                let vested = self
                    .schedule
                    .vested(*round, grant.granted(), &self.open_windows);
                let releasable = vested.saturating_sub(grant.released());
                (releasable > 0).then_some((*round, releasable))
            })
            .collect()
    }
}

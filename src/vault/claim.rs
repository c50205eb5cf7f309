// Locked claims - per-account grants, one per minting round

use crate::distribution::Stage;
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locked units granted during one round and how many were already released
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    granted: Amount,
    released: Amount,
}

impl Grant {
    pub fn granted(&self) -> Amount {
        self.granted
    }

    pub fn released(&self) -> Amount {
        self.released
    }

    /// Units still locked
    pub fn locked(&self) -> Amount {
        self.granted - self.released
    }

    pub fn is_settled(&self) -> bool {
        self.released == self.granted
    }
}

/// Every grant an account holds, keyed by the round that created it
///
/// Claims are non-transferable: the only way a grant shrinks is a release.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedClaim {
    grants: BTreeMap<Stage, Grant>,
}

impl LockedClaim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total units still locked across all rounds
    pub fn locked_balance(&self) -> Amount {
        self.grants.values().map(Grant::locked).sum()
    }

    pub fn grant(&self, round: Stage) -> Option<&Grant> {
        self.grants.get(&round)
    }

    pub fn grants(&self) -> impl Iterator<Item = (&Stage, &Grant)> {
        self.grants.iter()
    }

    /// Grant more units for a round
    pub(crate) fn add(&mut self, round: Stage, amount: Amount) -> Option<()> {
        let grant = self.grants.entry(round).or_default();
        grant.granted = grant.granted.checked_add(amount)?;
        Some(())
    }

    /// Record a release against a round; callers have checked the amount
    pub(crate) fn release(&mut self, round: Stage, amount: Amount) {
        if let Some(grant) = self.grants.get_mut(&round) {
            grant.released += amount.min(grant.locked());
        }
    }
}

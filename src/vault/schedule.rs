// Unlock schedule - which stage releases how much of each grant round

use crate::distribution::Stage;
use crate::ledger::Amount;
use crate::vault::VestingError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Basis-point denominator for release fractions
pub const MAX_BPS: u16 = 10_000;

/// One release window: entering `opens_at` releases `release_bps` of every
/// grant made during `round`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockWindow {
    pub round: Stage,
    pub opens_at: Stage,
    pub release_bps: u16,
}

impl UnlockWindow {
    pub fn new(round: Stage, opens_at: Stage, release_bps: u16) -> Self {
        Self {
            round,
            opens_at,
            release_bps,
        }
    }

    /// Key identifying this window among the open windows
    pub fn key(&self) -> (Stage, Stage) {
        (self.round, self.opens_at)
    }
}

/// The full release table
///
/// Every round listed releases exactly `MAX_BPS` across its windows, so once
/// all of a round's windows are open its grants are fully released.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockSchedule {
    windows: Vec<UnlockWindow>,
}

impl UnlockSchedule {
    /// Build a schedule, rejecting tables that could strand locked claims
    pub fn new(windows: Vec<UnlockWindow>) -> Result<Self, VestingError> {
        let schedule = Self { windows };
        schedule.validate()?;
        Ok(schedule)
    }

    /// One window per round releasing the whole grant at once
    pub fn single_release(pairs: &[(Stage, Stage)]) -> Result<Self, VestingError> {
        Self::new(
            pairs
                .iter()
                .map(|(round, opens_at)| UnlockWindow::new(*round, *opens_at, MAX_BPS))
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<(), VestingError> {
        let mut totals: BTreeMap<Stage, u32> = BTreeMap::new();
        let mut keys = BTreeSet::new();

        for window in &self.windows {
            if window.release_bps == 0 || window.release_bps > MAX_BPS {
                return Err(VestingError::InvalidSchedule(format!(
                    "window {}->{} releases {} bps",
                    window.round, window.opens_at, window.release_bps
                )));
            }
            if window.opens_at <= window.round {
                return Err(VestingError::InvalidSchedule(format!(
                    "window for round {} must open after it, not at {}",
                    window.round, window.opens_at
                )));
            }
            if !keys.insert(window.key()) {
                return Err(VestingError::InvalidSchedule(format!(
                    "duplicate window {}->{}",
                    window.round, window.opens_at
                )));
            }
            *totals.entry(window.round).or_default() += u32::from(window.release_bps);
        }

        for (round, total) in totals {
            if total != u32::from(MAX_BPS) {
                return Err(VestingError::InvalidSchedule(format!(
                    "round {} releases {} bps in total, expected {}",
                    round, total, MAX_BPS
                )));
            }
        }
        Ok(())
    }

    pub fn windows(&self) -> &[UnlockWindow] {
        &self.windows
    }

    /// Windows that release part of a round
    pub fn windows_for(&self, round: Stage) -> impl Iterator<Item = &UnlockWindow> {
        self.windows.iter().filter(move |w| w.round == round)
    }

    /// Windows that open when `stage` is entered
    pub fn opening_at(&self, stage: Stage) -> impl Iterator<Item = &UnlockWindow> {
        self.windows.iter().filter(move |w| w.opens_at == stage)
    }

    /// Rounds that have at least one window
    pub fn rounds(&self) -> BTreeSet<Stage> {
        self.windows.iter().map(|w| w.round).collect()
    }

    /// Amount of a grant vested once the given windows are open
    ///
    /// A round whose windows are all open vests the whole grant, so rounding
    /// never leaves dust behind.
    pub fn vested(&self, round: Stage, granted: Amount, open: &BTreeSet<(Stage, Stage)>) -> Amount {
        let mut opened_bps: u16 = 0;
        let mut all_open = true;
        let mut any = false;

        for window in self.windows_for(round) {
            any = true;
            if open.contains(&window.key()) {
                opened_bps = opened_bps.saturating_add(window.release_bps);
            } else {
                all_open = false;
            }
        }

        if any && all_open {
            return granted;
        }
        bps_of(granted, opened_bps)
    }
}

impl Default for UnlockSchedule {
    /// Presale1 grants release at DAOSaleEnd, Presale2 grants at
    /// Presale2Unlock, FinalMint grants at FinalUnlock
    fn default() -> Self {
        Self {
            windows: vec![
                UnlockWindow::new(Stage::Presale1, Stage::DaoSaleEnd, MAX_BPS),
                UnlockWindow::new(Stage::Presale2, Stage::Presale2Unlock, MAX_BPS),
                UnlockWindow::new(Stage::FinalMint, Stage::FinalUnlock, MAX_BPS),
            ],
        }
    }
}

/// `amount * bps / MAX_BPS` without intermediate overflow
fn bps_of(amount: Amount, bps: u16) -> Amount {
    let bps = Amount::from(bps.min(MAX_BPS));
    let denom = Amount::from(MAX_BPS);
    (amount / denom) * bps + (amount % denom) * bps / denom
}

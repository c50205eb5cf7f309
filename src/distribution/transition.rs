// Stage transition table - current stage -> (next stage, entry actions)

use crate::distribution::config::{DistributionConfig, MintCeiling, Ratio};
use crate::distribution::Stage;
use std::collections::BTreeMap;

/// Side effect run as part of entering a stage, in declaration order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryAction {
    /// Mint this fraction of minted less burned to the treasury
    TreasuryMint(Ratio),
    /// Open the unlock windows scheduled for the stage
    OpenWindows,
    /// Set the active mint ceiling from the stage rule
    SetCeiling(MintCeiling),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: Stage,
    pub to: Stage,
    pub time_gate: Option<i64>,
    pub actions: Vec<EntryAction>,
}

/// Transitions for every non-terminal stage
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
    transitions: BTreeMap<Stage, Transition>,
}

impl TransitionTable {
    pub fn from_config(config: &DistributionConfig) -> Self {
        let transitions = config
            .stages
            .iter()
            .filter_map(|target| {
                let from = Stage::from_index(target.stage.index().checked_sub(1)?)?;
                let mut actions = Vec::new();
                if let Some(fraction) = target.treasury_mint.filter(|f| !f.is_zero()) {
                    actions.push(EntryAction::TreasuryMint(fraction));
                }
                actions.push(EntryAction::OpenWindows);
                actions.push(EntryAction::SetCeiling(target.ceiling));

                Some((
                    from,
                    Transition {
                        from,
                        to: target.stage,
                        time_gate: target.time_gate,
                        actions,
                    },
                ))
            })
            .collect();

        Self { transitions }
    }

    /// Transition leaving `from`, or `None` if `from` is terminal
    pub fn from_stage(&self, from: Stage) -> Option<&Transition> {
        self.transitions.get(&from)
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

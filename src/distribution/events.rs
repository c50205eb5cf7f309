// Ledger events - append-only record of every committed operation

use crate::distribution::Stage;
use crate::identity::Address;
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};

/// What a committed operation did
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Mint {
        account: Address,
        round: Stage,
        spendable: Amount,
        locked: Amount,
    },
    TreasuryMint {
        treasury: Address,
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Redemption {
        from: Address,
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    Unlock {
        account: Address,
        amount: Amount,
    },
    StageAdvanced {
        from: Stage,
        to: Stage,
        at: i64,
    },
}

impl LedgerEvent {
    /// Whether the event touches `account`
    pub fn involves(&self, account: &Address) -> bool {
        match self {
            LedgerEvent::Mint { account: a, .. } | LedgerEvent::Unlock { account: a, .. } => {
                a == account
            }
            LedgerEvent::TreasuryMint { treasury, .. } => treasury == account,
            LedgerEvent::Transfer { from, to, .. } => from == account || to == account,
            LedgerEvent::Redemption { from, .. } => from == account,
            LedgerEvent::Approval { owner, spender, .. } => owner == account || spender == account,
            LedgerEvent::StageAdvanced { .. } => false,
        }
    }
}

/// An event with its position in the log and the stage it happened in
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub stage: Stage,
    pub event: LedgerEvent,
}

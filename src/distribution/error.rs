// Distribution errors and retry guidance

use crate::bulk::BulkError;
use crate::distribution::config::ConfigError;
use crate::distribution::Stage;
use crate::ledger::{Amount, LedgerError};
use crate::vault::VestingError;
use thiserror::Error;

/// When, if ever, resubmitting a rejected operation can succeed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryHint {
    /// Not until the active stage changes
    AfterStageChange,
    /// Not until the clock passes the stage's time gate
    AfterTimeGate,
    /// Not until another unlock window opens for the account
    AfterEligibility,
    /// Not until the source account receives more funds
    AfterFunding,
    /// Not until the owner grants a fresh allowance
    AfterApproval,
    /// The same request will always fail
    Never,
}

/// Errors returned by distribution operations
///
/// Every failed operation leaves the distribution unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("Mint cap exceeded: ceiling {ceiling}, minted {minted}, requested {requested}")]
    CapExceeded {
        ceiling: Amount,
        minted: Amount,
        requested: Amount,
    },

    #[error("Minting is closed during {stage}")]
    MintingClosed { stage: Stage },

    #[error("Stage mismatch: expected {expected}, active stage is {actual}")]
    StageMismatch { expected: Stage, actual: Stage },

    #[error("{stage} is the final stage")]
    FinalStageReached { stage: Stage },

    #[error("Time gate not reached: {stage} opens at {gate}, now {now}")]
    TimeGateNotReached { stage: Stage, gate: i64, now: i64 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Bulk unlock limit exceeded: {required} releases, limit {limit}")]
    BulkLimitExceeded { limit: usize, required: usize },

    #[error("Supply counter would overflow")]
    SupplyOverflow,

    #[error("Ledger invariant violated: {0}")]
    InvariantViolated(String),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Vesting(#[from] VestingError),

    #[error(transparent)]
    Bulk(#[from] BulkError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DistributionError {
    pub fn retry_hint(&self) -> RetryHint {
        match self {
            DistributionError::CapExceeded { .. } | DistributionError::MintingClosed { .. } => {
                RetryHint::AfterStageChange
            }
            DistributionError::TimeGateNotReached { .. } => RetryHint::AfterTimeGate,
            DistributionError::Vesting(VestingError::NotEligible { .. }) => {
                RetryHint::AfterEligibility
            }
            DistributionError::Ledger(LedgerError::InsufficientBalance { .. }) => {
                RetryHint::AfterFunding
            }
            DistributionError::Ledger(LedgerError::InsufficientAllowance { .. }) => {
                RetryHint::AfterApproval
            }
            _ => RetryHint::Never,
        }
    }

    /// Whether a later resubmission of the same request might succeed
    pub fn is_retryable(&self) -> bool {
        self.retry_hint() != RetryHint::Never
    }
}

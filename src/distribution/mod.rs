// Distribution module - THE STAGE MACHINE
// Stages, per-stage rules, the transition table and the engine that drives
// the account and vesting ledgers

mod clock;
mod config;
mod engine;
mod error;
mod events;
mod stage;
mod transition;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    Allocation, ConfigError, DistributionConfig, MintCeiling, Ratio, SplitRatio, StageConfig,
    TokenMetadata, DAO_AMM_START_TREASURY_MINT, DAO_SALE_START_TREASURY_MINT,
    FINAL_UNLOCK_TIME_GATE, UNIT,
};
pub use engine::{BulkUnlockSummary, Distribution, DistributionSnapshot, MintReceipt, StageReport};
pub use error::{DistributionError, RetryHint};
pub use events::{EventRecord, LedgerEvent};
pub use stage::{Stage, StageParseError};
pub use transition::{EntryAction, Transition, TransitionTable};

// stagevest - staged token distribution with locked-claim vesting
//
// A single spendable unit is minted in bounded rounds. Each mint escrows a
// fixed multiple of the spendable part as a non-transferable locked claim,
// released back into spendable balance by stage-gated unlock windows.
// Transfers addressed to the treasury are redemptions (burns).

pub mod bulk;
pub mod distribution;
pub mod identity;
pub mod ledger;
pub mod storage;
pub mod vault;

pub use distribution::{
    Allocation, Clock, Distribution, DistributionConfig, DistributionError, FixedClock, RetryHint,
    Stage, SystemClock,
};
pub use identity::Address;
pub use ledger::Amount;

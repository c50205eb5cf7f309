// Vault module - LOCKED CLAIMS
// Escrowed grants per account and the schedule that releases them

mod claim;
mod schedule;
mod vesting;

pub use claim::{Grant, LockedClaim};
pub use schedule::{UnlockSchedule, UnlockWindow, MAX_BPS};
pub use vesting::{Release, VestingError, VestingLedger};

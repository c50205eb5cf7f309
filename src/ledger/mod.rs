// Ledger module - SPENDABLE BALANCES
// Per-account balances, allowances, the account registry and the treasury sink

mod accounts;
mod registry;
mod supply;
mod treasury;

pub use accounts::{AccountLedger, LedgerError, TransferOutcome};
pub use registry::{AccountRegistry, Parity};
pub use supply::{SupplyCounters, SupplyStats};
pub use treasury::Treasury;

/// Quantity of the spendable or locked unit, in base units
pub type Amount = u128;

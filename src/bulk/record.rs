// Bulk mint record - validated list of (account, amount) pairs

use crate::identity::Address;
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Fewest pairs a bulk record may carry
pub const MIN_BULK_ENTRIES: usize = 5;

/// Most pairs a bulk record may carry; unused slots are zero-filled
pub const MAX_BULK_ENTRIES: usize = 10;

/// Bytes per packed (amount, account) word
pub const WORD_LEN: usize = 32;

/// Bytes of the amount half of a word (big-endian)
pub const AMOUNT_LEN: usize = 12;

pub const SELECTOR_LEN: usize = 4;

/// Exact length of an encoded record
pub const RECORD_LEN: usize = SELECTOR_LEN + MAX_BULK_ENTRIES * WORD_LEN;

/// Largest amount that fits the 96-bit amount field
pub const MAX_BULK_AMOUNT: Amount = (1 << (AMOUNT_LEN * 8)) - 1;

/// Call signature the selector is derived from
pub const MINT_BULK_SIGNATURE: &str = "mintBulk(uint256[10])";

/// Errors that can occur while building or decoding bulk records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BulkError {
    #[error("Invalid bulk size: {count} entries, expected 5 to 10")]
    InvalidBulkSize { count: usize },

    #[error("Entry {index}: amount {amount} outside 1..=2^96-1")]
    AmountOutOfRange { index: usize, amount: Amount },

    #[error("Entry {index}: zero address")]
    ZeroAddress { index: usize },

    #[error("Invalid record length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Selector mismatch: expected {expected}, got {actual}")]
    SelectorMismatch { expected: String, actual: String },

    #[error("Entry {index} follows an empty slot")]
    NonContiguous { index: usize },

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 string: {0}")]
    InvalidBase64(String),
}

/// First four bytes of Keccak-256 over `MINT_BULK_SIGNATURE`
pub fn mint_bulk_selector() -> [u8; SELECTOR_LEN] {
    let hash = Keccak256::digest(MINT_BULK_SIGNATURE.as_bytes());
    let mut selector = [0u8; SELECTOR_LEN];
    selector.copy_from_slice(&hash[..SELECTOR_LEN]);
    selector
}

/// One pair of a bulk record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMintEntry {
    pub account: Address,
    pub amount: Amount,
}

impl BulkMintEntry {
    pub fn new(account: Address, amount: Amount) -> Self {
        Self { account, amount }
    }
}

/// A bulk mint request that is known to have an encodable shape
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMintRecord {
    entries: Vec<BulkMintEntry>,
}

impl BulkMintRecord {
    pub fn new(entries: Vec<BulkMintEntry>) -> Result<Self, BulkError> {
        let count = entries.len();
        if !(MIN_BULK_ENTRIES..=MAX_BULK_ENTRIES).contains(&count) {
            return Err(BulkError::InvalidBulkSize { count });
        }

        for (index, entry) in entries.iter().enumerate() {
            if entry.amount == 0 || entry.amount > MAX_BULK_AMOUNT {
                return Err(BulkError::AmountOutOfRange {
                    index,
                    amount: entry.amount,
                });
            }
            if entry.account.is_zero() {
                return Err(BulkError::ZeroAddress { index });
            }
        }

        Ok(Self { entries })
    }

    /// Build from `(account, amount)` pairs
    pub fn from_pairs(pairs: &[(Address, Amount)]) -> Result<Self, BulkError> {
        Self::new(
            pairs
                .iter()
                .map(|(account, amount)| BulkMintEntry::new(*account, *amount))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[BulkMintEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all amounts (cannot overflow: at most ten 96-bit values)
    pub fn total_amount(&self) -> Amount {
        self.entries.iter().map(|e| e.amount).sum()
    }
}

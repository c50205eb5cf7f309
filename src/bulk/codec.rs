// Bulk mint codec - selector(4) || 10 x [amount(12, big-endian) || account(20)]

use crate::bulk::record::{
    mint_bulk_selector, BulkError, BulkMintEntry, BulkMintRecord, AMOUNT_LEN, MAX_BULK_ENTRIES,
    RECORD_LEN, SELECTOR_LEN, WORD_LEN,
};
use crate::identity::{Address, ADDRESS_LEN};
use crate::ledger::Amount;

/// Codec for the fixed-width bulk mint record
pub struct BulkMintCodec;

impl BulkMintCodec {
    /// Encode a record; used pairs form a prefix, the rest are zero words
    pub fn encode(record: &BulkMintRecord) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_LEN);
        bytes.extend_from_slice(&mint_bulk_selector());
        for entry in record.entries() {
            bytes.extend_from_slice(&pack_word(entry));
        }
        bytes.resize(RECORD_LEN, 0);
        bytes
    }

    /// Decode and validate a record
    pub fn decode(bytes: &[u8]) -> Result<BulkMintRecord, BulkError> {
        if bytes.len() != RECORD_LEN {
            return Err(BulkError::InvalidLength {
                expected: RECORD_LEN,
                actual: bytes.len(),
            });
        }

        let (selector, body) = bytes.split_at(SELECTOR_LEN);
        let expected = mint_bulk_selector();
        if selector != expected {
            return Err(BulkError::SelectorMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(selector),
            });
        }

        let mut entries = Vec::with_capacity(MAX_BULK_ENTRIES);
        let mut ended = false;
        for (index, word) in body.chunks_exact(WORD_LEN).enumerate() {
            if word.iter().all(|b| *b == 0) {
                ended = true;
                continue;
            }
            if ended {
                return Err(BulkError::NonContiguous { index });
            }
            let entry = unpack_word(word);
            if entry.amount == 0 {
                return Err(BulkError::AmountOutOfRange { index, amount: 0 });
            }
            entries.push(entry);
        }

        BulkMintRecord::new(entries)
    }

    /// Encode to `0x`-prefixed hex
    pub fn encode_hex(record: &BulkMintRecord) -> String {
        format!("0x{}", hex::encode(Self::encode(record)))
    }

    /// Decode from hex, with or without the `0x` prefix
    pub fn decode_hex(hex_str: &str) -> Result<BulkMintRecord, BulkError> {
        let trimmed = hex_str.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| BulkError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// Encode to base64 string (URL-safe, no padding)
    pub fn encode_base64(record: &BulkMintRecord) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        URL_SAFE_NO_PAD.encode(Self::encode(record))
    }

    /// Decode from base64 string
    pub fn decode_base64(b64_str: &str) -> Result<BulkMintRecord, BulkError> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        let bytes = URL_SAFE_NO_PAD
            .decode(b64_str.trim())
            .map_err(|e| BulkError::InvalidBase64(e.to_string()))?;
        Self::decode(&bytes)
    }
}

/// Pack one pair into a 32-byte word
pub fn pack_word(entry: &BulkMintEntry) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    let amount = entry.amount.to_be_bytes();
    word[..AMOUNT_LEN].copy_from_slice(&amount[amount.len() - AMOUNT_LEN..]);
    word[AMOUNT_LEN..].copy_from_slice(entry.account.as_bytes());
    word
}

/// Unpack a 32-byte word into a pair
pub fn unpack_word(word: &[u8]) -> BulkMintEntry {
    let mut amount = [0u8; 16];
    amount[16 - AMOUNT_LEN..].copy_from_slice(&word[..AMOUNT_LEN]);
    let mut account = [0u8; ADDRESS_LEN];
    account.copy_from_slice(&word[AMOUNT_LEN..AMOUNT_LEN + ADDRESS_LEN]);
    BulkMintEntry::new(Address::from_bytes(account), Amount::from_be_bytes(amount))
}

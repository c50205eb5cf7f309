// Address parsing and encoding tests for the identity module

use stagevest::identity::{Address, AddressError, ADDRESS_LEN};

// ============================================================================
// PARSING TESTS
// ============================================================================

#[test]
fn test_parse_with_prefix() {
    let address = Address::parse("0x00000000000000000000000000000000000000ff").unwrap();

    let mut expected = [0u8; ADDRESS_LEN];
    expected[ADDRESS_LEN - 1] = 0xff;
    assert_eq!(address.as_bytes(), &expected);
}

#[test]
fn test_parse_without_prefix_matches_prefixed() {
    let plain = Address::parse("1111111111111111111111111111111111111111").unwrap();
    let prefixed = Address::parse("0X1111111111111111111111111111111111111111").unwrap();

    assert_eq!(plain, prefixed);
}

#[test]
fn test_parse_rejects_wrong_length() {
    let result = Address::parse("0x1234");

    assert_eq!(result, Err(AddressError::InvalidLength(2)));
}

#[test]
fn test_parse_rejects_non_hex() {
    let result = Address::parse("0xzz11111111111111111111111111111111111111");

    assert!(matches!(result, Err(AddressError::InvalidHex(_))));
}

#[test]
fn test_from_str_matches_parse() {
    let text = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
    let parsed: Address = text.parse().unwrap();

    assert_eq!(parsed, Address::parse(text).unwrap());
}

// ============================================================================
// DISPLAY AND SERDE TESTS
// ============================================================================

#[test]
fn test_display_is_lowercase_prefixed_hex() {
    let address = Address::from_bytes([0xAB; ADDRESS_LEN]);

    assert_eq!(address.to_string(), format!("0x{}", "ab".repeat(ADDRESS_LEN)));
}

#[test]
fn test_json_uses_hex_string() {
    let address = Address::from_bytes([0x01; ADDRESS_LEN]);

    let json = serde_json::to_string(&address).unwrap();

    assert_eq!(json, format!("\"0x{}\"", "01".repeat(ADDRESS_LEN)));
    assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
}

#[test]
fn test_postcard_uses_raw_bytes() {
    let address = Address::generate();

    let bytes = postcard::to_allocvec(&address).unwrap();

    assert_eq!(bytes.len(), ADDRESS_LEN);
    assert_eq!(postcard::from_bytes::<Address>(&bytes).unwrap(), address);
}

// ============================================================================
// DERIVATION TESTS
// ============================================================================

#[test]
fn test_zero_address() {
    assert!(Address::ZERO.is_zero());
    assert!(!Address::from_label("alice").is_zero());
}

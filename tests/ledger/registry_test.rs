// Account registry tests: registration order, bounds and parity cohorts

use stagevest::identity::Address;
use stagevest::ledger::{AccountRegistry, LedgerError, Parity};

fn accounts(n: usize) -> Vec<Address> {
    (0..n).map(|i| Address::from_label(&format!("account-{i}"))).collect()
}

// ============================================================================
// REGISTRATION TESTS
// ============================================================================

#[test]
fn test_indices_follow_first_registration() {
    let mut registry = AccountRegistry::new(8);
    let list = accounts(3);

    for account in &list {
        registry.register(*account).unwrap();
    }
    registry.register(list[0]).unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.get(2), Some(&list[2]));
    assert_eq!(registry.index_of(&list[1]), Some(1));
}

#[test]
fn test_capacity_enforced() {
    let mut registry = AccountRegistry::new(2);
    let list = accounts(3);

    registry.register(list[0]).unwrap();
    registry.register(list[1]).unwrap();
    let result = registry.register(list[2]);

    assert_eq!(result, Err(LedgerError::RegistryFull { capacity: 2 }));
    assert_eq!(registry.remaining(), 0);
    assert_eq!(registry.register(list[1]), Ok(1));
}

#[test]
fn test_ensure_room_for() {
    let mut registry = AccountRegistry::new(3);
    registry.register(accounts(1)[0]).unwrap();

    assert!(registry.ensure_room_for(2).is_ok());
    assert!(registry.ensure_room_for(3).is_err());
}

// ============================================================================
// COHORT TESTS
// ============================================================================

#[test]
fn test_parity_of_index() {
    assert_eq!(Parity::of(0), Parity::Even);
    assert_eq!(Parity::of(7), Parity::Odd);
    assert!(Parity::Odd.matches(3));
    assert!(!Parity::Even.matches(3));
}

#[test]
fn test_cohorts_split_by_registration_index() {
    let mut registry = AccountRegistry::new(8);
    let list = accounts(5);
    for account in &list {
        registry.register(*account).unwrap();
    }

    let even: Vec<_> = registry.cohort(Parity::Even).copied().collect();
    let odd: Vec<_> = registry.cohort(Parity::Odd).copied().collect();

    assert_eq!(even, vec![list[0], list[2], list[4]]);
    assert_eq!(odd, vec![list[1], list[3]]);
}

#[test]
fn test_cohorts_ignore_address_value() {
    let mut registry = AccountRegistry::new(4);
    let high = Address::from_bytes([0xff; 20]);
    let low = Address::from_bytes([0x01; 20]);

    registry.register(high).unwrap();
    registry.register(low).unwrap();

    assert_eq!(registry.cohort(Parity::Even).next(), Some(&high));
    assert_eq!(registry.cohort(Parity::Odd).next(), Some(&low));
}

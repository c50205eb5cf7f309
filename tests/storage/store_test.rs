// Store Tests
// Persistence of distribution snapshots, the event log, config and stage checkpoints

use stagevest::distribution::{Distribution, DistributionConfig, FixedClock, LedgerEvent, Stage};
use stagevest::identity::Address;
use stagevest::storage::{LedgerStore, StoreError};
use tempfile::TempDir;

const START: i64 = 1_700_000_000;

fn sample_distribution() -> Distribution {
    let mut dist = Distribution::new(DistributionConfig::default(), FixedClock::new(START)).unwrap();
    let alice = Address::from_label("alice");
    dist.mint(alice, 1_000).unwrap();
    dist.transfer(alice, Address::from_label("bob"), 400).unwrap();
    dist
}

// ============================================================================
// STORE CREATION AND BASIC OPERATIONS
// ============================================================================

#[test]
fn test_store_open_new() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();

    assert!(store.is_empty().unwrap());
    assert!(!store.has_distribution().unwrap());
    assert!(store.load_distribution(FixedClock::new(START)).unwrap().is_none());
}

#[test]
fn test_store_reopen_keeps_data() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = LedgerStore::open(temp_dir.path()).unwrap();
        store.save_distribution(&mut sample_distribution()).unwrap();
        store.flush().unwrap();
    }

    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let dist = store.load_distribution(FixedClock::new(START)).unwrap().unwrap();
    assert_eq!(dist.spendable_balance_of(&Address::from_label("bob")), 400);
}

// ============================================================================
// SNAPSHOT TESTS
// ============================================================================

#[test]
fn test_save_and_load_distribution() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let mut dist = sample_distribution();

    let digest = store.save_distribution(&mut dist).unwrap();
    let loaded = store.load_distribution(FixedClock::new(START)).unwrap().unwrap();

    assert_eq!(digest, dist.state_digest().unwrap());
    assert_eq!(store.stored_digest().unwrap(), Some(digest.to_vec()));
    assert_eq!(loaded.state_digest().unwrap(), digest);
    assert_eq!(loaded.active_stage(), Stage::Presale1);
}

#[test]
fn test_tampered_snapshot_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    store.save_distribution(&mut sample_distribution()).unwrap();

    let mut bytes = store.get_raw(b"ledger:snapshot").unwrap().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    store.put_raw(b"ledger:snapshot", &bytes).unwrap();

    assert!(matches!(
        store.load_distribution(FixedClock::new(START)),
        Err(StoreError::DigestMismatch)
    ));
}

#[test]
fn test_overwrite_keeps_latest() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let mut dist = sample_distribution();
    store.save_distribution(&mut dist).unwrap();

    dist.advance_stage(Stage::Presale1).unwrap();
    store.save_distribution(&mut dist).unwrap();

    let loaded = store.load_distribution(FixedClock::new(START)).unwrap().unwrap();
    assert_eq!(loaded.active_stage(), Stage::Presale2);
}

// ============================================================================
// CONFIG TESTS
// ============================================================================

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let config = DistributionConfig::default()
        .with_max_accounts(42)
        .with_treasury(Address::from_label("dao"));

    assert!(store.load_config().unwrap().is_none());
    store.save_config(&config).unwrap();

    assert_eq!(store.load_config().unwrap(), Some(config));
}

// ============================================================================
// CHECKPOINT TESTS
// ============================================================================

#[test]
fn test_checkpoints_listed_in_stage_order() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let mut dist = sample_distribution();

    store.save_checkpoint(Stage::Presale1, &dist).unwrap();
    dist.advance_stage(Stage::Presale1).unwrap();
    dist.advance_stage(Stage::Presale2).unwrap();
    store.save_checkpoint(Stage::DaoSaleStart, &dist).unwrap();
    dist.advance_stage(Stage::DaoSaleStart).unwrap();
    store.save_checkpoint(Stage::DaoSaleEnd, &dist).unwrap();

    assert_eq!(
        store.checkpoints().unwrap(),
        vec![Stage::Presale1, Stage::DaoSaleStart, Stage::DaoSaleEnd]
    );

    let early = store
        .load_checkpoint(Stage::Presale1, FixedClock::new(START))
        .unwrap()
        .unwrap();
    assert_eq!(early.active_stage(), Stage::Presale1);
    assert_eq!(early.total_minted(), 1_000);
    assert!(store
        .load_checkpoint(Stage::FinalMint, FixedClock::new(START))
        .unwrap()
        .is_none());
}

#[test]
fn test_stats_count_keys() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let mut dist = sample_distribution();

    store.save_config(dist.config()).unwrap();
    store.save_distribution(&mut dist).unwrap();

    // config, snapshot, digest and the two events
    assert_eq!(store.stats().unwrap().key_count, 5);
}

// ============================================================================
// EVENT LOG TESTS
// ============================================================================

#[test]
fn test_save_moves_events_to_log() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let mut dist = sample_distribution();
    let bob = Address::from_label("bob");

    store.save_distribution(&mut dist).unwrap();
    assert!(dist.history().is_empty());

    dist.advance_stage(Stage::Presale1).unwrap();
    store.save_distribution(&mut dist).unwrap();

    let events = store.events().unwrap();
    let sequences: Vec<u64> = events.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2]);
    assert!(matches!(events[2].event, LedgerEvent::StageAdvanced { .. }));
    assert_eq!(store.events_for(&bob).unwrap().len(), 1);

    let loaded = store.load_distribution(FixedClock::new(START)).unwrap().unwrap();
    assert!(loaded.history().is_empty());
    assert_eq!(loaded.next_sequence(), 3);
}

#[test]
fn test_snapshot_size_independent_of_event_count() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let mut dist = sample_distribution();
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");

    dist.approve(alice, bob, 5);
    store.save_distribution(&mut dist).unwrap();
    let first = store.get_raw(b"ledger:snapshot").unwrap().unwrap().len();

    for _ in 0..100 {
        dist.approve(alice, bob, 5);
        store.save_distribution(&mut dist).unwrap();
    }
    let last = store.get_raw(b"ledger:snapshot").unwrap().unwrap().len();

    assert_eq!(first, last);
    assert_eq!(store.events().unwrap().len(), 103);
}

#[test]
fn test_clear_drops_event_log() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    store.save_distribution(&mut sample_distribution()).unwrap();

    store.clear().unwrap();

    assert!(store.is_empty().unwrap());
    assert!(store.events().unwrap().is_empty());
}

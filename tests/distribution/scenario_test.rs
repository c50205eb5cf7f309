// End-to-end distribution scenarios across the full stage lifecycle

use stagevest::distribution::{
    Distribution, DistributionConfig, DistributionError, FixedClock, MintCeiling, Stage,
    FINAL_UNLOCK_TIME_GATE, UNIT,
};
use stagevest::identity::Address;
use stagevest::ledger::LedgerError;

const START: i64 = 1_700_000_000;

/// A quarter-million whole tokens
const Q: u128 = 250_000 * UNIT;

fn signers(n: usize) -> Vec<Address> {
    (1..=n)
        .map(|i| Address::from_label(&format!("signer-{i}")))
        .collect()
}

fn next(dist: &mut Distribution) {
    dist.advance_stage(dist.active_stage()).unwrap();
}

fn mint_all(dist: &mut Distribution, accounts: &[Address], amount: u128) {
    for account in accounts {
        dist.mint(*account, amount).unwrap();
    }
}

// ============================================================================
// SINGLE-ACCOUNT SCENARIOS
// ============================================================================

#[test]
fn test_round_trip_releases_full_grant() {
    let mut dist = Distribution::new(DistributionConfig::default(), FixedClock::new(START)).unwrap();
    let alice = Address::from_label("alice");

    dist.mint(alice, 1_000).unwrap();
    while dist.active_stage() < Stage::DaoSaleEnd {
        next(&mut dist);
    }
    dist.unlock(alice).unwrap();

    assert_eq!(dist.spendable_balance_of(&alice), 4_000);
    assert_eq!(dist.locked_balance_of(&alice), 0);
}

#[test]
fn test_cap_reached_by_many_accounts() {
    let cap = 20_000;
    let config =
        DistributionConfig::default().with_ceiling(Stage::Presale1, MintCeiling::Absolute(cap));
    let mut dist = Distribution::new(config, FixedClock::new(START)).unwrap();
    let accounts = signers(21);

    mint_all(&mut dist, &accounts[..20], cap / 20);
    let err = dist.mint(accounts[20], 1).unwrap_err();

    assert!(matches!(err, DistributionError::CapExceeded { .. }));
    assert_eq!(dist.total_minted(), cap);
    assert_eq!(dist.account_count(), 20);
}

#[test]
fn test_redemption_shrinks_supply() {
    let mut dist = Distribution::new(DistributionConfig::default(), FixedClock::new(START)).unwrap();
    let alice = Address::from_label("alice");
    let treasury = *dist.treasury();

    dist.mint(alice, 1_000).unwrap();
    dist.transfer(alice, treasury, 300).unwrap();

    assert_eq!(dist.total_minted(), 1_000);
    assert_eq!(dist.total_burned(), 300);
    assert_eq!(dist.total_spendable_supply(), 700);
    assert_eq!(dist.spendable_balance_of(&treasury), 0);
}

#[test]
fn test_allowance_is_consumed() {
    let mut dist = Distribution::new(DistributionConfig::default(), FixedClock::new(START)).unwrap();
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");
    let carol = Address::from_label("carol");
    dist.mint(alice, 1_000).unwrap();

    dist.approve(alice, bob, 100);
    dist.transfer_from(bob, alice, carol, 60).unwrap();
    let second = dist.transfer_from(bob, alice, carol, 60);

    assert_eq!(dist.allowance(&alice, &bob), 40);
    assert_eq!(
        second,
        Err(DistributionError::Ledger(LedgerError::InsufficientAllowance {
            allowed: 40,
            required: 60
        }))
    );
}

// ============================================================================
// FULL LIFECYCLE
// ============================================================================

#[test]
fn test_full_eight_stage_lifecycle() {
    let clock = FixedClock::new(START);
    let mut dist = Distribution::new(DistributionConfig::default(), clock.clone()).unwrap();
    let s = signers(20);
    let treasury = *dist.treasury();

    // Presale1: fill the round exactly, then one signer pays another
    mint_all(&mut dist, &s, Q);
    assert_eq!(dist.total_minted(), 20 * Q);
    assert!(matches!(
        dist.mint(s[0], 1),
        Err(DistributionError::CapExceeded { .. })
    ));
    dist.transfer(s[0], s[1], Q).unwrap();

    // Presale2
    next(&mut dist);
    mint_all(&mut dist, &s, Q);
    assert_eq!(dist.total_minted(), 40 * Q);
    assert_eq!(dist.total_locked_supply(), 120 * Q);

    // DAOSaleStart: half the minted supply to the treasury
    next(&mut dist);
    assert_eq!(dist.spendable_balance_of(&treasury), 20 * Q);
    assert_eq!(dist.total_minted(), 60 * Q);

    // DAOSaleEnd: Presale1 grants become releasable
    next(&mut dist);
    dist.unlock(s[0]).unwrap();
    dist.unlock(s[1]).unwrap();
    assert_eq!(dist.spendable_balance_of(&s[0]), 4 * Q);
    assert_eq!(dist.spendable_balance_of(&s[1]), 6 * Q);

    let even = dist.unlock_all_even().unwrap();
    assert_eq!(even.accounts_released, 9);
    assert_eq!(even.amount_released, 27 * Q);
    assert_eq!(dist.locked_balance_of(&s[0]), 3 * Q);
    assert_eq!(dist.locked_balance_of(&s[1]), 3 * Q);
    assert_eq!(dist.locked_balance_of(&s[3]), 6 * Q);
    assert_eq!(dist.total_locked_supply(), 87 * Q);
    assert_eq!(dist.total_minted(), 60 * Q);
    assert_eq!(dist.total_released(), 33 * Q);

    // DAOAMMStart: a third of the minted supply to the treasury
    let report = dist.advance_stage(Stage::DaoSaleEnd).unwrap();
    assert_eq!(report.treasury_minted, 20 * Q);
    assert_eq!(dist.total_minted(), 80 * Q);

    // Presale2Unlock: the odd cohort collects both rounds
    next(&mut dist);
    let odd = dist.unlock_all_odd().unwrap();
    assert_eq!(odd.accounts_released, 10);
    assert_eq!(odd.amount_released, 57 * Q);
    assert_eq!(dist.locked_balance_of(&s[3]), 0);
    assert_eq!(dist.total_locked_supply(), 30 * Q);
    assert_eq!(dist.total_minted(), 80 * Q);

    // FinalMint: the ceiling sits a fixed room above the entry total
    next(&mut dist);
    assert_eq!(dist.current_mint_ceiling(), Some(100 * Q));
    mint_all(&mut dist, &s, Q);
    assert!(matches!(
        dist.mint(s[0], 1),
        Err(DistributionError::CapExceeded { .. })
    ));
    dist.unlock(s[0]).unwrap();
    assert_eq!(dist.locked_balance_of(&s[0]), 3 * Q);

    // FinalUnlock: gated on wall-clock time
    assert!(matches!(
        dist.advance_stage(Stage::FinalMint),
        Err(DistributionError::TimeGateNotReached { .. })
    ));
    clock.set(FINAL_UNLOCK_TIME_GATE);
    next(&mut dist);

    dist.unlock(s[0]).unwrap();
    assert_eq!(dist.locked_balance_of(&s[0]), 0);
    dist.unlock_all_even().unwrap();
    dist.unlock_all_odd().unwrap();

    assert_eq!(dist.total_locked_supply(), 0);
    assert!(dist.eligible_accounts(stagevest::ledger::Parity::Even).is_empty());
    assert!(dist.check_invariants().is_ok());
    assert!(matches!(
        dist.advance_stage(Stage::FinalUnlock),
        Err(DistributionError::FinalStageReached { .. })
    ));
}

#[test]
fn test_terminal_stage_still_allows_transfers_and_unlocks() {
    let clock = FixedClock::new(FINAL_UNLOCK_TIME_GATE);
    let mut dist = Distribution::new(DistributionConfig::default(), clock).unwrap();
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");

    dist.mint(alice, 100).unwrap();
    while !dist.active_stage().is_terminal() {
        next(&mut dist);
    }

    assert_eq!(dist.unlock(alice).unwrap(), 300);
    dist.transfer(alice, bob, 400).unwrap();
    assert_eq!(dist.spendable_balance_of(&bob), 400);
    assert!(matches!(
        dist.mint(alice, 1),
        Err(DistributionError::MintingClosed { .. })
    ));
}

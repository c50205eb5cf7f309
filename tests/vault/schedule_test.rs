// Unlock schedule tests: table validation and vesting arithmetic

use stagevest::distribution::Stage;
use stagevest::vault::{UnlockSchedule, UnlockWindow, VestingError, MAX_BPS};
use std::collections::BTreeSet;

fn two_step() -> UnlockSchedule {
    UnlockSchedule::new(vec![
        UnlockWindow::new(Stage::Presale1, Stage::DaoSaleEnd, 5_000),
        UnlockWindow::new(Stage::Presale1, Stage::FinalUnlock, 5_000),
    ])
    .unwrap()
}

// ============================================================================
// VALIDATION TESTS
// ============================================================================

#[test]
fn test_default_schedule_is_valid() {
    let schedule = UnlockSchedule::default();

    assert!(schedule.validate().is_ok());
    assert_eq!(schedule.windows().len(), 3);
}

#[test]
fn test_rounds_must_total_max_bps() {
    let result = UnlockSchedule::new(vec![UnlockWindow::new(
        Stage::Presale1,
        Stage::DaoSaleEnd,
        MAX_BPS - 1,
    )]);

    assert!(matches!(result, Err(VestingError::InvalidSchedule(_))));
}

#[test]
fn test_window_must_open_after_round() {
    let result = UnlockSchedule::single_release(&[(Stage::Presale2, Stage::Presale2)]);

    assert!(matches!(result, Err(VestingError::InvalidSchedule(_))));
}

#[test]
fn test_zero_bps_window_rejected() {
    let result = UnlockSchedule::new(vec![
        UnlockWindow::new(Stage::Presale1, Stage::DaoSaleEnd, MAX_BPS),
        UnlockWindow::new(Stage::Presale1, Stage::FinalUnlock, 0),
    ]);

    assert!(matches!(result, Err(VestingError::InvalidSchedule(_))));
}

#[test]
fn test_duplicate_window_rejected() {
    let result = UnlockSchedule::new(vec![
        UnlockWindow::new(Stage::Presale1, Stage::DaoSaleEnd, 5_000),
        UnlockWindow::new(Stage::Presale1, Stage::DaoSaleEnd, 5_000),
    ]);

    assert!(matches!(result, Err(VestingError::InvalidSchedule(_))));
}

// ============================================================================
// LOOKUP TESTS
// ============================================================================

#[test]
fn test_opening_at_lists_stage_windows() {
    let schedule = two_step();

    let opening: Vec<_> = schedule.opening_at(Stage::FinalUnlock).collect();

    assert_eq!(opening.len(), 1);
    assert_eq!(opening[0].round, Stage::Presale1);
    assert_eq!(schedule.opening_at(Stage::Presale2).count(), 0);
}

#[test]
fn test_rounds_listed_once() {
    let rounds = two_step().rounds();

    assert_eq!(rounds.into_iter().collect::<Vec<_>>(), vec![Stage::Presale1]);
}

// ============================================================================
// VESTING TESTS
// ============================================================================

#[test]
fn test_nothing_vested_before_any_window() {
    let open = BTreeSet::new();

    assert_eq!(two_step().vested(Stage::Presale1, 1_000, &open), 0);
}

#[test]
fn test_partial_then_full_vesting() {
    let schedule = two_step();
    let mut open = BTreeSet::new();

    open.insert((Stage::Presale1, Stage::DaoSaleEnd));
    assert_eq!(schedule.vested(Stage::Presale1, 1_001, &open), 500);

    open.insert((Stage::Presale1, Stage::FinalUnlock));
    assert_eq!(schedule.vested(Stage::Presale1, 1_001, &open), 1_001);
}

#[test]
fn test_round_without_windows_never_vests() {
    let mut open = BTreeSet::new();
    open.insert((Stage::Presale1, Stage::DaoSaleEnd));

    assert_eq!(two_step().vested(Stage::FinalMint, 1_000, &open), 0);
}

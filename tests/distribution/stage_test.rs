// Stage ordering, naming and transition table tests

use stagevest::distribution::{
    DistributionConfig, EntryAction, MintCeiling, Ratio, Stage, StageParseError, TransitionTable,
};

// ============================================================================
// ORDERING TESTS
// ============================================================================

#[test]
fn test_first_and_terminal() {
    assert_eq!(Stage::FIRST, Stage::Presale1);
    assert!(Stage::FinalUnlock.is_terminal());
    assert!(!Stage::FinalMint.is_terminal());
    assert_eq!(Stage::FinalUnlock.next(), None);
}

#[test]
fn test_index_roundtrip() {
    for (i, stage) in Stage::ALL.iter().enumerate() {
        assert_eq!(stage.index(), i);
        assert_eq!(Stage::from_index(i), Some(*stage));
    }
    assert_eq!(Stage::from_index(Stage::ALL.len()), None);
}

// ============================================================================
// NAMING TESTS
// ============================================================================

#[test]
fn test_names_parse_case_insensitively() {
    assert_eq!("DAOSaleStart".parse::<Stage>(), Ok(Stage::DaoSaleStart));
    assert_eq!("daoammstart".parse::<Stage>(), Ok(Stage::DaoAmmStart));
    assert_eq!("4".parse::<Stage>(), Ok(Stage::DaoAmmStart));
}

#[test]
fn test_unknown_name_rejected() {
    assert_eq!(
        "Presale3".parse::<Stage>(),
        Err(StageParseError("Presale3".to_string()))
    );
    assert!("8".parse::<Stage>().is_err());
}

#[test]
fn test_display_matches_serde_name() {
    for stage in Stage::ALL {
        let json = serde_json::to_string(&stage).unwrap();
        assert_eq!(json, format!("\"{}\"", stage));
    }
}

// ============================================================================
// TRANSITION TABLE TESTS
// ============================================================================

#[test]
fn test_every_non_terminal_stage_has_one_transition() {
    let table = TransitionTable::from_config(&DistributionConfig::default());

    for stage in Stage::ALL {
        match table.from_stage(stage) {
            Some(transition) => {
                assert_eq!(Some(transition.to), stage.next());
                assert_eq!(transition.from, stage);
            }
            None => assert!(stage.is_terminal()),
        }
    }
}

#[test]
fn test_treasury_mints_only_on_dao_stages() {
    let table = TransitionTable::from_config(&DistributionConfig::default());

    let treasury_targets: Vec<Stage> = Stage::ALL
        .iter()
        .filter_map(|s| table.from_stage(*s))
        .filter(|t| {
            t.actions
                .iter()
                .any(|a| matches!(a, EntryAction::TreasuryMint(_)))
        })
        .map(|t| t.to)
        .collect();

    assert_eq!(treasury_targets, vec![Stage::DaoSaleStart, Stage::DaoAmmStart]);
}

#[test]
fn test_entry_actions_end_with_ceiling() {
    let table = TransitionTable::from_config(&DistributionConfig::default());

    let into_final_mint = table.from_stage(Stage::Presale2Unlock).unwrap();

    assert_eq!(
        into_final_mint.actions.last(),
        Some(&EntryAction::SetCeiling(MintCeiling::AboveEntry(
            5_000_000 * 1_000_000
        )))
    );
}

#[test]
fn test_zero_treasury_fraction_is_skipped() {
    let config = DistributionConfig::default().with_stage(
        stagevest::distribution::StageConfig::passive(Stage::DaoSaleStart)
            .with_treasury_mint(Ratio::new(0, 1)),
    );

    let table = TransitionTable::from_config(&config);
    let transition = table.from_stage(Stage::Presale2).unwrap();

    assert!(!transition
        .actions
        .iter()
        .any(|a| matches!(a, EntryAction::TreasuryMint(_))));
}

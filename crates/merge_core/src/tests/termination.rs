use super::*;

#[test]
fn full_board_gridlocks_on_the_first_stage() {
    let config = base_config(5);
    let mut state = board_state(&config, board_from_layout(&["1o 2o"]));
    let mut rng = make_rng();

    let events =
        advance_stage(&mut state, &config, &mut FirstPairMoves, &mut rng, EventLevel::Normal)
            .unwrap();

    assert_eq!(state.status, RunStatus::Gridlocked);
    assert_eq!(state.meta.stage, 1);
    assert_eq!(state.energy, 1);
    assert_eq!(
        events.last().map(|e| &e.event),
        Some(&Event::StatusChanged {
            status: RunStatus::Gridlocked
        })
    );
}

#[test]
fn full_board_with_a_pair_merges_before_gridlocking() {
    let config = base_config(5);
    let mut state = board_state(&config, board_from_layout(&["1o 1o"]));
    let mut rng = make_rng();

    let events =
        advance_stage(&mut state, &config, &mut FirstPairMoves, &mut rng, EventLevel::Normal)
            .unwrap();

    // 1+1 frees a cell, the stage's energy fills it again.
    assert_eq!(state.status, RunStatus::Running);
    assert_eq!(state.energy, 0);
    assert_eq!(state.progress.milestones.get(2), Some(1));
    assert_eq!(
        events.iter().map(|e| &e.event).collect::<Vec<_>>(),
        vec![&Event::MilestoneReached { tier: 2 }]
    );
    let Field::Board(board) = &state.field else {
        panic!("board run");
    };
    assert_eq!(board.max_tier(), 2);
    assert_eq!(board.item_count(), 2);

    advance_stage(&mut state, &config, &mut FirstPairMoves, &mut rng, EventLevel::Normal).unwrap();

    assert_eq!(state.status, RunStatus::Gridlocked);
    assert_eq!(state.meta.stage, 2);
    assert_eq!(state.energy, 1);
}

#[test]
fn resumed_board_drains_pending_pairs_first() {
    let config = base_config(5);
    let mut state = board_state(&config, board_from_layout(&["2o 2o 1o"]));
    let mut rng = make_rng();

    advance_stage(&mut state, &config, &mut FirstPairMoves, &mut rng, EventLevel::Normal).unwrap();

    // 2+2 merges before the new item lands; that item then pairs with the 1.
    assert_eq!(state.progress.milestones.get(3), Some(1));
    assert_eq!(state.status, RunStatus::Running);
    assert_eq!(state.field.item_count(), 2);
}

#[test]
fn sealed_center_cell_gridlocks_once_filled() {
    let config = base_config(5);
    let board = board_from_layout(&["1c 1c 1c", "1c 0o 1c", "1c 1c 1c"]);
    let mut state = board_state(&config, board);
    let mut rng = make_rng();

    let outcome = run(&mut state, &config, &mut FirstPairMoves, &mut rng).unwrap();

    // Neighbors turn SemiOpen but nothing ever merges into them.
    assert_eq!(outcome.status, RunStatus::Gridlocked);
    assert_eq!(outcome.final_stage, 2);
    assert_eq!(outcome.energy_left, 1);
    assert!(outcome.milestones.is_empty());
}

#[test]
fn unreachable_target_times_out_after_max_stages() {
    let mut config = base_config(30);
    config.max_stages = 50;
    let mut state = ledger_state(&config);
    let mut rng = make_rng();

    let outcome = run(&mut state, &config, &mut NoMoves, &mut rng).unwrap();

    assert_eq!(outcome.status, RunStatus::TimedOut);
    assert_eq!(outcome.final_stage, 50);
    assert_eq!(outcome.stages_played, 50);
}

#[test]
fn absurd_target_tier_times_out_instead_of_exhausting_memory() {
    let mut config = base_config(4_000_000_000);
    config.max_stages = 3;
    let mut state = ledger_state(&config);
    let mut rng = make_rng();

    let outcome = run(&mut state, &config, &mut NoMoves, &mut rng).unwrap();

    assert_eq!(outcome.status, RunStatus::TimedOut);
    assert_eq!(outcome.final_stage, 3);
    let Field::Ledger(ledger) = &outcome.field else {
        panic!("ledger run");
    };
    assert_eq!(ledger.counts(), &[1, 1]);
}

#[test]
fn timeout_counts_from_the_start_stage() {
    let mut config = base_config(30);
    config.start_stage = 7;
    config.max_stages = 10;
    let mut state = ledger_state(&config);
    let mut rng = make_rng();

    let outcome = run(&mut state, &config, &mut NoMoves, &mut rng).unwrap();

    assert_eq!(outcome.status, RunStatus::TimedOut);
    assert_eq!(outcome.final_stage, 16);
    assert_eq!(outcome.stages_played, 10);
}

#[test]
fn success_on_the_last_allowed_stage_is_not_a_timeout() {
    let mut config = base_config(3);
    config.max_stages = 4;
    let mut state = ledger_state(&config);
    let mut rng = make_rng();

    let outcome = run(&mut state, &config, &mut NoMoves, &mut rng).unwrap();

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.final_stage, 4);
}

#[test]
fn terminal_state_ignores_further_stages() {
    let mut config = base_config(3);
    config.max_stages = 4;
    let mut state = ledger_state(&config);
    let mut rng = make_rng();
    run(&mut state, &config, &mut NoMoves, &mut rng).unwrap();
    let finished = state.clone();

    let events =
        advance_stage(&mut state, &config, &mut NoMoves, &mut rng, EventLevel::Debug).unwrap();

    assert!(events.is_empty());
    assert_eq!(state, finished);
}

#[test]
fn status_change_is_reported_exactly_once() {
    let config = base_config(4);
    let mut state = board_state(&config, open_board(2, 2));
    let mut rng = make_rng();

    let log = play(&mut state, &config, &mut FirstPairMoves, &mut rng, 40);

    let changes = log
        .iter()
        .filter(|e| matches!(e.event, Event::StatusChanged { .. }))
        .count();
    assert!(state.status.is_terminal());
    assert_eq!(changes, 1);
}

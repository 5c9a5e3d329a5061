//! Loads the shipped config files and exercises checkpoint files on disk.

use merge_control::GreedySelector;
use merge_core::*;
use merge_world::{build_initial_state, load_config, load_state, save_state, BoardSource, Variant};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

/// Integration tests run from the crate directory, so go up two levels.
fn content_dir() -> PathBuf {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    PathBuf::from(manifest).join("../../content")
}

#[test]
fn default_config_loads() {
    let config = load_config(&content_dir().join("config.json")).unwrap();
    assert_eq!(config.sim.target_tier, 12);
    assert!(matches!(config.board, BoardSource::Generated(_)));
    assert!(config.sim.bonuses.keys().all(|&tier| tier <= config.sim.target_tier));
}

#[test]
fn small_board_config_loads() {
    let config = load_config(&content_dir().join("small_board.json")).unwrap();
    let BoardSource::Layout(board) = &config.board else {
        panic!("small_board.json ships a fixed layout");
    };
    assert_eq!((board.rows(), board.cols()), (4, 3));
    assert_eq!(board.find_empty_open_cells().len(), 4);
    // Only the default table is used when the file leaves it out.
    assert_eq!(
        config.sim.secondary_probabilities,
        default_secondary_table(config.sim.target_tier)
    );
}

#[test]
fn missing_config_reports_the_path() {
    let err = load_config(&content_dir().join("no_such_config.json")).unwrap_err();
    assert!(format!("{err:#}").contains("no_such_config.json"));
}

#[test]
fn every_shipped_config_builds_both_variants() {
    for entry in std::fs::read_dir(content_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let config = load_config(&path).unwrap();
        for variant in [Variant::Board, Variant::Ledger] {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let state = build_initial_state(&config, variant, 1, &mut rng).unwrap();
            assert_eq!(state.status, RunStatus::Running, "{}", path.display());
            assert_eq!(state.meta.stage + 1, config.sim.start_stage);
        }
    }
}

#[test]
fn checkpoint_resume_matches_uninterrupted_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let config = load_config(&content_dir().join("small_board.json")).unwrap();
    let seed = 11;

    let fresh = || {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = build_initial_state(&config, Variant::Board, seed, &mut rng).unwrap();
        (state, rng)
    };

    let (mut straight, mut straight_rng) = fresh();
    let expected = run(&mut straight, &config.sim, &mut GreedySelector, &mut straight_rng).unwrap();

    let (mut state, mut rng) = fresh();
    for _ in 0..25 {
        advance_stage(
            &mut state,
            &config.sim,
            &mut GreedySelector,
            &mut rng,
            EventLevel::Normal,
        )
        .unwrap();
    }
    save_state(&path, &state, &rng).unwrap();
    assert!(!path.with_extension("json.tmp").exists());

    let (mut resumed, mut resumed_rng) = load_state(&path).unwrap();
    assert_eq!(resumed, state);
    let outcome = run(&mut resumed, &config.sim, &mut GreedySelector, &mut resumed_rng).unwrap();
    assert_eq!(outcome, expected);
}

#[test]
fn checkpoint_is_readable_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let config = load_config(&content_dir().join("config.json")).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut state = build_initial_state(&config, Variant::Ledger, 2, &mut rng).unwrap();
    for _ in 0..10 {
        advance_stage(&mut state, &config.sim, &mut NoMoves, &mut rng, EventLevel::Normal).unwrap();
    }
    save_state(&path, &state, &rng).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["state"]["meta"]["stage"], 10);
    assert_eq!(value["state"]["status"], "running");
    assert!(value["rng_word_pos"].is_u64());
}

#[test]
fn corrupt_checkpoint_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ \"state\": 3 }").unwrap();
    let err = load_state(&path).unwrap_err();
    assert!(format!("{err:#}").contains("parsing state file"));
}

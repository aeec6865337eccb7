//! Tests for Config validation and JSON loading

use seqmem::{Config, SeqMemError, SequenceMemory};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("seqmem_{}_{}.json", name, std::process::id()))
}

fn assert_invalid(config: Config, needle: &str) {
    match config.validate() {
        Err(SeqMemError::InvalidConfig(msg)) => {
            assert!(msg.contains(needle), "expected '{}' in '{}'", needle, msg)
        }
        other => panic!("expected InvalidConfig, got {:?}", other),
    }
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.number_of_columns, 500);
    assert_eq!(config.cells_per_column, 10);
    assert_eq!(config.min_threshold, 8);
    assert_eq!(config.activation_threshold, 12);
    assert_eq!(config.new_synapse_count, 15);
    assert_eq!(config.pam_length, 1);
    assert_eq!(config.max_inf_backtrack, 10);
    assert_eq!(config.max_lrn_backtrack, 5);
    assert_eq!(config.max_seq_length, 32);
    assert_eq!(config.max_segments_per_cell, None);
    assert!(!config.check_synapse_consistency);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_rules() {
    let base = Config::default();

    assert_invalid(
        Config {
            number_of_columns: 0,
            ..base.clone()
        },
        "number_of_columns",
    );
    assert_invalid(
        Config {
            initial_permanence: 1.5,
            ..base.clone()
        },
        "initial_permanence",
    );
    assert_invalid(
        Config {
            connected_permanence: -0.1,
            ..base.clone()
        },
        "connected_permanence",
    );
    assert_invalid(
        Config {
            activation_threshold: 0,
            min_threshold: 0,
            ..base.clone()
        },
        "activation_threshold",
    );
    assert_invalid(
        Config {
            min_threshold: 13,
            ..base.clone()
        },
        "min_threshold",
    );
    assert_invalid(
        Config {
            new_synapse_count: 0,
            ..base.clone()
        },
        "new_synapse_count",
    );
    assert_invalid(
        Config {
            burn_in: 0,
            ..base.clone()
        },
        "burn_in",
    );
    assert_invalid(
        Config {
            max_segments_per_cell: Some(0),
            ..base.clone()
        },
        "max_segments_per_cell",
    );
    assert_invalid(
        Config {
            max_synapses_per_segment: Some(4),
            ..base
        },
        "max_synapses_per_segment",
    );
}

#[test]
fn test_burn_in_unused_without_decay() {
    let config = Config {
        global_decay: 0.0,
        burn_in: 0,
        ..Config::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_engine_rejects_invalid_config() {
    let config = Config {
        permanence_increment: 2.0,
        ..Config::default()
    };
    let err = SequenceMemory::new(config).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_json_round_trip_and_file() {
    let config = Config {
        number_of_columns: 32,
        cells_per_column: 3,
        max_segments_per_cell: Some(8),
        seed: 1234,
        ..Config::default()
    };

    let path = temp_path("round_trip");
    std::fs::write(&path, config.to_json().unwrap()).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, config);
    let memory = SequenceMemory::new(loaded).unwrap();
    assert_eq!(memory.config().number_of_columns, 32);
    assert_eq!(memory.columns().len(), 32);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Config::from_file(temp_path("does_not_exist")).unwrap_err();
    assert!(matches!(err, SeqMemError::Io(_)));
}

#[test]
fn test_malformed_json_is_serialization_error() {
    let err = Config::from_json("{ \"number_of_columns\": \"many\" }").unwrap_err();
    assert!(matches!(err, SeqMemError::Serialization(_)));
    assert!(err.is_config_error());
}

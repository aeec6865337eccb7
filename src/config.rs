//! Configuration record for [`SequenceMemory`](crate::SequenceMemory).
//!
//! A `Config` is immutable once handed to the engine. It serializes to and from
//! JSON so experiments can keep their parameters next to their data.
//!
//! # Example
//!
//! ```
//! use seqmem::Config;
//!
//! let config = Config {
//!     number_of_columns: 6,
//!     cells_per_column: 4,
//!     activation_threshold: 1,
//!     min_threshold: 1,
//!     new_synapse_count: 2,
//!     ..Config::default()
//! };
//! assert!(config.validate().is_ok());
//!
//! let json = config.to_json().unwrap();
//! let restored = Config::from_json(&json).unwrap();
//! assert_eq!(config, restored);
//! ```

use crate::segment::Permanence;
use crate::{Result, SeqMemError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of a sequence memory instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of columns (input width)
    pub number_of_columns: usize,
    /// Cells per column
    pub cells_per_column: usize,
    /// Permanence given to newly grown synapses
    pub initial_permanence: Permanence,
    /// Permanence at which a synapse counts toward segment activation
    pub connected_permanence: Permanence,
    /// Matching synapses (connected or not) a segment needs to be a learning candidate
    pub min_threshold: usize,
    /// Target number of active synapses when growing a segment
    pub new_synapse_count: usize,
    /// Permanence increment on reinforcement
    pub permanence_increment: Permanence,
    /// Permanence decrement on reinforcement of the segment's inactive synapses
    pub permanence_decrement: Permanence,
    /// Active connected synapses needed for a segment to be active
    pub activation_threshold: usize,
    /// Permanence removed from idle segments every `burn_in` ticks
    pub global_decay: Permanence,
    /// Global decay cadence in ticks
    pub burn_in: u64,
    /// Out-of-sequence learning steps tolerated before the sequence is broken
    pub pam_length: usize,
    /// Maximum inference replay depth
    pub max_inf_backtrack: usize,
    /// Maximum learning replay depth
    pub max_lrn_backtrack: usize,
    /// Verify segment invariants after every step
    pub check_synapse_consistency: bool,
    /// Learned sequence length that forces a start-over (0 disables)
    pub max_seq_length: usize,
    /// Segment limit per cell; the least recently active segment is evicted
    pub max_segments_per_cell: Option<usize>,
    /// Synapse limit per segment; the weakest synapses are dropped
    pub max_synapses_per_segment: Option<usize>,
    /// Seed for the synapse sampling RNG
    pub seed: u64,
    /// Diagnostic verbosity of this instance (0 = quiet)
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            number_of_columns: 500,
            cells_per_column: 10,
            initial_permanence: 0.11,
            connected_permanence: 0.50,
            min_threshold: 8,
            new_synapse_count: 15,
            permanence_increment: 0.10,
            permanence_decrement: 0.10,
            activation_threshold: 12,
            global_decay: 0.10,
            burn_in: 2,
            pam_length: 1,
            max_inf_backtrack: 10,
            max_lrn_backtrack: 5,
            check_synapse_consistency: false,
            max_seq_length: 32,
            max_segments_per_cell: None,
            max_synapses_per_segment: None,
            seed: 42,
            verbosity: 0,
        }
    }
}

fn check_unit(name: &str, value: Permanence) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SeqMemError::InvalidConfig(format!(
            "{} must be in [0, 1], got {}",
            name, value
        )))
    }
}

fn invalid(msg: &str) -> Result<()> {
    Err(SeqMemError::InvalidConfig(msg.to_string()))
}

impl Config {
    /// Check every parameter, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.number_of_columns == 0 {
            return invalid("number_of_columns must be > 0");
        }
        if self.cells_per_column == 0 {
            return invalid("cells_per_column must be > 0");
        }

        check_unit("initial_permanence", self.initial_permanence)?;
        check_unit("connected_permanence", self.connected_permanence)?;
        check_unit("permanence_increment", self.permanence_increment)?;
        check_unit("permanence_decrement", self.permanence_decrement)?;
        check_unit("global_decay", self.global_decay)?;

        if self.activation_threshold == 0 {
            return invalid("activation_threshold must be >= 1");
        }
        if self.min_threshold > self.activation_threshold {
            return Err(SeqMemError::InvalidConfig(format!(
                "min_threshold ({}) must be <= activation_threshold ({})",
                self.min_threshold, self.activation_threshold
            )));
        }
        if self.new_synapse_count == 0 {
            return invalid("new_synapse_count must be >= 1");
        }
        if self.global_decay > 0.0 && self.burn_in == 0 {
            return invalid("burn_in must be >= 1 when global_decay is enabled");
        }
        if self.max_segments_per_cell == Some(0) {
            return invalid("max_segments_per_cell must be >= 1 when set");
        }
        if let Some(max_syns) = self.max_synapses_per_segment {
            if max_syns < self.new_synapse_count {
                return Err(SeqMemError::InvalidConfig(format!(
                    "max_synapses_per_segment ({}) must be >= new_synapse_count ({})",
                    max_syns, self.new_synapse_count
                )));
            }
        }

        Ok(())
    }

    /// Total number of cells (columns × cells per column).
    pub fn num_cells(&self) -> usize {
        self.number_of_columns * self.cells_per_column
    }

    /// Size of the input history ring buffer.
    pub fn history_capacity(&self) -> usize {
        self.max_inf_backtrack.max(self.max_lrn_backtrack)
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_num_cells() {
        let config = Config {
            number_of_columns: 6,
            cells_per_column: 4,
            ..Config::default()
        };
        assert_eq!(config.num_cells(), 24);
    }

    #[test]
    fn test_history_capacity() {
        let config = Config {
            max_inf_backtrack: 3,
            max_lrn_backtrack: 7,
            ..Config::default()
        };
        assert_eq!(config.history_capacity(), 7);
    }

    #[test]
    fn test_rejects_zero_cells() {
        let config = Config {
            cells_per_column: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("cells_per_column"));
    }

    #[test]
    fn test_rejects_threshold_order() {
        let config = Config {
            min_threshold: 5,
            activation_threshold: 3,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json(r#"{"number_of_columns": 6, "seed": 7}"#).unwrap();
        assert_eq!(config.number_of_columns, 6);
        assert_eq!(config.seed, 7);
        assert_eq!(config.cells_per_column, Config::default().cells_per_column);
    }
}

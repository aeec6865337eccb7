//! Seqmem - High-Order Sequence Memory
//!
//! Seqmem learns the temporal order of a stream of sparse binary patterns and
//! predicts which pattern comes next. Patterns are given as sets of active
//! **column** indices. Every column holds a fixed number of **cells**; the cell
//! that fires inside an active column encodes the context the input arrived in,
//! so the engine can tell `A B C D` from `E B C F` and predict `D` or `F` after
//! `C` depending on what came first.
//!
//! # Key Characteristics
//!
//! - Online learning: every step both predicts and learns
//! - High-order context through cells per column
//! - Learned structure of dendritic segments and weighted synapses
//! - Backtracking over recent inputs to recover from surprises
//! - Deterministic: learning is seeded, identical inputs give identical graphs
//!
//! # Architecture
//!
//! - **CellState**: dense per-cell flags on `bitvec`, with `CURR`/`PREV` history
//! - **Segment / Synapse**: the learned contexts of a cell
//! - **Column / Cell**: owners of the learned graph
//! - **Inference**: activation (phase 1) and prediction (phase 2)
//! - **LearningEngine**: learn state, segment growth, reinforcement and decay
//! - **Backtracker**: bounded replay of recent inputs
//! - **SequenceMemory**: the engine tying it all together
//!
//! # Examples
//!
//! ## High-Order Sequences
//!
//! ```
//! use seqmem::{Config, SequenceMemory};
//!
//! let config = Config {
//!     number_of_columns: 6,
//!     cells_per_column: 4,
//!     initial_permanence: 0.3,
//!     connected_permanence: 0.5,
//!     min_threshold: 1,
//!     activation_threshold: 1,
//!     new_synapse_count: 2,
//!     global_decay: 0.0,
//!     max_lrn_backtrack: 0,
//!     ..Config::default()
//! };
//! let mut memory = SequenceMemory::new(config).unwrap();
//!
//! // A B C D and E B C F share the middle B C
//! let (a, b, c, d, e, f) = (0, 1, 2, 3, 4, 5);
//! for seq in [[a, b, c, d], [e, b, c, f]] {
//!     for _ in 0..5 {
//!         for &column in &seq {
//!             memory.compute(&[column], true, true).unwrap();
//!         }
//!         memory.reset();
//!     }
//! }
//!
//! // Without context, B C is ambiguous
//! memory.compute(&[b], false, true).unwrap();
//! memory.compute(&[c], false, true).unwrap();
//! assert_eq!(memory.predicted_state().active_columns(), vec![d, f]);
//!
//! // With A in front only D is predicted
//! memory.reset();
//! for column in [a, b, c] {
//!     memory.compute(&[column], false, true).unwrap();
//! }
//! assert_eq!(memory.predicted_state().active_columns(), vec![d]);
//! ```
//!
//! # Safety
//!
//! Seqmem uses `debug_assert!` for bounds checking in the cell-state hot paths;
//! every public entry point validates indices and returns a range error instead.

pub mod backtrack;
pub mod cell_state;
pub mod column;
pub mod config;
pub mod error;
pub mod inference;
pub mod learning;
pub mod segment;
pub mod sequence_memory;
pub mod utils;

// Re-exports for convenient access
pub use backtrack::{Backtracker, Replay};
pub use cell_state::{CellState, StateHistory, CURR, PREV};
pub use column::{Cell, Column, SegmentMatch};
pub use config::Config;
pub use error::{Result, SeqMemError};
pub use inference::Activation;
pub use learning::{LearnOutcome, LearningEngine, SegmentUpdate};
pub use segment::{CellRef, Permanence, Segment, SegmentId, Synapse, PERM_MAX, PERM_MIN};
pub use sequence_memory::{CellFlags, SequenceMemory, StepResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "Seqmem";

/// Get version string
pub fn version() -> String {
    format!("{} v{}", NAME, VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(ver.contains("Seqmem"));
        assert!(ver.contains(VERSION));
    }

    #[test]
    fn test_re_exports() {
        let _state = CellState::new(2, 2);
        let _result: Result<()> = Ok(());
        assert_eq!(CURR, 0);
        assert_eq!(PREV, 1);
    }
}

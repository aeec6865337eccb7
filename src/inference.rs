//! Inference phases 1 and 2.
//!
//! Both phases are pure functions of the learned graph and a pair of cell-state
//! grids, so the direct step and the backtracker's replays share one code path.
//!
//! 1. **Activation**: each active column turns on the cells that were predicted at
//!    the previous step; a column with no predicted cell bursts.
//! 2. **Prediction**: a cell becomes predictive when one of its segments is active
//!    against the new active cells.

use crate::cell_state::CellState;
use crate::column::Column;
use crate::segment::Permanence;

/// Outcome of phase 1 for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Activation {
    /// Active columns that had at least one predicted cell
    pub num_predicted_columns: usize,
    /// Active columns that burst
    pub num_bursting_columns: usize,
}

impl Activation {
    /// Number of active columns processed.
    #[inline]
    pub fn num_active_columns(&self) -> usize {
        self.num_predicted_columns + self.num_bursting_columns
    }

    /// At least half of the active columns were predicted (empty input counts).
    #[inline]
    pub fn in_sequence(&self) -> bool {
        self.num_predicted_columns * 2 >= self.num_active_columns()
    }

    /// Fraction of active columns that burst.
    pub fn anomaly_score(&self) -> f64 {
        let total = self.num_active_columns();
        if total == 0 {
            0.0
        } else {
            self.num_bursting_columns as f64 / total as f64
        }
    }
}

/// Phase 1: compute `active` from the input and the previous prediction.
pub fn activate(
    active_columns: &[usize],
    predicted_prev: &CellState,
    active: &mut CellState,
) -> Activation {
    active.clear_all();

    let mut activation = Activation::default();
    for &c in active_columns {
        let mut predicted = false;
        for i in predicted_prev.cells_in_column(c) {
            active.set(c, i);
            predicted = true;
        }

        if predicted {
            activation.num_predicted_columns += 1;
        } else {
            active.set_column(c);
            activation.num_bursting_columns += 1;
        }
    }

    activation
}

/// Phase 2: compute `predicted` from the current active cells.
///
/// Returns the number of predictive cells.
pub fn predict(
    columns: &[Column],
    active: &CellState,
    predicted: &mut CellState,
    connected: Permanence,
    activation_threshold: usize,
) -> usize {
    predicted.clear_all();

    let mut num_predicted = 0;
    for (c, column) in columns.iter().enumerate() {
        for (i, cell) in column.cells().iter().enumerate() {
            if cell.is_predicted_by(active, connected, activation_threshold) {
                predicted.set(c, i);
                num_predicted += 1;
            }
        }
    }

    num_predicted
}

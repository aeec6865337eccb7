//! CellState - Dense per-cell boolean state backed by `bitvec`.
//!
//! Every per-step flag of the engine (active, predictive, learning) is stored as
//! one bit per cell in a `[columns × cells]` grid, laid out column-major so a
//! column's cells are contiguous. [`StateHistory`] keeps the current and previous
//! step of one flag, mirroring the `CURR`/`PREV` time indexing used for block
//! outputs with history.
//!
//! # Examples
//!
//! ```
//! use seqmem::CellState;
//!
//! let mut state = CellState::new(6, 4);
//! state.set(2, 1);
//! state.set_column(5);
//!
//! assert!(state.get(2, 1));
//! assert_eq!(state.num_set(), 5);
//! assert_eq!(state.active_columns(), vec![2, 5]);
//! ```

use crate::segment::CellRef;
use bitvec::prelude::*;

/// Time index of the current step in a [`StateHistory`]
pub const CURR: usize = 0;

/// Time index of the previous step in a [`StateHistory`]
pub const PREV: usize = 1;

/// Dense boolean grid with one bit per cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellState {
    bits: BitVec<u32, Lsb0>,
    num_columns: usize,
    cells_per_column: usize,
}

impl CellState {
    /// Create an all-false grid.
    pub fn new(num_columns: usize, cells_per_column: usize) -> Self {
        Self {
            bits: bitvec![u32, Lsb0; 0; num_columns * cells_per_column],
            num_columns,
            cells_per_column,
        }
    }

    #[inline(always)]
    fn idx(&self, column: usize, cell: usize) -> usize {
        debug_assert!(
            column < self.num_columns && cell < self.cells_per_column,
            "cell ({}, {}) out of bounds ({} x {})",
            column,
            cell,
            self.num_columns,
            self.cells_per_column
        );
        column * self.cells_per_column + cell
    }

    /// Number of columns in the grid.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Cells per column in the grid.
    #[inline]
    pub fn cells_per_column(&self) -> usize {
        self.cells_per_column
    }

    /// Read the flag of one cell.
    #[inline]
    pub fn get(&self, column: usize, cell: usize) -> bool {
        self.bits[self.idx(column, cell)]
    }

    /// Read the flag of a cell reference.
    #[inline]
    pub fn contains(&self, cell: CellRef) -> bool {
        self.get(cell.column, cell.cell)
    }

    /// Set the flag of one cell.
    #[inline]
    pub fn set(&mut self, column: usize, cell: usize) {
        let i = self.idx(column, cell);
        self.bits.set(i, true);
    }

    /// Clear the flag of one cell.
    #[inline]
    pub fn clear(&mut self, column: usize, cell: usize) {
        let i = self.idx(column, cell);
        self.bits.set(i, false);
    }

    /// Set every cell of a column (bursting).
    pub fn set_column(&mut self, column: usize) {
        let beg = self.idx(column, 0);
        self.bits[beg..beg + self.cells_per_column].fill(true);
    }

    /// Clear every cell.
    pub fn clear_all(&mut self) {
        self.bits.fill(false);
    }

    /// Overwrite this grid with another of the same shape.
    pub fn copy_from(&mut self, other: &CellState) {
        debug_assert_eq!(self.bits.len(), other.bits.len());
        self.bits.copy_from_bitslice(&other.bits);
    }

    /// Number of set cells.
    #[inline]
    pub fn num_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// True when no cell is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// True when at least one cell of `column` is set.
    pub fn column_any(&self, column: usize) -> bool {
        let beg = self.idx(column, 0);
        self.bits[beg..beg + self.cells_per_column].any()
    }

    /// Indices of the set cells within `column`, ascending.
    pub fn cells_in_column(&self, column: usize) -> impl Iterator<Item = usize> + '_ {
        let beg = self.idx(column, 0);
        self.bits[beg..beg + self.cells_per_column].iter_ones()
    }

    /// Columns with at least one set cell, ascending.
    pub fn active_columns(&self) -> Vec<usize> {
        (0..self.num_columns).filter(|&c| self.column_any(c)).collect()
    }

    /// All set cells in (column, cell) order.
    pub fn active_cells(&self) -> Vec<CellRef> {
        let cpc = self.cells_per_column;
        self.bits
            .iter_ones()
            .map(|i| CellRef::new(i / cpc, i % cpc))
            .collect()
    }

    /// Dense `[columns][cells]` boolean matrix snapshot.
    pub fn to_matrix(&self) -> Vec<Vec<bool>> {
        self.bits
            .chunks(self.cells_per_column)
            .map(|col| col.iter().by_vals().collect())
            .collect()
    }
}

/// Current and previous step of one per-cell flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateHistory {
    states: [CellState; 2],
}

impl StateHistory {
    /// Create a history with both steps cleared.
    pub fn new(num_columns: usize, cells_per_column: usize) -> Self {
        let state = CellState::new(num_columns, cells_per_column);
        Self {
            states: [state.clone(), state],
        }
    }

    /// State at time `t` (`CURR` or `PREV`).
    #[inline]
    pub fn at(&self, t: usize) -> &CellState {
        &self.states[t]
    }

    /// Current step.
    #[inline]
    pub fn curr(&self) -> &CellState {
        &self.states[CURR]
    }

    /// Previous step.
    #[inline]
    pub fn prev(&self) -> &CellState {
        &self.states[PREV]
    }

    /// Mutable current step.
    #[inline]
    pub fn curr_mut(&mut self) -> &mut CellState {
        &mut self.states[CURR]
    }

    /// Advance one step: current becomes previous, current is cleared.
    pub fn step(&mut self) {
        self.states.swap(CURR, PREV);
        self.states[CURR].clear_all();
    }

    /// Clear both steps.
    pub fn clear(&mut self) {
        self.states[CURR].clear_all();
        self.states[PREV].clear_all();
    }
}

//! Columns and cells - owners of the learned segment graph.
//!
//! The graph is a tree of flat vectors: the engine owns `Vec<Column>`, each column
//! owns `Vec<Cell>`, each cell owns `Vec<Segment>`. Synapses refer to their
//! presynaptic cell by [`CellRef`](crate::segment::CellRef) index, never by pointer, so there are no
//! ownership cycles.

use crate::cell_state::CellState;
use crate::segment::{Segment, SegmentId};

/// A cell: owns the segments that can make it predictive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    segments: Vec<Segment>,
}

/// Best matching segment found on a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentMatch {
    /// Cell index within the column
    pub cell: usize,
    /// Position of the segment on the cell
    pub segment_index: usize,
    /// Stable id of the segment
    pub segment_id: SegmentId,
    /// Matching synapse count
    pub count: usize,
}

impl Cell {
    /// Segments in creation order.
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Segment at position `index`.
    #[inline]
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// True when any segment is active against `state`.
    pub fn is_predicted_by(&self, state: &CellState, connected: f64, threshold: usize) -> bool {
        self.segments
            .iter()
            .any(|s| s.is_active(state, connected, threshold))
    }

    pub(crate) fn segment_by_id_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id() == id)
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    pub(crate) fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub(crate) fn remove_segment(&mut self, id: SegmentId) -> Option<Segment> {
        let pos = self.segments.iter().position(|s| s.id() == id)?;
        Some(self.segments.remove(pos))
    }

    /// Remove segments with no synapses. Returns how many were removed.
    pub(crate) fn remove_empty_segments(&mut self) -> usize {
        let before = self.segments.len();
        self.segments.retain(|s| !s.is_empty());
        before - self.segments.len()
    }

    /// Evict the segment that has gone longest without reinforcement.
    pub(crate) fn evict_least_recent(&mut self) -> Option<Segment> {
        let pos = self
            .segments
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.last_active_tick())
            .map(|(i, _)| i)?;
        Some(self.segments.remove(pos))
    }
}

/// A fixed-size group of cells addressed by one input bit.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    cells: Vec<Cell>,
}

impl Column {
    /// Create a column with `cells_per_column` empty cells.
    pub fn new(cells_per_column: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cells_per_column],
        }
    }

    /// Cells in index order.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at `index`.
    #[inline]
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub(crate) fn cell_mut(&mut self, index: usize) -> &mut Cell {
        &mut self.cells[index]
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Best segment on any cell of this column against `state`.
    ///
    /// Counts all synapses, connected or not. Only counts `>= min_count` qualify;
    /// ties go to the lowest cell index, then the lowest segment position.
    pub fn best_matching_segment(&self, state: &CellState, min_count: usize) -> Option<SegmentMatch> {
        let mut best: Option<SegmentMatch> = None;
        for (cell, c) in self.cells.iter().enumerate() {
            for (segment_index, seg) in c.segments.iter().enumerate() {
                let count = seg.num_matching(state);
                if count < min_count || best.is_some_and(|b| count <= b.count) {
                    continue;
                }
                best = Some(SegmentMatch {
                    cell,
                    segment_index,
                    segment_id: seg.id(),
                    count,
                });
            }
        }
        best
    }

    /// Cell with the fewest segments, lowest index on ties.
    pub fn least_used_cell(&self) -> usize {
        self.cells
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| (c.num_segments(), *i))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Total synapses over all cells of the column.
    pub fn num_synapses(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|c| c.segments.iter())
            .map(Segment::num_synapses)
            .sum()
    }
}

//! Segments and synapses - the learned contexts of a cell.
//!
//! A [`Segment`] is an ordered list of [`Synapse`]s, each pointing at a
//! presynaptic cell with a permanence in `[0, 1]`. A synapse is *connected* once
//! its permanence reaches the connected threshold. Against a set of active cells:
//!
//! - a segment is **active** when enough *connected* synapses see active cells
//!   (`activation_threshold`)
//! - a segment is **matching** when enough synapses, connected or not, see active
//!   cells (`min_threshold`)
//!
//! Segments are addressed by a stable [`SegmentId`] so queued learning updates can
//! find their segment even after earlier segments were pruned.

use crate::cell_state::CellState;
use std::fmt;

/// Permanence scalar, always kept in `[PERM_MIN, PERM_MAX]`
pub type Permanence = f64;

/// Minimum permanence value
pub const PERM_MIN: Permanence = 0.0;

/// Maximum permanence value
pub const PERM_MAX: Permanence = 1.0;

/// Stable identifier of a segment, unique within one engine instance
pub type SegmentId = u32;

/// Address of a cell: `(column, cell within column)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// Column index
    pub column: usize,
    /// Cell index within the column
    pub cell: usize,
}

impl CellRef {
    /// Create a cell reference.
    #[inline]
    pub const fn new(column: usize, cell: usize) -> Self {
        Self { column, cell }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.cell)
    }
}

/// A weighted connection to a presynaptic cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Synapse {
    presynaptic: CellRef,
    permanence: Permanence,
}

impl Synapse {
    fn new(presynaptic: CellRef, permanence: Permanence) -> Self {
        Self {
            presynaptic,
            permanence: permanence.clamp(PERM_MIN, PERM_MAX),
        }
    }

    /// The cell this synapse listens to.
    #[inline]
    pub fn presynaptic_cell(&self) -> CellRef {
        self.presynaptic
    }

    /// Current permanence.
    #[inline]
    pub fn permanence(&self) -> Permanence {
        self.permanence
    }

    /// True when the permanence reaches `threshold`.
    #[inline]
    pub fn is_connected(&self, threshold: Permanence) -> bool {
        self.permanence >= threshold
    }

    #[inline]
    fn adjust(&mut self, delta: Permanence) {
        self.permanence = (self.permanence + delta).clamp(PERM_MIN, PERM_MAX);
    }
}

impl fmt::Display for Synapse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {:.2}]",
            self.presynaptic.column, self.presynaptic.cell, self.permanence
        )
    }
}

/// One learned context of a cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    id: SegmentId,
    synapses: Vec<Synapse>,
    sequence_segment: bool,
    creation_tick: u64,
    last_active_tick: u64,
    positive_activations: u64,
    total_activations: u64,
}

impl Segment {
    pub(crate) fn new(id: SegmentId, sequence_segment: bool, tick: u64) -> Self {
        Self {
            id,
            synapses: Vec::new(),
            sequence_segment,
            creation_tick: tick,
            last_active_tick: tick,
            positive_activations: 0,
            total_activations: 0,
        }
    }

    /// Stable id of the segment.
    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Synapses in growth order.
    #[inline]
    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    /// Number of synapses.
    #[inline]
    pub fn num_synapses(&self) -> usize {
        self.synapses.len()
    }

    /// True when the segment has no synapses left.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }

    /// True for segments grown to predict the very next step. The learner only
    /// grows sequence segments.
    #[inline]
    pub fn is_sequence_segment(&self) -> bool {
        self.sequence_segment
    }

    /// Learning iteration at which the segment was grown.
    #[inline]
    pub fn creation_tick(&self) -> u64 {
        self.creation_tick
    }

    /// Learning iteration of the last reinforcement.
    #[inline]
    pub fn last_active_tick(&self) -> u64 {
        self.last_active_tick
    }

    /// Number of reinforcements applied.
    #[inline]
    pub fn positive_activations(&self) -> u64 {
        self.positive_activations
    }

    /// Number of times the segment was selected as a learning candidate.
    #[inline]
    pub fn total_activations(&self) -> u64 {
        self.total_activations
    }

    /// True when a synapse to `cell` exists.
    pub fn contains(&self, cell: CellRef) -> bool {
        self.synapses.iter().any(|s| s.presynaptic == cell)
    }

    /// Count synapses (connected or not) whose presynaptic cell is set in `state`.
    pub fn num_matching(&self, state: &CellState) -> usize {
        self.synapses
            .iter()
            .filter(|s| state.contains(s.presynaptic))
            .count()
    }

    /// Count connected synapses whose presynaptic cell is set in `state`.
    pub fn num_active_connected(&self, state: &CellState, connected: Permanence) -> usize {
        self.synapses
            .iter()
            .filter(|s| s.is_connected(connected) && state.contains(s.presynaptic))
            .count()
    }

    /// Active-segment test used for prediction.
    #[inline]
    pub fn is_active(&self, state: &CellState, connected: Permanence, threshold: usize) -> bool {
        self.num_active_connected(state, connected) >= threshold
    }

    /// First presynaptic cell that appears on more than one synapse.
    pub fn duplicate_presynaptic_cell(&self) -> Option<CellRef> {
        let mut seen: Vec<CellRef> = Vec::with_capacity(self.synapses.len());
        for s in &self.synapses {
            if seen.contains(&s.presynaptic) {
                return Some(s.presynaptic);
            }
            seen.push(s.presynaptic);
        }
        None
    }

    /// Add a synapse unless one to `cell` already exists. Returns true if added.
    pub(crate) fn add_synapse(&mut self, cell: CellRef, permanence: Permanence) -> bool {
        if self.contains(cell) {
            return false;
        }
        self.synapses.push(Synapse::new(cell, permanence));
        true
    }

    /// Reinforce: `+inc` on synapses to `reinforced` cells, `-dec` on the others.
    pub(crate) fn reinforce(&mut self, reinforced: &[CellRef], inc: Permanence, dec: Permanence) {
        for s in self.synapses.iter_mut() {
            if reinforced.contains(&s.presynaptic) {
                s.adjust(inc);
            } else {
                s.adjust(-dec);
            }
        }
    }

    /// Subtract `dec` from the synapses to `cells`, leaving the others untouched.
    pub(crate) fn punish(&mut self, cells: &[CellRef], dec: Permanence) {
        for s in self.synapses.iter_mut() {
            if cells.contains(&s.presynaptic) {
                s.adjust(-dec);
            }
        }
    }

    /// Subtract `amount` from every synapse.
    pub(crate) fn decay(&mut self, amount: Permanence) {
        for s in self.synapses.iter_mut() {
            s.adjust(-amount);
        }
    }

    /// Remove synapses whose permanence fell to zero. Returns how many were removed.
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.synapses.len();
        self.synapses.retain(|s| s.permanence > PERM_MIN);
        before - self.synapses.len()
    }

    /// Drop the weakest synapses until at most `max` remain.
    pub(crate) fn limit_synapses(&mut self, max: usize) {
        if self.synapses.len() <= max {
            return;
        }
        let excess = self.synapses.len() - max;
        let mut order: Vec<usize> = (0..self.synapses.len()).collect();
        order.sort_by(|&a, &b| {
            self.synapses[a]
                .permanence
                .total_cmp(&self.synapses[b].permanence)
        });
        let mut drop = order[..excess].to_vec();
        drop.sort_unstable();
        for &i in drop.iter().rev() {
            self.synapses.remove(i);
        }
    }

    pub(crate) fn mark_active(&mut self, tick: u64) {
        self.last_active_tick = tick;
        self.positive_activations += 1;
    }

    pub(crate) fn mark_candidate(&mut self) {
        self.total_activations += 1;
    }

    /// Append a synapse without the duplicate check, to build broken segments.
    #[cfg(test)]
    pub(crate) fn push_synapse_unchecked(&mut self, cell: CellRef, permanence: Permanence) {
        self.synapses.push(Synapse::new(cell, permanence));
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.synapses.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn segment_with(cells: &[(usize, usize)], perm: Permanence) -> Segment {
        let mut seg = Segment::new(0, true, 0);
        for &(c, i) in cells {
            seg.add_synapse(CellRef::new(c, i), perm);
        }
        seg
    }

    #[test]
    fn test_add_synapse_rejects_duplicates() {
        let mut seg = Segment::new(3, true, 5);
        assert!(seg.add_synapse(CellRef::new(0, 0), 0.3));
        assert!(!seg.add_synapse(CellRef::new(0, 0), 0.9));
        assert_eq!(seg.num_synapses(), 1);
        assert_eq!(seg.duplicate_presynaptic_cell(), None);
        assert_eq!(seg.creation_tick(), 5);
    }

    #[test]
    fn test_matching_vs_active() {
        let seg = segment_with(&[(0, 0), (1, 0)], 0.3);
        let mut state = CellState::new(2, 2);
        state.set(0, 0);
        state.set(1, 0);

        assert_eq!(seg.num_matching(&state), 2);
        assert_eq!(seg.num_active_connected(&state, 0.5), 0);
        assert!(!seg.is_active(&state, 0.5, 1));
        assert!(seg.is_active(&state, 0.3, 2));
    }

    #[test]
    fn test_reinforce_clamps() {
        let mut seg = segment_with(&[(0, 0), (1, 1)], 0.95);
        seg.reinforce(&[CellRef::new(0, 0)], 0.1, 0.05);
        assert_relative_eq!(seg.synapses()[0].permanence(), 1.0);
        assert_relative_eq!(seg.synapses()[1].permanence(), 0.90, epsilon = 1e-12);
    }

    #[test]
    fn test_punish_only_listed_synapses() {
        let mut seg = segment_with(&[(0, 0), (1, 1)], 0.3);
        seg.punish(&[CellRef::new(1, 1)], 0.1);
        assert_relative_eq!(seg.synapses()[0].permanence(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(seg.synapses()[1].permanence(), 0.2, epsilon = 1e-12);

        seg.punish(&[CellRef::new(1, 1)], 0.5);
        assert_relative_eq!(seg.synapses()[1].permanence(), PERM_MIN);
        assert_eq!(seg.prune(), 1);
        assert_eq!(seg.num_synapses(), 1);
    }

    #[test]
    fn test_decay_and_prune() {
        let mut seg = segment_with(&[(0, 0), (0, 1)], 0.3);
        seg.reinforce(&[CellRef::new(0, 0)], 0.1, 0.0);
        seg.decay(0.3);
        assert_eq!(seg.prune(), 1);
        assert_eq!(seg.num_synapses(), 1);
        assert_eq!(seg.synapses()[0].presynaptic_cell(), CellRef::new(0, 0));
    }

    #[test]
    fn test_limit_synapses_drops_weakest() {
        let mut seg = segment_with(&[(0, 0), (0, 1), (0, 2)], 0.3);
        seg.reinforce(&[CellRef::new(0, 0), CellRef::new(0, 2)], 0.2, 0.1);
        seg.limit_synapses(2);
        let cells: Vec<_> = seg.synapses().iter().map(|s| s.presynaptic_cell()).collect();
        assert_eq!(cells, vec![CellRef::new(0, 0), CellRef::new(0, 2)]);
    }

    #[test]
    fn test_display() {
        let seg = segment_with(&[(2, 1)], 0.5);
        assert_eq!(seg.to_string(), "[[2, 1, 0.50]]");
    }
}

//! Backtracker - bounded replay of recent inputs.
//!
//! The backtracker keeps a ring buffer of the inputs of the last few steps. When a
//! pure inference step is surprised (out of sequence, or nothing predicted), it
//! replays the buffered inputs against the learned graph, starting at increasingly
//! distant steps, and keeps the replay that ends with the most specific non-empty
//! prediction. Replays never touch the learned graph and run as a bounded loop.
//!
//! The same buffer also feeds the learner's start-over search, see
//! [`LearningEngine`](crate::learning::LearningEngine).

use crate::cell_state::CellState;
use crate::column::Column;
use crate::inference;
use crate::segment::Permanence;
use std::collections::VecDeque;

/// Outcome of a successful inference replay.
#[derive(Clone, Debug, PartialEq)]
pub struct Replay {
    /// How many buffered steps the replay started back
    pub depth: usize,
    /// Active cells at the current step
    pub active: CellState,
    /// Predictive cells at the current step
    pub predicted: CellState,
    /// Number of predictive cells
    pub num_predicted: usize,
}

/// Bounded history of recent input column sets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Backtracker {
    history: VecDeque<Vec<usize>>,
    capacity: usize,
}

impl Backtracker {
    /// Create a backtracker remembering at most `capacity` previous inputs.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Maximum number of buffered inputs.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered inputs.
    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True when nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Buffered inputs, oldest first.
    pub fn history(&self) -> &VecDeque<Vec<usize>> {
        &self.history
    }

    /// The `n` most recent inputs, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &[usize]> + '_ {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).map(Vec::as_slice)
    }

    /// Record the input of a finished step.
    pub fn push(&mut self, active_columns: &[usize]) {
        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(active_columns.to_vec());
    }

    /// Forget all buffered inputs.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Replay up to `max_depth` buffered steps followed by `current`.
    ///
    /// For each depth the buffered input `depth` steps back is treated as bursting,
    /// and every later step, `current` included, must be in sequence. Among
    /// successful replays the one with the fewest non-zero predictive cells wins;
    /// a shallower depth wins ties. Returns `None` when no depth succeeds.
    pub fn replay(
        &self,
        columns: &[Column],
        current: &[usize],
        max_depth: usize,
        connected: Permanence,
        activation_threshold: usize,
    ) -> Option<Replay> {
        let num_columns = columns.len();
        let cells_per_column = columns.first().map_or(0, |c| c.cells().len());
        let max_depth = max_depth.min(self.history.len());

        let mut active = CellState::new(num_columns, cells_per_column);
        let mut predicted = CellState::new(num_columns, cells_per_column);
        let mut predicted_prev = CellState::new(num_columns, cells_per_column);
        let mut best: Option<Replay> = None;

        for depth in 1..=max_depth {
            let start = self.history.len() - depth;
            let steps = self
                .history
                .iter()
                .skip(start + 1)
                .map(Vec::as_slice)
                .chain(std::iter::once(current));

            // The start step bursts: there is no earlier prediction to consult
            predicted_prev.clear_all();
            inference::activate(&self.history[start], &predicted_prev, &mut active);
            let mut num_predicted = inference::predict(
                columns,
                &active,
                &mut predicted,
                connected,
                activation_threshold,
            );

            let mut in_sequence = true;
            for step in steps {
                std::mem::swap(&mut predicted, &mut predicted_prev);
                if !inference::activate(step, &predicted_prev, &mut active).in_sequence() {
                    in_sequence = false;
                    break;
                }
                num_predicted = inference::predict(
                    columns,
                    &active,
                    &mut predicted,
                    connected,
                    activation_threshold,
                );
            }

            if !in_sequence || num_predicted == 0 {
                continue;
            }
            if best.as_ref().is_some_and(|b| num_predicted >= b.num_predicted) {
                continue;
            }

            best = Some(Replay {
                depth,
                active: active.clone(),
                predicted: predicted.clone(),
                num_predicted,
            });
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_bounded() {
        let mut bt = Backtracker::new(2);
        bt.push(&[0]);
        bt.push(&[1]);
        bt.push(&[2]);
        assert_eq!(bt.len(), 2);
        let recent: Vec<_> = bt.recent(5).collect();
        assert_eq!(recent, vec![&[1][..], &[2][..]]);
        let last: Vec<_> = bt.recent(1).collect();
        assert_eq!(last, vec![&[2][..]]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut bt = Backtracker::new(0);
        bt.push(&[3]);
        assert!(bt.is_empty());
    }

    #[test]
    fn test_replay_without_segments_fails() {
        let columns = vec![Column::new(2); 4];
        let mut bt = Backtracker::new(3);
        bt.push(&[0]);
        bt.push(&[1]);
        assert!(bt.replay(&columns, &[2], 3, 0.5, 1).is_none());
    }
}

//! LearningEngine - learn-state machine and structural plasticity.
//!
//! Learning runs on its own cell-state grids, separate from inference, and keeps
//! exactly one learning cell per active column. Each learning step:
//!
//! 1. applies the segment updates queued last step to cells whose column is now
//!    active, and weakens the synapses of the rest
//! 2. **learn phase 1** picks a learning cell per active column, growing or
//!    reinforcing a sequence segment for columns nobody predicted
//! 3. tracks sequence continuity with the pam counter and starts over (learning
//!    backtrack, else start cells) when the sequence is broken
//! 4. **learn phase 2** predicts at most one cell per column and queues its
//!    segment update for the next step
//! 5. decays segments left unreinforced for a multiple of `burn_in` iterations
//!
//! Segment timestamps count learning iterations, not `compute` calls, so
//! inference-only steps never age the learned graph.
//!
//! Synapse sampling uses a `StdRng` seeded from the configuration, so two engines
//! built from the same configuration learn identical structures.

use crate::backtrack::Backtracker;
use crate::cell_state::{CellState, StateHistory};
use crate::column::{Cell, Column};
use crate::config::Config;
use crate::segment::{CellRef, Segment, SegmentId};
use crate::utils::sample;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::debug;

/// A queued change to one segment.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentUpdate {
    /// Target segment; `None` grows a new one
    pub segment: Option<SegmentId>,
    /// Presynaptic cells that were in the learn state when the update was made
    pub active_synapses: Vec<CellRef>,
    /// Presynaptic cells to grow new synapses to
    pub new_synapses: Vec<CellRef>,
    /// Learning iteration at which the update was made
    pub created_at: u64,
}

/// Learn-state grids with their previous step.
#[derive(Clone, Debug, PartialEq)]
pub struct LearnStates {
    /// Learning cells
    pub active: StateHistory,
    /// Learn-predicted cells, one at most per column
    pub predicted: StateHistory,
}

impl LearnStates {
    fn new(num_columns: usize, cells_per_column: usize) -> Self {
        Self {
            active: StateHistory::new(num_columns, cells_per_column),
            predicted: StateHistory::new(num_columns, cells_per_column),
        }
    }

    fn step(&mut self) {
        self.active.step();
        self.predicted.step();
    }

    fn clear(&mut self) {
        self.active.clear();
        self.predicted.clear();
    }

    fn start_cells(&mut self, active_columns: &[usize]) {
        let learn = self.active.curr_mut();
        learn.clear_all();
        for &c in active_columns {
            learn.set(c, 0);
        }
    }
}

/// Summary of one learning step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LearnOutcome {
    /// Learn phase 1 found at least half of the active columns learn-predicted
    pub in_sequence: bool,
    /// The sequence was broken and learning restarted
    pub started_over: bool,
    /// Steps replayed by a successful learning backtrack
    pub backtrack_steps: Option<usize>,
}

/// Computes segment changes against a learn state.
///
/// Active synapses are those of `segment` whose presynaptic cell is set in `state`.
/// With `grow`, up to `new_synapse_count - active` new presynaptic cells are
/// sampled from the remaining set cells of `state`.
fn segment_update(
    segment: Option<&Segment>,
    state: &CellState,
    new_synapse_count: usize,
    grow: bool,
    now: u64,
    rng: &mut StdRng,
) -> SegmentUpdate {
    let active_synapses: Vec<CellRef> = segment
        .map(|seg| {
            seg.synapses()
                .iter()
                .map(|s| s.presynaptic_cell())
                .filter(|&p| state.contains(p))
                .collect()
        })
        .unwrap_or_default();

    let mut new_synapses = Vec::new();
    if grow {
        let wanted = new_synapse_count.saturating_sub(active_synapses.len());
        let candidates: Vec<CellRef> = state
            .active_cells()
            .into_iter()
            .filter(|&p| segment.map_or(true, |seg| !seg.contains(p)))
            .collect();
        new_synapses = sample(candidates, wanted, rng);
    }

    SegmentUpdate {
        segment: segment.map(Segment::id),
        active_synapses,
        new_synapses,
        created_at: now,
    }
}

/// Learning half of the sequence memory.
#[derive(Clone, Debug)]
pub struct LearningEngine {
    config: Config,
    rng: StdRng,
    states: LearnStates,
    pending: BTreeMap<CellRef, Vec<SegmentUpdate>>,
    pam_counter: usize,
    learned_seq_length: usize,
    valid_history: usize,
    next_segment_id: SegmentId,
    iteration: u64,
}

impl LearningEngine {
    /// Create a learner for a validated configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed),
            states: LearnStates::new(config.number_of_columns, config.cells_per_column),
            pending: BTreeMap::new(),
            pam_counter: config.pam_length,
            learned_seq_length: 0,
            valid_history: 0,
            next_segment_id: 0,
            iteration: 0,
        }
    }

    /// Current learning cells.
    pub fn learn_state(&self) -> &CellState {
        self.states.active.curr()
    }

    /// Current learn-predicted cells.
    pub fn learn_predicted_state(&self) -> &CellState {
        self.states.predicted.curr()
    }

    /// Out-of-sequence steps still tolerated before a start-over.
    pub fn pam_counter(&self) -> usize {
        self.pam_counter
    }

    /// Steps learned since the last sequence start.
    pub fn learned_seq_length(&self) -> usize {
        self.learned_seq_length
    }

    /// Learning steps run so far. Segment timestamps are in these units.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Number of queued segment updates.
    pub fn num_pending_updates(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Forget the learn state and all queued updates. The learned graph is kept.
    pub fn reset(&mut self) {
        self.states.clear();
        self.pending.clear();
        self.pam_counter = self.config.pam_length;
        self.learned_seq_length = 0;
        self.valid_history = 0;
    }

    /// Run one learning step for `active_columns` (sorted, deduplicated).
    ///
    /// `history` holds the inputs of previous steps, `tick` is the caller's step
    /// number (used for diagnostics only) and `sequence_start` marks the first
    /// step after a reset.
    pub fn learn(
        &mut self,
        columns: &mut [Column],
        active_columns: &[usize],
        history: &Backtracker,
        tick: u64,
        sequence_start: bool,
    ) -> LearnOutcome {
        self.iteration += 1;
        let now = self.iteration;

        self.states.step();
        self.process_segment_updates(columns, active_columns, now);
        self.learned_seq_length += 1;

        let mut outcome = LearnOutcome::default();

        if sequence_start {
            self.states.start_cells(active_columns);
            self.pam_counter = self.config.pam_length;
            self.learned_seq_length = 0;
            self.valid_history = 0;
            outcome.in_sequence = true;
        } else {
            outcome.in_sequence = self.phase1(columns, active_columns, now, false);

            let mut broken = false;
            if outcome.in_sequence {
                self.pam_counter = self.config.pam_length;
            } else if self.pam_counter > 0 {
                self.pam_counter -= 1;
            } else {
                broken = true;
            }
            let too_long = self.config.max_seq_length != 0
                && self.learned_seq_length >= self.config.max_seq_length;

            if broken || too_long {
                self.start_over(columns, active_columns, history, tick, &mut outcome);
            } else {
                self.valid_history = (self.valid_history + 1).min(self.config.max_lrn_backtrack);
            }
        }

        self.phase2(columns, now, false);
        self.apply_global_decay(columns, tick);

        outcome
    }

    fn start_over(
        &mut self,
        columns: &mut [Column],
        active_columns: &[usize],
        history: &Backtracker,
        tick: u64,
        outcome: &mut LearnOutcome,
    ) {
        outcome.started_over = true;

        let back_steps = if self.config.max_lrn_backtrack > 0 {
            self.backtrack(columns, active_columns, history)
        } else {
            None
        };

        match back_steps {
            Some(steps) => {
                debug!(tick, steps, "learning backtracked");
                self.learned_seq_length = steps;
                self.valid_history = steps.min(self.config.max_lrn_backtrack);
            }
            None => {
                debug!(tick, "learning restarted on start cells");
                self.states.start_cells(active_columns);
                self.learned_seq_length = 0;
                self.valid_history = 0;
            }
        }

        outcome.backtrack_steps = back_steps;
        self.pam_counter = self.config.pam_length;
        self.pending.clear();
    }

    /// Find the oldest buffered start from which the learn state stays in sequence
    /// up to `current`, then replay it for real. Returns the steps replayed.
    fn backtrack(
        &mut self,
        columns: &mut [Column],
        current: &[usize],
        history: &Backtracker,
    ) -> Option<usize> {
        let num_prev = self
            .valid_history
            .min(history.len())
            .min(self.config.max_lrn_backtrack);
        if num_prev == 0 {
            return None;
        }

        let patterns: Vec<&[usize]> = history
            .recent(num_prev)
            .chain(std::iter::once(current))
            .collect();

        let now = self.iteration;
        let start = (0..num_prev).find(|&s| self.replay_from(columns, &patterns, s, now, true))?;
        self.replay_from(columns, &patterns, start, now, false);
        Some(num_prev - start)
    }

    /// Replay `patterns[start..]` from start cells. Returns true when every step
    /// after the start stayed in sequence.
    fn replay_from(
        &mut self,
        columns: &mut [Column],
        patterns: &[&[usize]],
        start: usize,
        now: u64,
        read_only: bool,
    ) -> bool {
        if !read_only {
            self.pending.clear();
        }

        let last = patterns.len() - 1;
        let mut in_sequence = true;
        for (offset, &input) in patterns.iter().enumerate().skip(start) {
            self.states.step();
            if !read_only {
                self.process_segment_updates(columns, input, now);
            }

            if offset == start {
                self.states.start_cells(input);
                in_sequence = true;
            } else {
                in_sequence = self.phase1(columns, input, now, read_only);
            }

            if !in_sequence || offset == last {
                break;
            }
            self.phase2(columns, now, read_only);
        }

        in_sequence
    }

    /// Apply queued updates of cells whose column became active; weaken the
    /// segments of cells that were predicted but stayed inactive.
    fn process_segment_updates(&mut self, columns: &mut [Column], active_columns: &[usize], now: u64) {
        let pending = std::mem::take(&mut self.pending);
        for (cell, updates) in pending {
            let confirmed = active_columns.binary_search(&cell.column).is_ok();
            for update in updates {
                if confirmed {
                    self.adapt(columns, cell, update, now);
                } else {
                    self.punish(columns, cell, &update);
                }
            }
        }
    }

    /// Subtract `permanence_decrement` from the synapses that made a queued
    /// prediction. Zeroed synapses and emptied segments are removed.
    fn punish(&mut self, columns: &mut [Column], cell: CellRef, update: &SegmentUpdate) {
        let Some(id) = update.segment else {
            return;
        };
        let target = columns[cell.column].cell_mut(cell.cell);
        let Some(seg) = target.segment_by_id_mut(id) else {
            return;
        };
        seg.punish(&update.active_synapses, self.config.permanence_decrement);
        let removed = seg.prune();
        if seg.is_empty() {
            target.remove_segment(id);
        }
        debug!(cell = %cell, segment = id, synapses_removed = removed, "mispredicting segment weakened");
    }

    /// Learn phase 1: choose the learning cell of every active column.
    fn phase1(
        &mut self,
        columns: &mut [Column],
        active_columns: &[usize],
        now: u64,
        read_only: bool,
    ) -> bool {
        self.states.active.curr_mut().clear_all();

        let mut num_unpredicted = 0;
        for &c in active_columns {
            let predicted = self.states.predicted.prev().cells_in_column(c).next();
            if let Some(i) = predicted {
                self.states.active.curr_mut().set(c, i);
                continue;
            }

            num_unpredicted += 1;
            if read_only {
                continue;
            }

            let prev = self.states.active.prev();
            let best = columns[c].best_matching_segment(prev, self.config.min_threshold);
            let (i, update) = match best {
                Some(m) => {
                    let seg = columns[c].cell(m.cell).and_then(|cell| cell.segment(m.segment_index));
                    let update = segment_update(
                        seg,
                        prev,
                        self.config.new_synapse_count,
                        true,
                        now,
                        &mut self.rng,
                    );
                    if let Some(seg) = columns[c].cell_mut(m.cell).segment_by_id_mut(m.segment_id) {
                        seg.mark_candidate();
                    }
                    (m.cell, update)
                }
                None => {
                    let i = columns[c].least_used_cell();
                    let update = segment_update(
                        None,
                        prev,
                        self.config.new_synapse_count,
                        true,
                        now,
                        &mut self.rng,
                    );
                    (i, update)
                }
            };

            self.states.active.curr_mut().set(c, i);
            self.adapt(columns, CellRef::new(c, i), update, now);
        }

        num_unpredicted * 2 <= active_columns.len()
    }

    /// Learn phase 2: learn-predict the best matching cell of every column and
    /// queue its segment update.
    fn phase2(&mut self, columns: &mut [Column], now: u64, read_only: bool) {
        self.states.predicted.curr_mut().clear_all();

        let threshold = self.config.activation_threshold;
        let new_synapse_count = self.config.new_synapse_count;
        for (c, column) in columns.iter_mut().enumerate() {
            let learn = self.states.active.curr();
            let Some(m) = column.best_matching_segment(learn, threshold) else {
                continue;
            };
            self.states.predicted.curr_mut().set(c, m.cell);
            if read_only {
                continue;
            }

            let cell = column.cell_mut(m.cell);
            let Some(seg) = cell.segment_by_id_mut(m.segment_id) else {
                continue;
            };
            let update = segment_update(
                Some(&*seg),
                self.states.active.curr(),
                new_synapse_count,
                m.count < new_synapse_count,
                now,
                &mut self.rng,
            );
            seg.mark_candidate();
            self.pending
                .entry(CellRef::new(c, m.cell))
                .or_default()
                .push(update);
        }
    }

    /// Apply a segment update to `cell`.
    fn adapt(&mut self, columns: &mut [Column], cell: CellRef, update: SegmentUpdate, now: u64) {
        let initial = self.config.initial_permanence;
        let max_synapses = self.config.max_synapses_per_segment;
        let target = columns[cell.column].cell_mut(cell.cell);

        match update.segment {
            Some(id) => {
                let Some(seg) = target.segment_by_id_mut(id) else {
                    // Pruned since the update was queued
                    return;
                };
                seg.reinforce(
                    &update.active_synapses,
                    self.config.permanence_increment,
                    self.config.permanence_decrement,
                );
                seg.mark_active(now);
                for &p in &update.new_synapses {
                    seg.add_synapse(p, initial);
                }
                if let Some(max) = max_synapses {
                    seg.limit_synapses(max);
                }
                seg.prune();
                if seg.is_empty() {
                    target.remove_segment(id);
                }
            }
            None => {
                if update.new_synapses.is_empty() {
                    return;
                }
                let mut seg = Segment::new(self.next_segment_id, true, now);
                self.next_segment_id = self.next_segment_id.wrapping_add(1);
                for &p in &update.new_synapses {
                    seg.add_synapse(p, initial);
                }
                if let Some(max) = max_synapses {
                    seg.limit_synapses(max);
                }
                make_room(target, self.config.max_segments_per_cell);
                target.push_segment(seg);
            }
        }
    }

    /// Decay every segment whose idle time is a positive multiple of `burn_in`
    /// learning iterations.
    fn apply_global_decay(&mut self, columns: &mut [Column], tick: u64) {
        let decay = self.config.global_decay;
        let burn_in = self.config.burn_in;
        if decay <= 0.0 || burn_in == 0 {
            return;
        }
        let now = self.iteration;

        let mut synapses_removed = 0;
        let mut segments_removed = 0;
        for column in columns.iter_mut() {
            for cell in column.cells_mut() {
                for seg in cell.segments_mut() {
                    let idle = now.saturating_sub(seg.last_active_tick());
                    if idle > 0 && idle % burn_in == 0 {
                        seg.decay(decay);
                        synapses_removed += seg.prune();
                    }
                }
                segments_removed += cell.remove_empty_segments();
            }
        }

        if synapses_removed > 0 || segments_removed > 0 {
            debug!(tick, synapses_removed, segments_removed, "global decay");
        }
    }
}

/// Evict least recently active segments until `cell` can take one more.
fn make_room(cell: &mut Cell, max_segments: Option<usize>) {
    let Some(max) = max_segments else {
        return;
    };
    while cell.num_segments() >= max {
        if cell.evict_least_recent().is_none() {
            break;
        }
    }
}

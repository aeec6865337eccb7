//! SequenceMemory - High-order sequence learning and prediction.
//!
//! `SequenceMemory` learns the temporal order of sparse binary patterns given as
//! sets of active column indices, and predicts which columns come next. Each
//! column holds several cells; which cell of a column is active encodes the
//! context, so the same input can lead to different predictions depending on what
//! came before it.
//!
//! # Algorithm
//!
//! Every [`compute`](SequenceMemory::compute) call runs, in order:
//!
//! 1. **Activation**: predicted cells of active columns turn on; unpredicted
//!    columns burst (all cells on)
//! 2. **Prediction**: cells with an active segment become predictive
//! 3. **Backtracking** (inference only): if the step was a surprise, replay the
//!    recent inputs to find a context that explains it
//! 4. **Learning**: grow and reinforce segments on a separate learn state, see
//!    [`LearningEngine`]
//!
//! # Architecture
//!
//! ```text
//! input (active columns)
//!      |
//!      v
//! +-----------+   predicted[PREV]   +------------+
//! | activate  | <------------------ |  predict   |
//! +-----------+                     +------------+
//!      | active[CURR]                     ^
//!      +----------------------------------+
//!      |                 columns -> cells -> segments -> synapses
//!      v
//! +----------------+    +-------------+
//! | LearningEngine |    | Backtracker |  (ring buffer of recent inputs)
//! +----------------+    +-------------+
//! ```
//!
//! # Examples
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
//!     ..Config::default()
//! };
//! let mut memory = SequenceMemory::new(config).unwrap();
//!
//! // Learn A -> B -> C -> D
//! for _ in 0..5 {
//!     for column in 0..4 {
//!         memory.compute(&[column], true, true).unwrap();
//!     }
//!     memory.reset();
//! }
//!
//! // A predicts B
//! memory.compute(&[0], false, true).unwrap();
//! assert_eq!(memory.predicted_state().active_columns(), vec![1]);
//! ```

use crate::backtrack::Backtracker;
use crate::cell_state::{CellState, StateHistory};
use crate::column::{Cell, Column};
use crate::config::Config;
use crate::inference;
use crate::learning::LearningEngine;
use crate::segment::{Segment, PERM_MAX, PERM_MIN};
use crate::{Result, SeqMemError};
use itertools::Itertools;
use tracing::{debug, trace};

/// Summary of one [`compute`](SequenceMemory::compute) step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepResult {
    /// Tick number of this step (1-based)
    pub tick: u64,
    /// At least half of the active columns were predicted
    pub in_sequence: bool,
    /// Active columns that burst
    pub num_bursting_columns: usize,
    /// Predictive cells after this step
    pub num_predicted_cells: usize,
    /// Fraction of active columns that burst
    pub anomaly_score: f64,
    /// Replay depth when inference backtracking replaced the direct result
    pub backtrack_depth: Option<usize>,
    /// The learn state stayed in sequence
    pub learn_in_sequence: bool,
    /// The learner had to start over
    pub learn_started_over: bool,
    /// Steps replayed by a learning backtrack
    pub learn_backtrack_steps: Option<usize>,
}

/// Per-step flags of one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellFlags {
    /// Active in the inference state
    pub active: bool,
    /// Predictive in the inference state
    pub predictive: bool,
    /// Learning cell of its column
    pub learn: bool,
}

/// High-order sequence memory.
///
/// # Performance
///
/// Prediction visits every segment once per step, so a step costs
/// O(columns × cells × segments × synapses) in the worst case. Inference
/// backtracking repeats activation and prediction up to `max_inf_backtrack`
/// times per depth tried.
#[derive(Clone, Debug)]
pub struct SequenceMemory {
    config: Config,
    columns: Vec<Column>,
    active: StateHistory,
    predicted: StateHistory,
    learner: LearningEngine,
    history: Backtracker,
    tick: u64,
    reset_called: bool,
    anomaly_score: f64,
}

impl SequenceMemory {
    /// Create an engine with an empty learned graph.
    ///
    /// # Errors
    ///
    /// Returns [`SeqMemError::InvalidConfig`] when the configuration fails
    /// validation.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let num_columns = config.number_of_columns;
        let cells_per_column = config.cells_per_column;
        debug!(num_columns, cells_per_column, seed = config.seed, "sequence memory created");

        Ok(Self {
            columns: vec![Column::new(cells_per_column); num_columns],
            active: StateHistory::new(num_columns, cells_per_column),
            predicted: StateHistory::new(num_columns, cells_per_column),
            learner: LearningEngine::new(&config),
            history: Backtracker::new(config.history_capacity()),
            tick: 0,
            reset_called: true,
            anomaly_score: 0.0,
            config,
        })
    }

    /// Process one input.
    ///
    /// `active_columns` may be in any order and contain duplicates. With
    /// `compute_inf_output` false the inference state is left as it was and only
    /// learning runs; with `enable_learn` false the learned graph is not touched.
    ///
    /// # Errors
    ///
    /// - [`SeqMemError::ColumnOutOfRange`] for an index `>= number_of_columns`,
    ///   before any state changes
    /// - [`SeqMemError::Inconsistent`] when `check_synapse_consistency` is on and
    ///   the learned graph violates an invariant
    pub fn compute(
        &mut self,
        active_columns: &[usize],
        enable_learn: bool,
        compute_inf_output: bool,
    ) -> Result<StepResult> {
        let input = self.normalize(active_columns)?;

        self.tick += 1;
        let mut result = StepResult {
            tick: self.tick,
            ..StepResult::default()
        };

        if compute_inf_output {
            self.infer(&input, enable_learn, &mut result);
        }

        if enable_learn {
            let outcome = self.learner.learn(
                &mut self.columns,
                &input,
                &self.history,
                self.tick,
                self.reset_called,
            );
            result.learn_in_sequence = outcome.in_sequence;
            result.learn_started_over = outcome.started_over;
            result.learn_backtrack_steps = outcome.backtrack_steps;
        }

        self.history.push(&input);
        self.reset_called = false;

        if self.config.verbosity >= 1 {
            debug!(
                tick = result.tick,
                in_sequence = result.in_sequence,
                bursting = result.num_bursting_columns,
                predicted = result.num_predicted_cells,
                "step"
            );
        } else {
            trace!(
                tick = result.tick,
                in_sequence = result.in_sequence,
                bursting = result.num_bursting_columns,
                predicted = result.num_predicted_cells,
                "step"
            );
        }
        if enable_learn && self.config.verbosity >= 2 {
            debug!("segments at tick {}:\n{}", self.tick, self.segments_report());
        }

        if self.config.check_synapse_consistency {
            self.check_consistency()?;
        }

        Ok(result)
    }

    /// Mark a sequence boundary.
    ///
    /// Clears inference and learn states, queued updates and the input history.
    /// Learned segments and synapses are kept.
    pub fn reset(&mut self) {
        debug!(tick = self.tick, "reset");
        self.active.clear();
        self.predicted.clear();
        self.learner.reset();
        self.history.clear();
        self.reset_called = true;
    }

    fn normalize(&self, active_columns: &[usize]) -> Result<Vec<usize>> {
        let length = self.config.number_of_columns;
        if let Some(&index) = active_columns.iter().find(|&&c| c >= length) {
            return Err(SeqMemError::ColumnOutOfRange { index, length });
        }
        Ok(active_columns.iter().copied().sorted_unstable().dedup().collect())
    }

    fn infer(&mut self, input: &[usize], enable_learn: bool, result: &mut StepResult) {
        let connected = self.config.connected_permanence;
        let threshold = self.config.activation_threshold;

        self.active.step();
        self.predicted.step();

        let activation = inference::activate(input, self.predicted.prev(), self.active.curr_mut());
        let mut num_predicted = inference::predict(
            &self.columns,
            self.active.curr(),
            self.predicted.curr_mut(),
            connected,
            threshold,
        );

        result.in_sequence = activation.in_sequence();
        result.num_bursting_columns = activation.num_bursting_columns;
        result.anomaly_score = activation.anomaly_score();
        self.anomaly_score = result.anomaly_score;

        let surprised = !activation.in_sequence() || num_predicted == 0;
        if surprised && !enable_learn && self.config.max_inf_backtrack > 0 && !self.history.is_empty() {
            let replay = self.history.replay(
                &self.columns,
                input,
                self.config.max_inf_backtrack,
                connected,
                threshold,
            );
            if let Some(replay) = replay {
                debug!(tick = self.tick, depth = replay.depth, "inference backtracked");
                self.active.curr_mut().copy_from(&replay.active);
                self.predicted.curr_mut().copy_from(&replay.predicted);
                num_predicted = replay.num_predicted;
                result.in_sequence = true;
                result.backtrack_depth = Some(replay.depth);
            }
        }

        result.num_predicted_cells = num_predicted;
    }

    /// Check the learned graph against its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SeqMemError::Inconsistent`] for the first empty segment, duplicate
    /// presynaptic cell, permanence outside `[0, 1]` or dangling presynaptic cell.
    pub fn check_consistency(&self) -> Result<()> {
        let num_columns = self.config.number_of_columns;
        let cells_per_column = self.config.cells_per_column;

        for (c, column) in self.columns.iter().enumerate() {
            for (i, cell) in column.cells().iter().enumerate() {
                for seg in cell.segments() {
                    let fail = |reason: String| SeqMemError::Inconsistent {
                        column: c,
                        cell: i,
                        segment: seg.id(),
                        reason,
                    };

                    if seg.is_empty() {
                        return Err(fail("empty segment".into()));
                    }
                    if let Some(dup) = seg.duplicate_presynaptic_cell() {
                        return Err(fail(format!("duplicate presynaptic cell {}", dup)));
                    }
                    for s in seg.synapses() {
                        let p = s.presynaptic_cell();
                        if p.column >= num_columns || p.cell >= cells_per_column {
                            return Err(fail(format!("dangling presynaptic cell {}", p)));
                        }
                        if !(PERM_MIN..=PERM_MAX).contains(&s.permanence()) {
                            return Err(fail(format!(
                                "permanence {} of synapse to {} outside [0, 1]",
                                s.permanence(),
                                p
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn cell_at(&self, column: usize, cell: usize) -> Result<&Cell> {
        let col = self
            .columns
            .get(column)
            .ok_or(SeqMemError::ColumnOutOfRange {
                index: column,
                length: self.columns.len(),
            })?;
        col.cell(cell).ok_or(SeqMemError::CellOutOfRange {
            index: cell,
            length: self.config.cells_per_column,
        })
    }

    /// Number of segments on a cell.
    pub fn num_segments_in_cell(&self, column: usize, cell: usize) -> Result<usize> {
        Ok(self.cell_at(column, cell)?.num_segments())
    }

    /// Segment at position `index` on a cell.
    pub fn segment_on_cell(&self, column: usize, cell: usize, index: usize) -> Result<&Segment> {
        let target = self.cell_at(column, cell)?;
        target.segment(index).ok_or(SeqMemError::SegmentOutOfRange {
            column,
            cell,
            index,
            length: target.num_segments(),
        })
    }

    /// Active, predictive and learn flags of a cell at the last step.
    pub fn cell_flags(&self, column: usize, cell: usize) -> Result<CellFlags> {
        self.cell_at(column, cell)?;
        Ok(CellFlags {
            active: self.active.curr().get(column, cell),
            predictive: self.predicted.curr().get(column, cell),
            learn: self.learner.learn_state().get(column, cell),
        })
    }

    /// Cells predicted to become active at the next step.
    #[inline]
    pub fn predicted_state(&self) -> &CellState {
        self.predicted.curr()
    }

    /// Cells active at the last step.
    #[inline]
    pub fn active_state(&self) -> &CellState {
        self.active.curr()
    }

    /// Learning cells at the last step.
    #[inline]
    pub fn learn_state(&self) -> &CellState {
        self.learner.learn_state()
    }

    /// The learner, for inspecting its counters and learn-predicted state.
    pub fn learner(&self) -> &LearningEngine {
        &self.learner
    }

    /// Recent inputs kept for backtracking.
    pub fn history(&self) -> &Backtracker {
        &self.history
    }

    /// The learned graph.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Total segments over all cells.
    pub fn num_segments(&self) -> usize {
        self.columns
            .iter()
            .flat_map(|c| c.cells().iter())
            .map(Cell::num_segments)
            .sum()
    }

    /// Total synapses over all segments.
    pub fn num_synapses(&self) -> usize {
        self.columns.iter().map(Column::num_synapses).sum()
    }

    /// Number of `compute` calls so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Anomaly score of the last inference step.
    pub fn anomaly_score(&self) -> f64 {
        self.anomaly_score
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Text dump of every segment, one cell per block.
    ///
    /// ```text
    /// Col 1 / Cell 0:
    ///   Seg 0 (1 syns): [[0, 0, 0.70]]
    /// ```
    pub fn segments_report(&self) -> String {
        let mut blocks = Vec::new();
        for (c, column) in self.columns.iter().enumerate() {
            for (i, cell) in column.cells().iter().enumerate() {
                if cell.num_segments() == 0 {
                    continue;
                }
                let segments = cell
                    .segments()
                    .iter()
                    .map(|seg| {
                        format!(
                            "  Seg {} ({} syns): {}",
                            seg.id(),
                            seg.num_synapses(),
                            seg
                        )
                    })
                    .join("\n");
                blocks.push(format!("Col {} / Cell {}:\n{}", c, i, segments));
            }
        }
        blocks.join("\n")
    }
}

use crate::error::Result;
use crate::session::{check_grid_size, SessionConfig};
use crate::stimulus::{
    classify, classify_timeout, Outcome, Response, Stimulus, StimulusKind, TrialRecord,
};
use crate::util::{mean, percentage, std_dev};
use itertools::{Itertools, MinMaxResult};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

/// Redraws allowed before falling back to the neighbouring cell
const MAX_RESAMPLES: u32 = 16;

/// Per-kind counter, indexed by `StimulusKind::index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts([u32; 3]);

impl KindCounts {
    pub fn get(&self, kind: StimulusKind) -> u32 {
        self.0[kind.index()]
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    fn bump(&mut self, kind: StimulusKind) {
        self.0[kind.index()] += 1;
    }
}

/// Round-by-round decision engine for one go/no-go session.
///
/// Each round is armed by [`TrialEngine::next_target`] and resolved by whichever of
/// [`TrialEngine::handle_response`] or [`TrialEngine::record_timeout`] arrives first.
/// Later resolution calls for the same round are no-ops.
#[derive(Debug)]
pub struct TrialEngine {
    grid_size: usize,
    total_rounds: u32,
    timeout_ms: u64,
    current_round: u32,
    score: u32,
    round_complete: bool,
    current: Option<Stimulus>,
    last_target: Option<usize>,
    started_at: Option<Instant>,
    records: Vec<TrialRecord>,
    round_counts: KindCounts,
    correct_counts: KindCounts,
    rng: StdRng,
}

impl TrialEngine {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic engine for replays and tests
    pub fn with_seed(config: SessionConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SessionConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        let mut engine = Self {
            grid_size: config.grid_size,
            total_rounds: config.total_rounds,
            timeout_ms: config.timeout_ms,
            current_round: 0,
            score: 0,
            round_complete: false,
            current: None,
            last_target: None,
            started_at: None,
            records: vec![],
            round_counts: KindCounts::default(),
            correct_counts: KindCounts::default(),
            rng,
        };
        engine.reset();
        Ok(engine)
    }

    /// Set the grid size and re-arm the session
    pub fn init(&mut self, grid_size: usize) -> Result<()> {
        check_grid_size(grid_size)?;
        self.grid_size = grid_size;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_round = 0;
        self.score = 0;
        self.round_complete = false;
        self.current = None;
        self.last_target = None;
        self.started_at = None;
        self.records.clear();
        self.round_counts = KindCounts::default();
        self.correct_counts = KindCounts::default();
    }

    /// Arm the next round. Returns `None` once every round has been played.
    pub fn next_target(&mut self) -> Option<Stimulus> {
        self.next_target_at(Instant::now())
    }

    /// Arm the next round with its start stamped at `now`, the instant reaction
    /// times are measured from
    pub fn next_target_at(&mut self, now: Instant) -> Option<Stimulus> {
        if self.is_session_complete() {
            return None;
        }

        self.current_round += 1;
        self.round_complete = false;

        let kind = StimulusKind::from_draw(self.rng.gen::<f64>());
        let target_cell = self.draw_cell();
        let stimulus = Stimulus::new(target_cell, kind);

        self.last_target = Some(target_cell);
        self.current = Some(stimulus.clone());
        self.started_at = Some(now);
        self.round_counts.bump(kind);

        Some(stimulus)
    }

    fn draw_cell(&mut self) -> usize {
        let cells = self.cell_count();
        let mut cell = self.rng.gen_range(0..cells);

        let previous = match self.last_target {
            Some(prev) if cells > 1 => prev,
            _ => return cell,
        };

        let mut redraws = 0;
        while cell == previous && redraws < MAX_RESAMPLES {
            cell = self.rng.gen_range(0..cells);
            redraws += 1;
        }
        if cell == previous {
            cell = (previous + 1) % cells;
        }
        cell
    }

    /// Score a tap on `clicked_cell` made `reaction_ms` after the round was armed
    pub fn handle_response(&mut self, clicked_cell: usize, reaction_ms: u64) -> Response {
        if self.round_complete {
            return Response::already_resolved();
        }
        let stimulus = match &self.current {
            Some(s) => s,
            None => return Response::already_resolved(),
        };

        let response = classify(stimulus, clicked_cell, self.center_cell());
        let kind = stimulus.kind;
        self.round_complete = true;
        self.resolve(kind, response, Some(reaction_ms));
        response
    }

    /// Resolve the armed round as unanswered. Returns `None` if a tap already resolved it.
    pub fn record_timeout(&mut self) -> Option<Response> {
        if self.round_complete {
            return None;
        }
        let kind = self.current.as_ref()?.kind;

        let response = classify_timeout(kind);
        self.round_complete = true;
        self.resolve(kind, response, None);
        Some(response)
    }

    fn resolve(&mut self, kind: StimulusKind, response: Response, reaction_ms: Option<u64>) {
        let outcome = if response.correct {
            self.score += 1;
            self.correct_counts.bump(kind);
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        self.records.push(TrialRecord {
            kind,
            outcome,
            reaction_ms,
        });
    }

    pub fn is_round_complete(&self) -> bool {
        self.round_complete
    }

    pub fn is_session_complete(&self) -> bool {
        self.current_round >= self.total_rounds
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// The fixed response cell for displaced stimuli
    pub fn center_cell(&self) -> usize {
        self.cell_count() / 2
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn current_stimulus(&self) -> Option<&Stimulus> {
        self.current.as_ref()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn round_counts(&self) -> KindCounts {
        self.round_counts
    }

    pub fn correct_counts(&self) -> KindCounts {
        self.correct_counts
    }

    /// One entry per resolved round, in play order
    pub fn reaction_times(&self) -> Vec<Option<u64>> {
        self.records.iter().map(|r| r.reaction_ms).collect()
    }

    pub fn reaction_times_by_kind(&self, kind: StimulusKind) -> Vec<Option<u64>> {
        self.records
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.reaction_ms)
            .collect()
    }

    fn present_times(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.reaction_ms)
            .map(|ms| ms as f64)
            .collect()
    }

    pub fn hit_rate(&self) -> f64 {
        if self.current_round == 0 {
            return 0.0;
        }
        percentage(self.score, self.current_round.min(self.total_rounds))
    }

    pub fn average_reaction_time(&self) -> f64 {
        mean(&self.present_times()).unwrap_or(0.0)
    }

    fn reaction_bounds(&self) -> (f64, f64) {
        match self.present_times().into_iter().minmax() {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(ms) => (ms, ms),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        }
    }

    pub fn fastest_reaction_time(&self) -> f64 {
        self.reaction_bounds().0
    }

    pub fn slowest_reaction_time(&self) -> f64 {
        self.reaction_bounds().1
    }

    pub fn reaction_time_std_dev(&self) -> f64 {
        std_dev(&self.present_times()).unwrap_or(0.0)
    }

    pub fn hit_rate_by_kind(&self, kind: StimulusKind) -> f64 {
        percentage(self.correct_counts.get(kind), self.round_counts.get(kind))
    }

    pub fn average_reaction_time_by_kind(&self, kind: StimulusKind) -> f64 {
        let times: Vec<f64> = self
            .reaction_times_by_kind(kind)
            .into_iter()
            .flatten()
            .map(|ms| ms as f64)
            .collect();
        mean(&times).unwrap_or(0.0)
    }
}

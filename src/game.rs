use crate::engine::TrialEngine;
use crate::error::Result;
use crate::runtime::TrialTimer;
use crate::session::SessionConfig;
use crate::stats::StatsDb;
use crate::stimulus::{Reason, Response, Stimulus};
use crate::summary::SessionSummary;
use crate::time_series::{reaction_series, TimeSeriesPoint};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pause between a resolved round and the next one
pub const FEEDBACK_MS: u64 = 800;
/// How long a feedback flash stays on the cell
pub const FLASH_MS: u64 = 600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackKind {
    Hit,
    Miss,
    /// any tap during a NoGo round
    NoGoClick,
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub cell: usize,
    pub kind: FeedbackKind,
    pub reason: Reason,
    pub shown_at: Instant,
}

impl Feedback {
    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.shown_at + Duration::from_millis(FLASH_MS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// nothing armed yet
    Idle,
    /// waiting for a tap or the deadline
    Armed,
    /// showing feedback until the next round is armed
    Resolved { resolved_at: Instant },
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

/// Drives a session: arms rounds, races taps against the round timer, and
/// paces feedback between rounds
#[derive(Debug)]
pub struct Game {
    engine: TrialEngine,
    phase: Phase,
    timer: Option<TrialTimer>,
    feedback: Option<Feedback>,
    cursor: usize,
    last_reaction_ms: Option<u64>,
    summary: Option<SessionSummary>,
    stats_db: Option<StatsDb>,
}

impl Game {
    pub fn new(config: SessionConfig, seed: Option<u64>) -> Result<Self> {
        let engine = match seed {
            Some(seed) => TrialEngine::with_seed(config, seed)?,
            None => TrialEngine::new(config)?,
        };
        let cursor = engine.center_cell();
        Ok(Self {
            engine,
            phase: Phase::Idle,
            timer: None,
            feedback: None,
            cursor,
            last_reaction_ms: None,
            summary: None,
            stats_db: None,
        })
    }

    /// Persist the session to `db` once it completes
    pub fn with_stats_db(mut self, db: StatsDb) -> Self {
        self.stats_db = Some(db);
        self
    }

    pub fn start(&mut self, now: Instant) {
        info!(
            grid_size = self.engine.grid_size(),
            rounds = self.engine.total_rounds(),
            timeout_ms = self.engine.timeout_ms(),
            "session started"
        );
        self.arm_next(now);
    }

    pub fn restart(&mut self, now: Instant) {
        self.engine.reset();
        self.phase = Phase::Idle;
        self.timer = None;
        self.feedback = None;
        self.last_reaction_ms = None;
        self.summary = None;
        self.cursor = self.engine.center_cell();
        self.start(now);
    }

    fn arm_next(&mut self, now: Instant) {
        match self.engine.next_target_at(now) {
            Some(stimulus) => {
                debug!(
                    round = self.engine.current_round(),
                    kind = %stimulus.kind,
                    cell = stimulus.target_cell,
                    "round armed"
                );
                // reaction times and the deadline share the engine's round start
                let started_at = self.engine.started_at().unwrap_or(now);
                self.timer = Some(TrialTimer::start(
                    started_at,
                    Duration::from_millis(self.engine.timeout_ms()),
                ));
                self.phase = Phase::Armed;
            }
            None => self.finish(),
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Complete;
        self.timer = None;

        let summary = SessionSummary::from_engine(&self.engine);
        info!(
            score = summary.score,
            total = summary.total_rounds,
            hit_rate = summary.hit_rate,
            avg_reaction_ms = summary.avg_reaction_ms,
            "session complete"
        );

        if let Some(ref mut db) = self.stats_db {
            if let Err(e) = db.record_session(&summary, self.engine.records()) {
                warn!(error = %e, "failed to store session");
            }
        }
        self.summary = Some(summary);
    }

    /// Tap `cell` at `now`. Returns `None` when no round is waiting for a response,
    /// including a tap that lands after the deadline: the timeout resolves that round.
    pub fn click(&mut self, cell: usize, now: Instant) -> Option<Response> {
        if self.phase != Phase::Armed {
            return None;
        }
        if self.timer.map_or(false, |t| t.has_expired(now)) {
            debug!(cell, "tap after deadline, resolving as timeout");
            self.expire(now);
            return None;
        }
        let timer = self.timer.as_mut()?;
        timer.cancel();
        let reaction_ms = timer.elapsed_ms(now);

        let response = self.engine.handle_response(cell, reaction_ms);
        let kind = match (response.correct, response.reason) {
            (true, _) => FeedbackKind::Hit,
            (false, Reason::NoGoAnyClick) | (false, Reason::ForbiddenClicked) => {
                FeedbackKind::NoGoClick
            }
            (false, _) => FeedbackKind::Miss,
        };

        self.last_reaction_ms = Some(reaction_ms);
        self.feedback = Some(Feedback {
            cell,
            kind,
            reason: response.reason,
            shown_at: now,
        });
        self.phase = Phase::Resolved { resolved_at: now };
        Some(response)
    }

    pub fn click_cursor(&mut self, now: Instant) -> Option<Response> {
        self.click(self.cursor, now)
    }

    /// Advance timers: resolve an expired round, or arm the next one once feedback is done
    pub fn on_tick(&mut self, now: Instant) {
        match self.phase {
            Phase::Armed => {
                if self.timer.map_or(false, |t| t.has_expired(now)) {
                    self.expire(now);
                }
            }
            Phase::Resolved { resolved_at } => {
                if now >= resolved_at + Duration::from_millis(FEEDBACK_MS) {
                    self.feedback = None;
                    self.arm_next(now);
                }
            }
            Phase::Idle | Phase::Complete => {}
        }
    }

    /// Resolve the armed round as unanswered
    fn expire(&mut self, now: Instant) {
        let target = self.engine.current_stimulus().map(|s| s.target_cell);
        if let (Some(response), Some(cell)) = (self.engine.record_timeout(), target) {
            // a withheld NoGo is silent
            self.feedback = match response.reason {
                Reason::NoGoWithheld => None,
                reason => Some(Feedback {
                    cell,
                    kind: FeedbackKind::Timeout,
                    reason,
                    shown_at: now,
                }),
            };
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
        self.last_reaction_ms = None;
        self.phase = Phase::Resolved { resolved_at: now };
    }

    pub fn move_cursor(&mut self, dir: Move) {
        let size = self.engine.grid_size();
        let (row, col) = (self.cursor / size, self.cursor % size);
        let (row, col) = match dir {
            Move::Up => (row.saturating_sub(1), col),
            Move::Down => ((row + 1).min(size - 1), col),
            Move::Left => (row, col.saturating_sub(1)),
            Move::Right => (row, (col + 1).min(size - 1)),
        };
        self.cursor = row * size + col;
    }

    /// Digits 1-9 address cells directly on grids of up to nine cells
    pub fn cell_for_digit(&self, digit: char) -> Option<usize> {
        let cells = self.engine.cell_count();
        let n = digit.to_digit(10)? as usize;
        if cells > 9 || n == 0 || n > cells {
            return None;
        }
        Some(n - 1)
    }

    pub fn engine(&self) -> &TrialEngine {
        &self.engine
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn stimulus(&self) -> Option<&Stimulus> {
        match self.phase {
            Phase::Armed => self.engine.current_stimulus(),
            _ => None,
        }
    }

    pub fn feedback(&self, now: Instant) -> Option<&Feedback> {
        self.feedback.as_ref().filter(|f| f.is_visible(now))
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_reaction_ms(&self) -> Option<u64> {
        self.last_reaction_ms
    }

    pub fn remaining_fraction(&self, now: Instant) -> Option<f64> {
        match self.phase {
            Phase::Armed => self.timer.map(|t| t.remaining_fraction(now)),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn reaction_coords(&self) -> Vec<TimeSeriesPoint> {
        reaction_series(self.engine.records())
    }

    pub fn stats_db(&self) -> Option<&StatsDb> {
        self.stats_db.as_ref()
    }
}

use crate::engine::TrialEngine;
use crate::stimulus::StimulusKind;
use crate::util::percentage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindBreakdown {
    pub kind: StimulusKind,
    pub rounds: u32,
    pub correct: u32,
    pub hit_rate: f64,
    pub avg_reaction_ms: f64,
}

/// Snapshot of a finished (or abandoned) session for the results view and history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub grid_size: usize,
    pub total_rounds: u32,
    pub rounds_played: u32,
    pub score: u32,
    pub hit_rate: f64,
    pub avg_reaction_ms: f64,
    pub fastest_reaction_ms: f64,
    pub slowest_reaction_ms: f64,
    pub reaction_std_dev: f64,
    pub breakdown: Vec<KindBreakdown>,
}

impl SessionSummary {
    pub fn from_engine(engine: &TrialEngine) -> Self {
        let rounds = engine.round_counts();
        let correct = engine.correct_counts();

        let breakdown = StimulusKind::ALL
            .iter()
            .map(|&kind| KindBreakdown {
                kind,
                rounds: rounds.get(kind),
                correct: correct.get(kind),
                hit_rate: engine.hit_rate_by_kind(kind),
                avg_reaction_ms: engine.average_reaction_time_by_kind(kind),
            })
            .collect();

        // the results overlay always scores against the full session length
        let hit_rate = percentage(engine.score(), engine.total_rounds());

        Self {
            grid_size: engine.grid_size(),
            total_rounds: engine.total_rounds(),
            rounds_played: engine.current_round(),
            score: engine.score(),
            hit_rate,
            avg_reaction_ms: engine.average_reaction_time(),
            fastest_reaction_ms: engine.fastest_reaction_time(),
            slowest_reaction_ms: engine.slowest_reaction_time(),
            reaction_std_dev: engine.reaction_time_std_dev(),
            breakdown,
        }
    }

    pub fn kind(&self, kind: StimulusKind) -> Option<&KindBreakdown> {
        self.breakdown.iter().find(|b| b.kind == kind)
    }

    /// Lines shown on the results screen
    pub fn result_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Final Score: {} / {}", self.score, self.total_rounds),
            format!("Overall Hit Rate: {:.1}%", self.hit_rate),
            format!("Avg Reaction Time: {:.0}ms", self.avg_reaction_ms),
            format!("Fastest: {:.0}ms", self.fastest_reaction_ms),
            format!("Slowest: {:.0}ms", self.slowest_reaction_ms),
            String::new(),
            "Round Breakdown:".to_string(),
        ];
        for b in &self.breakdown {
            lines.push(format!(
                "{} Rounds: {} ({:.1}% correct)",
                b.kind, b.rounds, b.hit_rate
            ));
            // nothing to time on a withheld response
            if b.kind != StimulusKind::NoGo {
                lines.push(format!("  Avg Reaction: {:.0}ms", b.avg_reaction_ms));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;

    #[test]
    fn test_summary_of_untouched_engine() {
        let engine = TrialEngine::with_seed(SessionConfig::default(), 1).unwrap();
        let summary = SessionSummary::from_engine(&engine);
        assert_eq!(summary.score, 0);
        assert_eq!(summary.rounds_played, 0);
        assert_eq!(summary.hit_rate, 0.0);
        assert_eq!(summary.breakdown.len(), 3);
        assert!(summary.breakdown.iter().all(|b| b.rounds == 0));
    }

    #[test]
    fn test_summary_tracks_engine() {
        let mut engine = TrialEngine::with_seed(SessionConfig::default(), 77).unwrap();
        while let Some(s) = engine.next_target() {
            match s.kind {
                StimulusKind::Go => {
                    engine.handle_response(s.target_cell, 180);
                }
                StimulusKind::NoGo => {
                    engine.record_timeout();
                }
                StimulusKind::Displaced => {
                    engine.handle_response(engine.center_cell(), 320);
                }
            }
        }

        let summary = SessionSummary::from_engine(&engine);
        assert_eq!(summary.score, 15);
        assert_eq!(summary.hit_rate, 100.0);
        assert_eq!(summary.rounds_played, 15);
        let go = summary.kind(StimulusKind::Go).unwrap();
        if go.rounds > 0 {
            assert_eq!(go.avg_reaction_ms, 180.0);
        }
        let total: u32 = summary.breakdown.iter().map(|b| b.rounds).sum();
        assert_eq!(total, 15);
    }

    #[test]
    fn test_result_lines_skip_nogo_reaction() {
        let engine = TrialEngine::with_seed(SessionConfig::default(), 1).unwrap();
        let lines = SessionSummary::from_engine(&engine).result_lines();
        assert_eq!(lines[0], "Final Score: 0 / 15");
        assert!(lines.iter().any(|l| l.starts_with("NoGo Rounds")));
        assert_eq!(
            lines.iter().filter(|l| l.contains("Avg Reaction:")).count(),
            2
        );
    }

    #[test]
    fn test_summary_serializes() {
        let engine = TrialEngine::with_seed(SessionConfig::default(), 1).unwrap();
        let summary = SessionSummary::from_engine(&engine);
        let json = serde_json::to_string(&summary).unwrap();
        let back: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary, back);
    }
}

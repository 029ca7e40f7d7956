use crate::stimulus::TrialRecord;

/// Reaction time of one answered round, for charting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub round: f64,
    pub reaction_ms: f64,
}

impl TimeSeriesPoint {
    pub fn new(round: f64, reaction_ms: f64) -> Self {
        Self { round, reaction_ms }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.round, p.reaction_ms)
    }
}

/// One point per round that has a reaction time; rounds are numbered from 1
pub fn reaction_series(records: &[TrialRecord]) -> Vec<TimeSeriesPoint> {
    records
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| {
            r.reaction_ms
                .map(|ms| TimeSeriesPoint::new((idx + 1) as f64, ms as f64))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::{Outcome, StimulusKind};

    #[test]
    fn test_series_skips_unanswered_rounds() {
        let records = [
            TrialRecord {
                kind: StimulusKind::Go,
                outcome: Outcome::Correct,
                reaction_ms: Some(120),
            },
            TrialRecord {
                kind: StimulusKind::NoGo,
                outcome: Outcome::Correct,
                reaction_ms: None,
            },
            TrialRecord {
                kind: StimulusKind::Displaced,
                outcome: Outcome::Incorrect,
                reaction_ms: Some(480),
            },
        ];
        let series = reaction_series(&records);
        assert_eq!(
            series,
            vec![
                TimeSeriesPoint::new(1.0, 120.0),
                TimeSeriesPoint::new(3.0, 480.0)
            ]
        );
        let tuple: (f64, f64) = series[1].into();
        assert_eq!(tuple, (3.0, 480.0));
    }
}

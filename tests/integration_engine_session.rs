use focustap::session::SessionConfig;
use focustap::stats::StatsDb;
use focustap::summary::SessionSummary;
use focustap::{Reason, StimulusKind, TrialEngine};

fn play_mixed(engine: &mut TrialEngine) {
    let mut n = 0u64;
    while let Some(s) = engine.next_target() {
        n += 1;
        match (s.kind, n % 3) {
            (_, 0) => {
                engine.record_timeout();
            }
            (StimulusKind::Go, _) => {
                engine.handle_response(s.target_cell, 150 + n * 10);
            }
            (StimulusKind::NoGo, _) => {
                engine.handle_response((s.target_cell + 1) % engine.cell_count(), 90);
            }
            (StimulusKind::Displaced, _) => {
                engine.handle_response(s.target_cell, 300);
            }
        }
    }
}

#[test]
fn full_session_statistics_are_consistent() {
    let mut engine = TrialEngine::with_seed(SessionConfig::default(), 99).unwrap();
    engine.init(3).unwrap();
    engine.reset();
    play_mixed(&mut engine);

    assert!(engine.is_session_complete());
    assert!(engine.next_target().is_none());
    assert_eq!(engine.current_round(), 15);
    assert_eq!(engine.records().len(), 15);

    let played: u32 = StimulusKind::ALL
        .iter()
        .map(|&k| engine.round_counts().get(k))
        .sum();
    assert_eq!(played, 15);

    for value in [
        engine.hit_rate(),
        engine.average_reaction_time(),
        engine.fastest_reaction_time(),
        engine.slowest_reaction_time(),
        engine.reaction_time_std_dev(),
    ] {
        assert!(value.is_finite() && value >= 0.0);
    }
    for kind in StimulusKind::ALL {
        assert!(engine.correct_counts().get(kind) <= engine.round_counts().get(kind));
        let rate = engine.hit_rate_by_kind(kind);
        assert!((0.0..=100.0).contains(&rate));
        assert!(engine.average_reaction_time_by_kind(kind) >= 0.0);
    }
    assert!(engine.fastest_reaction_time() <= engine.slowest_reaction_time());
}

#[test]
fn late_responses_after_resolution_are_rejected() {
    let mut engine = TrialEngine::with_seed(SessionConfig::default(), 5).unwrap();
    let s = engine.next_target().unwrap();
    engine.handle_response(s.target_cell, 200);

    let late = engine.handle_response(s.target_cell, 250);
    assert!(!late.correct);
    assert_eq!(late.reason, Reason::AlreadyResolved);
    assert!(engine.record_timeout().is_none());
    assert_eq!(engine.records().len(), 1);
}

#[test]
fn finished_session_round_trips_through_stats_db() {
    let mut engine = TrialEngine::with_seed(SessionConfig::default(), 2024).unwrap();
    play_mixed(&mut engine);
    let summary = SessionSummary::from_engine(&engine);

    let tmp = tempfile::tempdir().unwrap();
    let mut db = StatsDb::open(tmp.path().join("stats.db")).unwrap();
    db.record_session(&summary, engine.records()).unwrap();

    let rows = db.recent_sessions(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].score, summary.score as i64);
    assert_eq!(rows[0].total_rounds, 15);

    let attempts: i64 = db.kind_summary().unwrap().iter().map(|k| k.attempts).sum();
    assert_eq!(attempts, 15);
}

use focustap::time_series::TimeSeriesPoint;

/// Compute X (round) and Y (reaction ms) upper bounds for the results chart
pub fn compute_chart_params(points: &[TimeSeriesPoint], total_rounds: u32) -> (f64, f64) {
    let slowest = points
        .iter()
        .map(|p| p.reaction_ms)
        .fold(0.0_f64, f64::max);

    // keep both axes non-degenerate even with a single round or no answers
    let last_round = (total_rounds as f64).max(2.0);
    let ceiling = ((slowest / 100.0).ceil() * 100.0).max(100.0);

    (last_round, ceiling)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        assert_eq!(compute_chart_params(&[], 15), (15.0, 100.0));
        assert_eq!(compute_chart_params(&[], 1), (2.0, 100.0));
    }

    #[test]
    fn test_compute_chart_params_rounds_up_ceiling() {
        let points = [
            TimeSeriesPoint::new(1.0, 240.0),
            TimeSeriesPoint::new(4.0, 512.0),
        ];
        assert_eq!(compute_chart_params(&points, 15), (15.0, 600.0));
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(15.0), "15");
        assert_eq!(format_label(1.2345), "1.23");
    }
}

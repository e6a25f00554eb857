//! Latency statistics helpers.

use crate::types::TimingStats;

/// Round `value` to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

pub(crate) fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    // usize -> f64: sample counts are tiny
    #[allow(clippy::cast_precision_loss)]
    let n = samples.len() as f64;
    samples.iter().sum::<f64>() / n
}

/// Sample (n - 1) standard deviation; `None` below two samples.
pub(crate) fn sample_std_dev(samples: &[f64]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let avg = mean(samples);
    #[allow(clippy::cast_precision_loss)]
    let denom = (samples.len() - 1) as f64;
    let variance = samples.iter().map(|t| (t - avg).powi(2)).sum::<f64>() / denom;
    Some(variance.sqrt())
}

fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Descriptive statistics rounded to `places`; `None` for an empty series.
pub(crate) fn timing_stats(samples: &[f64], places: i32) -> Option<TimingStats> {
    if samples.is_empty() {
        return None;
    }
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(TimingStats {
        min_time: round_to(min, places),
        max_time: round_to(max, places),
        avg_time: round_to(mean(samples), places),
        median_time: round_to(median(samples), places),
        std_dev: sample_std_dev(samples).map(|sd| round_to(sd, places)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_round_to() {
        assert!(close(round_to(0.123_456, 3), 0.123));
        assert!(close(round_to(0.123_56, 4), 0.1236));
        assert!(close(round_to(2.0, 3), 2.0));
    }

    #[test]
    fn test_empty_series_has_no_stats() {
        assert!(timing_stats(&[], 3).is_none());
        assert!(close(mean(&[]), 0.0));
    }

    #[test]
    fn test_single_sample_has_no_std_dev() {
        let stats = timing_stats(&[0.25], 3).unwrap();
        assert!(close(stats.min_time, 0.25));
        assert!(close(stats.max_time, 0.25));
        assert!(close(stats.median_time, 0.25));
        assert!(stats.std_dev.is_none());
    }

    #[test]
    fn test_even_median_and_sample_std_dev() {
        let stats = timing_stats(&[0.4, 0.1, 0.3, 0.2], 4).unwrap();
        assert!(close(stats.min_time, 0.1));
        assert!(close(stats.max_time, 0.4));
        assert!(close(stats.avg_time, 0.25));
        assert!(close(stats.median_time, 0.25));
        // sqrt(0.05 / 3)
        assert!(close(stats.std_dev.unwrap(), 0.1291));
    }
}

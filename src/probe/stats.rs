//! Dispersion statistics over round-trip samples.
//!
//! All functions take the successful samples of one cycle. With no samples
//! every statistic is zero; the corrected deviation additionally needs at
//! least two samples for Bessel's correction to be defined.

use std::time::Duration;

fn mean_secs(samples: &[Duration]) -> f64 {
    samples.iter().map(Duration::as_secs_f64).sum::<f64>() / samples.len() as f64
}

fn sum_squared_deviations(samples: &[Duration]) -> f64 {
    let mean = mean_secs(samples);
    samples
        .iter()
        .map(|s| {
            let d = s.as_secs_f64() - mean;
            d * d
        })
        .sum::<f64>()
}

/// Population variance: mean of squared deviations from the mean, in s².
pub fn squared_deviation(samples: &[Duration]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    sum_squared_deviations(samples) / samples.len() as f64
}

/// Uncorrected standard deviation: sqrt of the population variance.
pub fn uncorrected_deviation(samples: &[Duration]) -> Duration {
    Duration::from_secs_f64(squared_deviation(samples).sqrt())
}

/// Corrected standard deviation with Bessel's correction (divide by N-1).
///
/// Zero when fewer than two samples were recorded.
pub fn corrected_deviation(samples: &[Duration]) -> Duration {
    if samples.len() < 2 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64((sum_squared_deviations(samples) / (samples.len() - 1) as f64).sqrt())
}

/// Range: largest sample minus smallest sample.
pub fn range(samples: &[Duration]) -> Duration {
    let min = samples.iter().min();
    let max = samples.iter().max();
    match (min, max) {
        (Some(min), Some(max)) => *max - *min,
        _ => Duration::ZERO,
    }
}

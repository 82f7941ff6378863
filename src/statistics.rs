//! Small numeric reductions used by the timing analysis.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use ordered_float::OrderedFloat;

/// File path mapped to its ordered elapsed-seconds samples, one per
/// benchmark iteration. The JSON artifact written by the runner and read
/// back by the analyzer.
pub type TimingRecord = BTreeMap<String, Vec<f64>>;

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Median with midpoint averaging for even-length input; `None` for an
/// empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .sorted_by_key(|value| OrderedFloat(*value))
        .collect();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Equal-width binned counts over the closed range of the input values.
pub struct Histogram {
    pub low: f64,
    pub bin_width: f64,
    pub counts: Vec<u64>,
}

pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    if values.is_empty() || bins == 0 {
        return None;
    }
    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Degenerate range: every value lands in the first bin.
    let bin_width = if high > low {
        (high - low) / bins as f64
    } else {
        1.0
    };
    let mut counts = vec![0u64; bins];
    for &value in values {
        let index = ((value - low) / bin_width) as usize;
        counts[index.min(bins - 1)] += 1;
    }
    Some(Histogram {
        low,
        bin_width,
        counts,
    })
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let max = self.counts.iter().copied().max().unwrap_or(0).max(1);
        for (index, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let lower = self.low + self.bin_width * index as f64;
            let upper = lower + self.bin_width;
            let bar = "#".repeat(((count * 40 / max).max(1)) as usize);
            writeln!(f, "{lower:>10.3} .. {upper:>10.3} | {count:>5} {bar}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn mean_of_constant_samples() {
        assert_eq!(mean(&[2.0, 2.0]), Some(2.0));
        assert_eq!(mean(&[3.0, 3.0]), Some(3.0));
    }

    #[test]
    fn median_of_odd_length_is_middle_element() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
    }

    #[test]
    fn median_of_even_length_is_midpoint() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn histogram_counts_cover_all_values() {
        let values = [0.0, 0.1, 0.5, 0.9, 1.0];
        let histogram = histogram(&values, 10).unwrap();
        assert_eq!(histogram.counts.iter().sum::<u64>(), values.len() as u64);
        // The maximum lands in the last bin, not past it.
        assert_eq!(histogram.counts[9], 2);
    }

    #[test]
    fn histogram_of_identical_values_uses_first_bin() {
        let histogram = histogram(&[7.0, 7.0, 7.0], 5).unwrap();
        assert_eq!(histogram.counts[0], 3);
        assert_eq!(histogram.counts.iter().sum::<u64>(), 3);
    }
}

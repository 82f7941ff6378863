//! Compares a baseline timing record against a counterexample-enabled one:
//! per-file means, slowdown summary CSV, aggregate statistics and
//! histograms of the slowdown distribution.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use slog::{info, warn, Logger};

use crate::error::{BenchError, Result};
use crate::statistics::{self, TimingRecord};

/// Files slowed down by at most this percentage count as unaffected in the
/// aggregate report.
pub const SLOWDOWN_THRESHOLD_PERCENT: f64 = 20.0;

const ABSOLUTE_BINS: usize = 200;
const PERCENTAGE_BINS: usize = 100;

pub const SUMMARY_HEADER: [&str; 5] = [
    "filename",
    "time",
    "time-ce",
    "difference",
    "difference_percentage",
];

/// One summary row: a file present in both timing records.
#[derive(Debug, Clone, PartialEq)]
pub struct FileComparison {
    pub filename: String,
    pub baseline_mean: f64,
    pub counterexample_mean: f64,
    pub difference: f64,
    pub difference_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub paired_files: usize,
    pub mean_difference: f64,
    pub mean_difference_percentage: f64,
    pub within_threshold: usize,
    pub within_threshold_ratio: f64,
    pub baseline_median: f64,
    /// Mean percentage slowdown of files with baseline mean at most the
    /// median. Never empty for a non-empty input.
    pub fast_mean_percentage: f64,
    /// Mean percentage slowdown of files above the median baseline; `None`
    /// when every baseline mean equals the median.
    pub slow_mean_percentage: Option<f64>,
}

/// Loads both records, writes the summary CSV and logs the aggregate
/// statistics and histograms.
pub fn run_analysis(
    baseline_path: &Path,
    counterexample_path: &Path,
    out: &Path,
    logger: &Logger,
) -> Result<()> {
    let baseline = load_timing_record(baseline_path)?;
    let counterexample = load_timing_record(counterexample_path)?;

    let rows = compare(&baseline, &counterexample, logger)?;
    write_summary_csv(&rows, out)?;
    info!(logger, "wrote summary to {}", out.display());

    let report = aggregate(&rows)?;
    info!(logger, "paired files: {}", report.paired_files);
    info!(
        logger,
        "mean increase in verification time: {:.4}s", report.mean_difference
    );
    info!(
        logger,
        "mean increase in verification time: {:.2}%", report.mean_difference_percentage
    );
    info!(
        logger,
        "files within {:.0}% slowdown: {} of {} ({:.1}%)",
        SLOWDOWN_THRESHOLD_PERCENT,
        report.within_threshold,
        report.paired_files,
        report.within_threshold_ratio * 100.0
    );
    info!(
        logger,
        "median baseline verification time: {:.4}s", report.baseline_median
    );
    info!(
        logger,
        "fast cohort (baseline <= median) mean increase: {:.2}%", report.fast_mean_percentage
    );
    match report.slow_mean_percentage {
        Some(slow) => info!(
            logger,
            "slow cohort (baseline > median) mean increase: {:.2}%", slow
        ),
        None => info!(logger, "slow cohort is empty"),
    }

    let differences: Vec<f64> = rows.iter().map(|row| row.difference).collect();
    let percentages: Vec<f64> = rows.iter().map(|row| row.difference_percentage).collect();
    if let Some(histogram) = statistics::histogram(&differences, ABSOLUTE_BINS) {
        println!("increase in verification time (seconds):\n{histogram}");
    }
    if let Some(histogram) = statistics::histogram(&percentages, PERCENTAGE_BINS) {
        println!("increase in verification time (%):\n{histogram}");
    }
    Ok(())
}

pub fn load_timing_record(path: &Path) -> Result<TimingRecord> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Pairs the two records on their keys. Baseline files missing from the
/// counterexample record are logged and excluded; the run continues.
pub fn compare(
    baseline: &TimingRecord,
    counterexample: &TimingRecord,
    logger: &Logger,
) -> Result<Vec<FileComparison>> {
    let mut rows = Vec::new();
    for (filename, samples) in baseline {
        let Some(counterexample_samples) = counterexample.get(filename) else {
            warn!(logger, "missing from counterexample record: {}", filename);
            continue;
        };
        rows.push(compare_file(filename, samples, counterexample_samples)?);
    }
    Ok(rows)
}

/// Per-file reduction. Empty sample lists and a zero counterexample mean
/// are reported as errors instead of producing NaN or infinite rows.
pub fn compare_file(
    filename: &str,
    baseline: &[f64],
    counterexample: &[f64],
) -> Result<FileComparison> {
    let baseline_mean = statistics::mean(baseline)
        .ok_or_else(|| BenchError::EmptySamples(filename.to_string()))?;
    let counterexample_mean = statistics::mean(counterexample)
        .ok_or_else(|| BenchError::EmptySamples(filename.to_string()))?;
    if counterexample_mean == 0.0 {
        return Err(BenchError::ZeroMean(filename.to_string()));
    }
    let difference = counterexample_mean - baseline_mean;
    Ok(FileComparison {
        filename: filename.to_string(),
        baseline_mean,
        counterexample_mean,
        difference,
        difference_percentage: difference / counterexample_mean * 100.0,
    })
}

pub fn write_summary_csv(rows: &[FileComparison], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(SUMMARY_HEADER)?;
    for row in rows {
        writer.write_record(&[
            row.filename.clone(),
            row.baseline_mean.to_string(),
            row.counterexample_mean.to_string(),
            row.difference.to_string(),
            row.difference_percentage.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn aggregate(rows: &[FileComparison]) -> Result<AggregateReport> {
    if rows.is_empty() {
        return Err(BenchError::NoPairedFiles);
    }

    let differences: Vec<f64> = rows.iter().map(|row| row.difference).collect();
    let percentages: Vec<f64> = rows.iter().map(|row| row.difference_percentage).collect();
    let baseline_means: Vec<f64> = rows.iter().map(|row| row.baseline_mean).collect();

    let within_threshold = percentages
        .iter()
        .filter(|percentage| **percentage <= SLOWDOWN_THRESHOLD_PERCENT)
        .count();

    // Non-empty input, so median and means exist.
    let baseline_median = statistics::median(&baseline_means).unwrap_or(0.0);
    let (fast, slow): (Vec<&FileComparison>, Vec<&FileComparison>) = rows
        .iter()
        .partition(|row| row.baseline_mean <= baseline_median);
    let cohort_percentages =
        |cohort: &[&FileComparison]| -> Vec<f64> {
            cohort.iter().map(|row| row.difference_percentage).collect()
        };

    Ok(AggregateReport {
        paired_files: rows.len(),
        mean_difference: statistics::mean(&differences).unwrap_or(0.0),
        mean_difference_percentage: statistics::mean(&percentages).unwrap_or(0.0),
        within_threshold,
        within_threshold_ratio: within_threshold as f64 / rows.len() as f64,
        baseline_median,
        fast_mean_percentage: statistics::mean(&cohort_percentages(&fast)).unwrap_or(0.0),
        slow_mean_percentage: statistics::mean(&cohort_percentages(&slow)),
    })
}

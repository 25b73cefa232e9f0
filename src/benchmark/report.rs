//! Benchmark reports.
//!
//! `benchmark_<seed>.csv` holds one line per case:
//!
//! ```text
//! x,y,w,h,xScale,yScale,<seconds per repeat and path>,<mismatches per repeat and path>
//! ```
//!
//! Both blocks are repeat-major in software, hardware, hybrid order. Seconds use
//! six decimals; a failed accelerator run has a mismatch count of `-1`.
//! `benchmark_<seed>.json` summarizes the run per path.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;

use super::{ScalePath, TestCase};
use crate::core::performance_analysis::{PathStatistics, PerformanceAnalysis};

/// Results of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkReport {
    pub seed: u64,
    pub cases: Vec<TestCase>,
}

impl BenchmarkReport {
    pub fn new(seed: u64, cases: Vec<TestCase>) -> Self {
        Self { seed, cases }
    }

    pub fn csv_file_name(&self) -> String {
        format!("benchmark_{}.csv", self.seed)
    }

    pub fn json_file_name(&self) -> String {
        format!("benchmark_{}.json", self.seed)
    }

    /// One CSV line, without the newline.
    pub fn csv_row(case: &TestCase) -> String {
        let r = &case.request;
        let mut row = format!(
            "{},{},{},{},{},{}",
            r.rect.x, r.rect.y, r.rect.w, r.rect.h, r.x_scale, r.y_scale
        );
        for sample in case.repeats.iter().flatten() {
            let _ = write!(row, ",{:.6}", sample.elapsed.as_secs_f64());
        }
        for sample in case.repeats.iter().flatten() {
            match sample.mismatches {
                Some(count) => {
                    let _ = write!(row, ",{}", count);
                }
                None => row.push_str(",-1"),
            }
        }
        row
    }

    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        for case in &self.cases {
            csv.push_str(&Self::csv_row(case));
            csv.push('\n');
        }
        csv
    }

    /// Timing statistics over the successful runs of `path`.
    pub fn statistics(&self, path: ScalePath) -> Option<PathStatistics> {
        PathStatistics::from_samples(
            self.cases
                .iter()
                .flat_map(|case| case.samples(path))
                .filter(|sample| sample.mismatches.is_some())
                .map(|sample| sample.elapsed),
        )
    }

    /// Destination samples produced by successful runs of `path`, with the time taken.
    pub fn throughput(&self, path: ScalePath) -> PerformanceAnalysis {
        let mut produced = 0u64;
        let mut elapsed = Duration::ZERO;
        for case in &self.cases {
            let area = case.request.destination().area() as u64;
            for sample in case.samples(path).filter(|s| s.mismatches.is_some()) {
                produced += area;
                elapsed += sample.elapsed;
            }
        }
        PerformanceAnalysis::new(produced, elapsed)
    }

    /// Software mean run time divided by the mean successful run time of `path`.
    ///
    /// `None` when either path has no successful run.
    pub fn speedup(&self, path: ScalePath) -> Option<f64> {
        let baseline = self.statistics(ScalePath::Software)?;
        Some(self.statistics(path)?.speedup_over(&baseline))
    }

    pub fn total_mismatches(&self, path: ScalePath) -> usize {
        self.cases
            .iter()
            .flat_map(|case| case.samples(path))
            .filter_map(|sample| sample.mismatches)
            .sum()
    }

    pub fn failed_runs(&self, path: ScalePath) -> usize {
        self.cases
            .iter()
            .flat_map(|case| case.samples(path))
            .filter(|sample| sample.mismatches.is_none())
            .count()
    }

    /// `true` when every accelerator run succeeded and matched the reference.
    pub fn all_passed(&self) -> bool {
        [ScalePath::Hardware, ScalePath::Hybrid]
            .into_iter()
            .all(|path| self.failed_runs(path) == 0 && self.total_mismatches(path) == 0)
    }

    pub fn summary(&self) -> serde_json::Value {
        let paths: serde_json::Map<String, serde_json::Value> = ScalePath::ALL
            .into_iter()
            .map(|path| {
                let stats = self.statistics(path);
                let throughput = self.throughput(path);
                (
                    path.name().to_string(),
                    json!({
                        "runs": stats.map_or(0, |s| s.samples),
                        "failed_runs": self.failed_runs(path),
                        "mismatches": self.total_mismatches(path),
                        "mean_secs": stats.map(|s| s.mean_secs),
                        "min_secs": stats.map(|s| s.min_secs),
                        "max_secs": stats.map(|s| s.max_secs),
                        "samples_per_sec": throughput.samples_per_second(),
                        "speedup": self.speedup(path),
                    }),
                )
            })
            .collect();
        json!({
            "seed": self.seed,
            "cases": self.cases.len(),
            "repeats": self.cases.first().map_or(0, |c| c.repeats.len()),
            "paths": paths,
        })
    }

    /// Writes the CSV and the JSON summary into `dir`, returning both paths.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
        let csv_path = dir.join(self.csv_file_name());
        fs::write(&csv_path, self.to_csv())?;
        let json_path = dir.join(self.json_file_name());
        fs::write(&json_path, serde_json::to_string_pretty(&self.summary())?)?;
        log::info!(
            "benchmark results written to {} and {}",
            csv_path.display(),
            json_path.display()
        );
        Ok((csv_path, json_path))
    }
}

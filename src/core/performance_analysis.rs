// # Performance Analysis Module
//
// Aggregates timing samples collected by the benchmark harness into per-path
// statistics and throughput figures, so the software, accelerator and hybrid
// paths can be compared side by side.
//
// ## Key Performance Metrics
//
// - **Elapsed time**: mean / min / max seconds per scaling path
// - **Throughput**: destination samples produced per second
// - **Speedup**: software mean time divided by a path's mean time

use std::time::Duration;

/// Summary statistics for one scaling path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStatistics {
    /// Number of timing samples aggregated
    pub samples: usize,
    /// Mean elapsed time in seconds
    pub mean_secs: f64,
    /// Fastest sample in seconds
    pub min_secs: f64,
    /// Slowest sample in seconds
    pub max_secs: f64,
}

impl PathStatistics {
    /// Aggregates the given samples. Returns `None` for an empty set.
    pub fn from_samples<I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = Duration>,
    {
        let mut count = 0usize;
        let mut total = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = 0.0f64;
        for sample in samples {
            let secs = sample.as_secs_f64();
            count += 1;
            total += secs;
            min = min.min(secs);
            max = max.max(secs);
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            samples: count,
            mean_secs: total / count as f64,
            min_secs: min,
            max_secs: max,
        })
    }

    /// How many times faster this path's mean run is than `baseline`'s.
    ///
    /// `0.0` when this path's mean time is zero.
    pub fn speedup_over(&self, baseline: &PathStatistics) -> f64 {
        if self.mean_secs == 0.0 {
            return 0.0;
        }
        baseline.mean_secs / self.mean_secs
    }
}

/// Throughput analysis of one path over a workload.
///
/// # Examples
///
/// ```rust
/// use hybrid_scaler::core::performance_analysis::PerformanceAnalysis;
/// use std::time::Duration;
///
/// let analysis = PerformanceAnalysis::new(1_000_000, Duration::from_millis(500));
/// assert_eq!(analysis.samples_per_second(), 2_000_000.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceAnalysis {
    /// Destination samples produced
    pub samples_produced: u64,
    /// Total elapsed time
    pub elapsed: Duration,
}

impl PerformanceAnalysis {
    pub fn new(samples_produced: u64, elapsed: Duration) -> Self {
        Self {
            samples_produced,
            elapsed,
        }
    }

    /// Destination samples per second, `0.0` for an empty interval.
    pub fn samples_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.samples_produced as f64 / secs
        }
    }
}

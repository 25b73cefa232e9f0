//! # Verification & Benchmark Harness
//!
//! Runs every case through the three scaling paths, times each run and counts
//! output mismatches against the software reference.
//!
//! - [`cases`]: the fixed full-image sweep plus seeded random rectangles
//! - [`runner`]: drives the paths and collects [`PathSample`]s
//! - [`report`]: CSV rows and the JSON summary

pub mod cases;
pub mod report;
pub mod runner;

use std::fmt;
use std::time::Duration;

use sg_scale::geometry::ScaleRequest;

pub use cases::{BENCH_CASES, generate_cases};
pub use report::BenchmarkReport;
pub use runner::{BenchmarkSettings, run_benchmark};

/// One of the three ways a request can be scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalePath {
    /// Reference scaler on the CPU
    Software,
    /// Both axes on the accelerator
    Hardware,
    /// Vertical downscale by row selection, the rest on the accelerator
    Hybrid,
}

impl ScalePath {
    /// Report column order.
    pub const ALL: [ScalePath; 3] = [ScalePath::Software, ScalePath::Hardware, ScalePath::Hybrid];

    pub fn name(self) -> &'static str {
        match self {
            ScalePath::Software => "software",
            ScalePath::Hardware => "hardware",
            ScalePath::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ScalePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one timed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSample {
    pub elapsed: Duration,
    /// Differing samples versus the reference, `None` if the run failed
    pub mismatches: Option<usize>,
}

/// The three samples of one repeat, in [`ScalePath::ALL`] order.
pub type RepeatSamples = [PathSample; 3];

/// A benchmark case and everything measured for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub request: ScaleRequest,
    pub repeats: Vec<RepeatSamples>,
}

impl TestCase {
    pub fn new(request: ScaleRequest) -> Self {
        Self {
            request,
            repeats: Vec::new(),
        }
    }

    /// Samples of `path` across all repeats.
    pub fn samples(&self, path: ScalePath) -> impl Iterator<Item = &PathSample> + '_ {
        let column = ScalePath::ALL.iter().position(|p| *p == path).unwrap_or(0);
        self.repeats.iter().map(move |repeat| &repeat[column])
    }
}

/// Number of positions at which `reference` and `target` differ.
///
/// Samples beyond the shorter slice count as mismatches.
pub fn verify(reference: &[u8], target: &[u8]) -> usize {
    let differing = reference
        .iter()
        .zip(target)
        .filter(|(a, b)| a != b)
        .count();
    differing + reference.len().abs_diff(target.len())
}

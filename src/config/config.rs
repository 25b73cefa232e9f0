//! # Configuration Module
//!
//! Settings shared by the `scaler` CLI, the `benchmark` tool and the library's
//! session layer. The CLI maps its flags onto [`ScalerConfig`]; the session hands
//! the accelerator part on as an [`AcceleratorConfig`].
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `root_dir` | `PathBuf` | existing directory | Directory input names are resolved against |
//! | `random_cases` | `usize` | 0-10000 | Randomized benchmark cases after the fixed sweep |
//! | `repeats` | `usize` | 1-100 | Timed rounds per case and path |
//! | `write_results` | `bool` | true/false | Dump each benchmark case's output image |
//! | `export_png` | `bool` | true/false | Write a PNG preview next to every `.out` file |
//! | `transfer_timeout_ms` | `Option<u64>` | `None` or > 0 | Bound on the DMA completion wait |
//! | `seed` | `Option<u64>` | any | Benchmark seed, clock-derived when `None` |
//!
//! ## Examples
//!
//! ```rust
//! use hybrid_scaler::config::config::ScalerConfig;
//!
//! let mut config = ScalerConfig::default();
//! assert!(config.validate().is_ok());
//!
//! config.repeats = 0;
//! assert!(config.validate().is_err());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::accel::AcceleratorConfig;

/// Upper bound on randomized benchmark cases.
pub const MAX_RANDOM_CASES: usize = 10_000;

/// Upper bound on repeats per case.
pub const MAX_REPEATS: usize = 100;

/// Configuration for a scaling or benchmark session.
///
/// # Examples
///
/// ```rust
/// use hybrid_scaler::config::config::ScalerConfig;
/// use std::path::PathBuf;
///
/// let config = ScalerConfig {
///     root_dir: PathBuf::from("/mnt/sd"),
///     random_cases: 10,
///     repeats: 1,
///     write_results: false,
///     export_png: true,
///     transfer_timeout_ms: Some(500),
///     seed: Some(42),
/// };
/// assert_eq!(config.to_accelerator_config().transfer_timeout.unwrap().as_millis(), 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalerConfig {
    /// Directory relative input paths are resolved against.
    ///
    /// Output files land next to their input, so the directory must be writable.
    pub root_dir: PathBuf,

    /// Number of randomized cases generated after the eight fixed full-image cases.
    pub random_cases: usize,

    /// Timed rounds per case and per path. Must be at least 1.
    pub repeats: usize,

    /// Whether the benchmark writes each case's software output to
    /// `<stem>_<x>_<y>_<w>_<h>_<xs>_<ys>.out`.
    pub write_results: bool,

    /// Whether every `.out` file gets a grayscale PNG preview beside it.
    pub export_png: bool,

    /// Completion wait bound in milliseconds, `None` to wait indefinitely.
    pub transfer_timeout_ms: Option<u64>,

    /// Benchmark seed. `None` seeds from the system clock.
    pub seed: Option<u64>,
}

impl Default for ScalerConfig {
    /// Defaults match the firmware build: 50 random cases, 3 repeats, result dumps
    /// on, no preview export, unbounded transfers.
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            random_cases: 50,
            repeats: 3,
            write_results: true,
            export_png: false,
            transfer_timeout_ms: None,
            seed: None,
        }
    }
}

impl ScalerConfig {
    pub fn new(
        root_dir: PathBuf,
        random_cases: usize,
        repeats: usize,
        write_results: bool,
        export_png: bool,
        transfer_timeout_ms: Option<u64>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            root_dir,
            random_cases,
            repeats,
            write_results,
            export_png,
            transfer_timeout_ms,
            seed,
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.repeats == 0 {
            return Err("Repeats must be greater than 0".to_string());
        }
        if self.repeats > MAX_REPEATS {
            return Err(format!("Repeats must be at most {}", MAX_REPEATS));
        }
        if self.random_cases > MAX_RANDOM_CASES {
            return Err(format!("Random cases must be at most {}", MAX_RANDOM_CASES));
        }
        if self.transfer_timeout_ms == Some(0) {
            return Err("Transfer timeout must be greater than 0 ms".to_string());
        }
        Ok(())
    }

    /// Resolves an input name against `root_dir`. Absolute paths pass through.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.root_dir.join(name)
    }

    /// Driver settings derived from this configuration.
    pub fn to_accelerator_config(&self) -> AcceleratorConfig {
        AcceleratorConfig {
            transfer_timeout: self.transfer_timeout_ms.map(Duration::from_millis),
            ..AcceleratorConfig::default()
        }
    }
}

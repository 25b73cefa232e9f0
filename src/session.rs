//! # Scale Session Management
//!
//! High-level orchestration of one console session: a configured accelerator
//! context plus the steps each command runs through.
//!
//! ## Command Flow
//!
//! 1. **Load**: read the raw image named by the command
//! 2. **Prepare**: validate factors and region against the image
//! 3. **Scale**: software reference, then accelerator, then hybrid, each timed
//! 4. **Verify**: count accelerator mismatches against the reference
//! 5. **Save**: write the `.out` file (and a PNG preview when configured)
//!
//! Benchmark commands replace steps 2-5 with the benchmark harness and write its
//! CSV and JSON reports into the configured root directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use sg_scale::geometry::ScaleRequest;
use sg_scale::nearest::scale_nearest;

use crate::accel::{AcceleratorContext, DmaRuntime};
use crate::benchmark::{self, BenchmarkReport, BenchmarkSettings, ScalePath, cases::clock_seed};
use crate::command::Command;
use crate::config::ScalerConfig;
use crate::image_io::{self, Image};

/// Timing and verification of one accelerator path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOutcome {
    pub elapsed: Duration,
    /// Mismatches against the reference, `None` if the run failed
    pub mismatches: Option<usize>,
}

/// Result of a scale command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleOutcome {
    pub request: ScaleRequest,
    pub output: PathBuf,
    pub software: Duration,
    pub hardware: PathOutcome,
    pub hybrid: PathOutcome,
}

impl ScaleOutcome {
    pub fn verified(&self) -> bool {
        self.hardware.mismatches == Some(0) && self.hybrid.mismatches == Some(0)
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Scaled(ScaleOutcome),
    Benchmark {
        report: BenchmarkReport,
        csv: PathBuf,
        json: PathBuf,
    },
}

/// A configured accelerator session.
pub struct ScaleSession<R: DmaRuntime> {
    config: ScalerConfig,
    context: AcceleratorContext<R>,
}

impl<R: DmaRuntime> ScaleSession<R> {
    /// Create a new scale session using the builder pattern.
    pub fn builder() -> ScaleSessionBuilder<R> {
        ScaleSessionBuilder::new()
    }

    pub fn config(&self) -> &ScalerConfig {
        &self.config
    }

    pub fn context(&self) -> &AcceleratorContext<R> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AcceleratorContext<R> {
        &mut self.context
    }

    /// Parses and executes one protocol line.
    pub fn execute_line(&mut self, line: &str) -> Result<Outcome> {
        let command = Command::parse(line)?;
        self.execute(&command)
    }

    /// Executes one command.
    pub fn execute(&mut self, command: &Command) -> Result<Outcome> {
        let input = self.config.resolve(&command.file);
        let source = image_io::load_raw(&input)?;
        println!("Image loaded");
        log::info!(
            "loaded {} ({}x{})",
            input.display(),
            source.width(),
            source.height()
        );

        if command.is_benchmark() {
            return self.benchmark(&input, &source);
        }

        let request = command.prepare(source.size)?;
        let outcome = self.scale(&input, &source, &request)?;
        println!("Image resized");
        println!("Image saved");
        Ok(Outcome::Scaled(outcome))
    }

    fn scale(&mut self, input: &Path, source: &Image, request: &ScaleRequest) -> Result<ScaleOutcome> {
        let size = request.destination();
        let mut reference = vec![0u8; size.area()];
        let mut hardware = vec![0u8; size.area()];
        let mut hybrid = vec![0u8; size.area()];

        self.context.flush_data_cache();
        let started = Instant::now();
        scale_nearest(&source.data, request, &mut reference)?;
        let software = started.elapsed();

        let hw = self.run_path(ScalePath::Hardware, source, request, &reference, &mut hardware);
        let hy = self.run_path(ScalePath::Hybrid, source, request, &reference, &mut hybrid);

        // The accelerator result is what gets saved; the reference stands in when it failed.
        let data = if hw.mismatches.is_some() {
            hardware
        } else {
            log::warn!("saving the software result, the accelerator run failed");
            reference
        };
        let image = Image { size, data };
        let output = image_io::output_path(input);
        image_io::save_raw(&output, &image)?;
        if self.config.export_png {
            image_io::export_png(&output.with_extension("png"), &image)?;
        }

        Ok(ScaleOutcome {
            request: *request,
            output,
            software,
            hardware: hw,
            hybrid: hy,
        })
    }

    fn run_path(
        &mut self,
        path: ScalePath,
        source: &Image,
        request: &ScaleRequest,
        reference: &[u8],
        destination: &mut [u8],
    ) -> PathOutcome {
        self.context.flush_data_cache();
        let started = Instant::now();
        let result = match path {
            ScalePath::Hybrid => self.context.scale_hybrid(&source.data, request, destination),
            _ => self.context.scale_hw(&source.data, request, destination),
        };
        let elapsed = started.elapsed();
        let mismatches = match result {
            Ok(stats) => {
                log::debug!("{} path used {} descriptors", path, stats.descriptors());
                Some(benchmark::verify(reference, destination))
            }
            Err(error) => {
                log::warn!("{} path failed: {}", path, error);
                self.context.check_status();
                None
            }
        };
        PathOutcome {
            elapsed,
            mismatches,
        }
    }

    fn benchmark(&mut self, input: &Path, source: &Image) -> Result<Outcome> {
        let seed = self.config.seed.unwrap_or_else(clock_seed);
        println!("Starting benchmark, seed: {}", seed);
        let settings = BenchmarkSettings {
            seed,
            random_cases: self.config.random_cases,
            repeats: self.config.repeats,
            result_stem: self.config.write_results.then(|| input.to_path_buf()),
            export_png: self.config.export_png,
        };
        let report = benchmark::run_benchmark(&mut self.context, source, &settings)?;
        let (csv, json) = report.write_to(&self.config.root_dir)?;
        println!("Writing results to {}", csv.display());
        Ok(Outcome::Benchmark { report, csv, json })
    }
}

/// Builder for creating scale sessions with fluent API.
pub struct ScaleSessionBuilder<R: DmaRuntime> {
    config: ScalerConfig,
    runtime: Option<R>,
}

impl<R: DmaRuntime> Default for ScaleSessionBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DmaRuntime> ScaleSessionBuilder<R> {
    pub fn new() -> Self {
        Self {
            config: ScalerConfig::default(),
            runtime: None,
        }
    }

    pub fn with_config(mut self, config: ScalerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the DMA runtime the accelerator is reached through.
    pub fn with_runtime(mut self, runtime: R) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validates the configuration and initializes the accelerator.
    pub fn build(self) -> Result<ScaleSession<R>> {
        if let Err(reason) = self.config.validate() {
            bail!("invalid configuration: {}", reason);
        }
        let runtime = self
            .runtime
            .ok_or_else(|| anyhow::anyhow!("No DMA runtime specified"))?;

        let mut context = AcceleratorContext::initialize(runtime, &self.config.to_accelerator_config());
        let status = context.status();
        if context.check_status() {
            bail!("accelerator initialization failed: {}", status);
        }
        Ok(ScaleSession {
            config: self.config,
            context,
        })
    }
}

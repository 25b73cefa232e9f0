//! Benchmark execution.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sg_scale::geometry::ScaleRequest;
use sg_scale::nearest::scale_nearest;

use super::report::BenchmarkReport;
use super::{PathSample, RepeatSamples, TestCase, generate_cases, verify};
use crate::accel::{AcceleratorContext, DmaRuntime, TransferStats};
use crate::error::HwError;
use crate::image_io::{self, Image};

/// What to run and where per-case results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkSettings {
    pub seed: u64,
    pub random_cases: usize,
    pub repeats: usize,
    /// Input file the per-case `.out` dumps are named after, `None` for no dumps.
    /// A case whose hardware output disagreed with the reference also gets a
    /// `_hw.out` dump of that output.
    pub result_stem: Option<PathBuf>,
    /// Also write a PNG preview of each dump
    pub export_png: bool,
}

/// Runs the full benchmark on `source`.
///
/// Accelerator failures are recorded as samples without a mismatch count and the
/// run continues with the next path.
pub fn run_benchmark<R: DmaRuntime>(
    context: &mut AcceleratorContext<R>,
    source: &Image,
    settings: &BenchmarkSettings,
) -> anyhow::Result<BenchmarkReport> {
    let requests = generate_cases(source.size, settings.random_cases, settings.seed)
        .map_err(|e| anyhow::anyhow!("cannot benchmark a {}x{} image: {}", source.size.w, source.size.h, e))?;
    log::info!(
        "benchmark seed {}: {} cases, {} repeats",
        settings.seed,
        requests.len(),
        settings.repeats
    );

    // Largest destination any case can produce.
    let capacity = source.size.area() * 16;
    let mut reference = vec![0u8; capacity];
    let mut destination = vec![0u8; capacity];
    let mut first_reference = Vec::new();

    let total = requests.len();
    let mut cases = Vec::with_capacity(total);
    for (index, request) in requests.into_iter().enumerate() {
        log::info!(
            "running test case {} of {}: rect {:?}, x {}, y {}",
            index + 1,
            total,
            request.rect,
            request.x_scale,
            request.y_scale
        );
        let area = request.destination().area();
        let reference = &mut reference[..area];
        let destination = &mut destination[..area];
        let mut case = TestCase::new(request);
        let mut hardware_mismatch: Option<Vec<u8>> = None;

        for repeat in 0..settings.repeats {
            context.flush_data_cache();
            let started = Instant::now();
            scale_nearest(&source.data, &request, reference)?;
            let elapsed = started.elapsed();
            let mismatches = if repeat == 0 {
                first_reference.clear();
                first_reference.extend_from_slice(reference);
                0
            } else {
                verify(&first_reference, reference)
            };
            let software = PathSample {
                elapsed,
                mismatches: Some(mismatches),
            };

            let hardware = accelerator_sample(context, reference, destination, |ctx, out| {
                ctx.scale_hw(&source.data, &request, out)
            });
            if hardware.mismatches.is_some_and(|count| count > 0) {
                hardware_mismatch = Some(destination.to_vec());
            }
            let hybrid = accelerator_sample(context, reference, destination, |ctx, out| {
                ctx.scale_hybrid(&source.data, &request, out)
            });

            let samples: RepeatSamples = [software, hardware, hybrid];
            case.repeats.push(samples);
        }

        if let Some(input) = &settings.result_stem {
            write_result_dumps(
                input,
                &request,
                reference,
                hardware_mismatch.as_deref(),
                settings.export_png,
            );
        }
        cases.push(case);
    }

    Ok(BenchmarkReport::new(settings.seed, cases))
}

/// Writes the reference output of a case and, when given, the hardware output
/// that disagreed with it. Write failures are logged and the benchmark goes on.
fn write_result_dumps(
    input: &Path,
    request: &ScaleRequest,
    reference: &[u8],
    hardware: Option<&[u8]>,
    export_png: bool,
) {
    let size = request.destination();
    let mut dumps = vec![(image_io::result_path(input, request), reference)];
    if let Some(hardware) = hardware {
        dumps.push((image_io::mismatch_path(input, request), hardware));
    }
    for (path, data) in dumps {
        let image = Image {
            size,
            data: data.to_vec(),
        };
        match image_io::save_raw(&path, &image) {
            Ok(()) => {
                log::info!("wrote result to {}", path.display());
                if export_png {
                    if let Err(error) = image_io::export_png(&path.with_extension("png"), &image) {
                        log::warn!("failed to write preview for {}: {}", path.display(), error);
                    }
                }
            }
            Err(error) => log::warn!("failed to write result: {}", error),
        }
    }
}

/// Times one accelerator run into a cleared destination and verifies it.
fn accelerator_sample<R, F>(
    context: &mut AcceleratorContext<R>,
    reference: &[u8],
    destination: &mut [u8],
    run: F,
) -> PathSample
where
    R: DmaRuntime,
    F: FnOnce(&mut AcceleratorContext<R>, &mut [u8]) -> Result<TransferStats, HwError>,
{
    destination.fill(0);
    context.flush_data_cache();
    let started = Instant::now();
    let result = run(context, destination);
    let elapsed: Duration = started.elapsed();
    match result {
        Ok(_) => PathSample {
            elapsed,
            mismatches: Some(verify(reference, destination)),
        },
        Err(error) => {
            log::warn!("hardware error: {}", error);
            context.check_status();
            PathSample {
                elapsed,
                mismatches: None,
            }
        }
    }
}

//! Synthetic benchmark: runs the full harness on a generated gradient image, so no
//! input file is needed.

use anyhow::Result;
use clap::Parser;
use hybrid_scaler::accel::AcceleratorContext;
use hybrid_scaler::accel::emulator::EmulatedRuntime;
use hybrid_scaler::benchmark::cases::clock_seed;
use hybrid_scaler::benchmark::{BenchmarkSettings, ScalePath, run_benchmark};
use hybrid_scaler::config::ScalerConfig;
use hybrid_scaler::image_io::Image;
use hybrid_scaler::Size;

#[derive(Parser, Debug)]
#[command(name = "benchmark")]
#[command(about = "Benchmark software, accelerator and hybrid scaling on a synthetic image")]
struct Args {
    /// Image width
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Image height
    #[arg(long, default_value_t = 256)]
    height: u32,

    /// Random cases after the fixed sweep
    #[arg(long, default_value_t = 50)]
    cases: usize,

    /// Timed rounds per case and path
    #[arg(long, default_value_t = 3)]
    repeats: usize,

    /// Seed (defaults to the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the CSV and JSON reports
    #[arg(long, default_value = ".")]
    out_dir: std::path::PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = ScalerConfig {
        root_dir: args.out_dir.clone(),
        random_cases: args.cases,
        repeats: args.repeats,
        write_results: false,
        seed: args.seed,
        ..ScalerConfig::default()
    };
    config.validate().map_err(anyhow::Error::msg)?;

    let size = Size {
        w: args.width,
        h: args.height,
    };
    let source = Image::from_fn(size, |x, y| (x.wrapping_mul(3) ^ y.wrapping_mul(5)) as u8);
    let seed = config.seed.unwrap_or_else(clock_seed);

    println!("Scaler Benchmark");
    println!("════════════════");
    println!(
        "Image {}x{}, {} random cases, {} repeats, seed {}",
        size.w, size.h, config.random_cases, config.repeats, seed
    );

    let mut context =
        AcceleratorContext::initialize(EmulatedRuntime::new(), &config.to_accelerator_config());
    if context.check_status() {
        anyhow::bail!("accelerator initialization failed");
    }

    let settings = BenchmarkSettings {
        seed,
        random_cases: config.random_cases,
        repeats: config.repeats,
        result_stem: None,
        export_png: false,
    };
    let report = run_benchmark(&mut context, &source, &settings)?;
    let (csv, json) = report.write_to(&config.root_dir)?;

    println!();
    println!("Results:");
    println!("────────");
    for path in ScalePath::ALL {
        let throughput = report.throughput(path);
        match report.statistics(path) {
            Some(stats) => println!(
                "{:>9}: mean {:.6} s, min {:.6} s, max {:.6} s, {:.1} Msamples/s, {:.2}x, {} mismatches, {} failed",
                path.name(),
                stats.mean_secs,
                stats.min_secs,
                stats.max_secs,
                throughput.samples_per_second() / 1e6,
                report.speedup(path).unwrap_or(0.0),
                report.total_mismatches(path),
                report.failed_runs(path)
            ),
            None => println!("{:>9}: no successful runs", path.name()),
        }
    }
    println!();
    println!("Wrote {} and {}", csv.display(), json.display());
    Ok(())
}

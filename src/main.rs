use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use hybrid_scaler::accel::emulator::EmulatedRuntime;
use hybrid_scaler::command::{Command, HELP};
use hybrid_scaler::config::ScalerConfig;
use hybrid_scaler::error::CommandError;
use hybrid_scaler::image_io;
use hybrid_scaler::session::{Outcome, ScaleSession};

/// Integer image rescaling on the SGDMA accelerator, verified against the
/// software reference.
#[derive(Parser, Debug)]
#[command(name = "scaler")]
#[command(about = "Rescale raw grayscale images on the accelerator and verify the result")]
#[command(long_about = "Rescale raw grayscale images through the scatter-gather DMA accelerator model.
Every command runs the software reference, the accelerator and the hybrid path,
and reports timings and mismatches.")]
struct Cli {
    #[command(flatten)]
    options: SessionOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SessionOptions {
    /// Directory input names are resolved against
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Random benchmark cases after the fixed sweep
    #[arg(long, global = true, default_value_t = 50)]
    cases: usize,

    /// Timed rounds per case and path
    #[arg(long, global = true, default_value_t = 3)]
    repeats: usize,

    /// Benchmark seed (defaults to the clock)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Skip the per-case result dumps during benchmarks
    #[arg(long, global = true)]
    no_results: bool,

    /// Write a PNG preview next to every .out file
    #[arg(long, global = true)]
    png: bool,

    /// Give up on a transfer after this many milliseconds
    #[arg(long, global = true, help = "Transfer timeout in milliseconds (default: wait forever)")]
    timeout_ms: Option<u64>,
}

impl SessionOptions {
    fn to_config(&self) -> ScalerConfig {
        ScalerConfig::new(
            self.root.clone(),
            self.cases,
            self.repeats,
            !self.no_results,
            self.png,
            self.timeout_ms,
            self.seed,
        )
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scale one image: `scale lena.bin R 0 0 64 64 -2 3`
    Scale {
        /// Input file
        file: String,
        /// `[R <x> <y> <w> <h>] <scale> [<y scale>]`
        #[arg(allow_hyphen_values = true, num_args = 1..)]
        args: Vec<String>,
    },
    /// Run the benchmark on one image
    Bench {
        /// Input file
        file: String,
    },
    /// Read commands from stdin, one per line
    Interactive,
    /// Convert any image the `image` crate reads into the raw format
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
    /// Render a raw image as PNG
    Preview {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.options.to_config();
    config.validate().map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Scale { file, args } => {
            let line = format!("{} {}", file, args.join(" "));
            let mut session = open_session(config)?;
            let outcome = session.execute_line(&line)?;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Bench { file } => {
            let mut session = open_session(config)?;
            let outcome = session.execute_line(&format!("{} B", file))?;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Interactive => interactive(config),
        Commands::Convert { input, output } => {
            let image = image_io::import_image(&input)?;
            image_io::save_raw(&output, &image)?;
            println!("Wrote {}x{} to {}", image.width(), image.height(), output.display());
            Ok(())
        }
        Commands::Preview { input, output } => {
            let image = image_io::load_raw(&input)?;
            image_io::export_png(&output, &image)?;
            println!("Wrote preview to {}", output.display());
            Ok(())
        }
    }
}

fn open_session(config: ScalerConfig) -> Result<ScaleSession<EmulatedRuntime>> {
    ScaleSession::builder()
        .with_config(config)
        .with_runtime(EmulatedRuntime::new())
        .build()
}

/// Console loop: every error is reported and the loop continues.
fn interactive(config: ScalerConfig) -> Result<()> {
    let mut session = open_session(config)?;
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = Command::parse(&line)
            .map_err(anyhow::Error::from)
            .and_then(|command| session.execute(&command));
        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(error) => report_error(&error),
        }
        stdout.flush()?;
    }
    Ok(())
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<CommandError>() {
        Some(command_error) => {
            println!("{}", CommandError::message_for(command_error.status()));
            log::error!("{}", command_error);
        }
        None => println!("ERROR: {:#}", error),
    }
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Scaled(scaled) => {
            let size = scaled.request.destination();
            println!("Output: {}x{} -> {}", size.w, size.h, scaled.output.display());
            println!("  software: {:.6} s", scaled.software.as_secs_f64());
            for (name, path) in [("hardware", &scaled.hardware), ("hybrid", &scaled.hybrid)] {
                match path.mismatches {
                    Some(count) => println!(
                        "  {}: {:.6} s, {} mismatches",
                        name,
                        path.elapsed.as_secs_f64(),
                        count
                    ),
                    None => println!("  {}: failed", name),
                }
            }
        }
        Outcome::Benchmark { report, csv, json } => {
            println!("Benchmark seed {}: {} cases", report.seed, report.cases.len());
            println!("  CSV: {}", csv.display());
            println!("  Summary: {}", json.display());
            if report.all_passed() {
                println!("  All accelerator runs matched the reference");
            } else {
                println!("  Accelerator mismatches or failures recorded, see the report");
            }
        }
    }
}

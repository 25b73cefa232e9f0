//! Common test utilities and helpers for the hybrid scaler tests
//!
//! Builds synthetic rasters and accelerator contexts backed by the emulated
//! runtime.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use hybrid_scaler::accel::emulator::{EmulatedRuntime, EmulatorConfig, EmulatorProbe};
use hybrid_scaler::accel::{AcceleratorConfig, AcceleratorContext};
use hybrid_scaler::image_io::{self, Image};
use hybrid_scaler::{ScaleFactor, Size};

pub type EmulatedContext = AcceleratorContext<EmulatedRuntime>;

/// Raster whose sample at `(x, y)` is `(y * w + x) mod 256`.
pub fn ramp(size: Size) -> Vec<u8> {
    (0..size.area()).map(|i| i as u8).collect()
}

/// Raster with no repeating structure along either axis within 256 samples.
pub fn pattern(size: Size) -> Image {
    Image::from_fn(size, |x, y| (x.wrapping_mul(7) ^ y.wrapping_mul(13)).wrapping_add(y) as u8)
}

pub fn factor(value: i32) -> ScaleFactor {
    ScaleFactor::new(value).expect("valid scale factor")
}

/// Healthy emulated accelerator with an unbounded wait.
pub fn context() -> (EmulatedContext, EmulatorProbe) {
    context_with(EmulatorConfig::default(), None)
}

pub fn context_with(
    emulator: EmulatorConfig,
    timeout: Option<Duration>,
) -> (EmulatedContext, EmulatorProbe) {
    let runtime = EmulatedRuntime::with_config(emulator);
    let probe = runtime.probe();
    let config = AcceleratorConfig {
        transfer_timeout: timeout,
        ..AcceleratorConfig::default()
    };
    (AcceleratorContext::initialize(runtime, &config), probe)
}

/// Writes `data` as a raw image file at `path`.
pub fn write_raw(path: &Path, size: Size, data: Vec<u8>) {
    let image = Image::new(size, data).expect("data matches size");
    image_io::save_raw(path, &image).expect("write raw image");
}

// SPDX-License-Identifier: MIT
// Reference nearest-neighbour scaler.
// 8-bit grayscale in → 8-bit grayscale out, direct write into caller-provided dst buffer.

use crate::geometry::{ScaleFactor, ScaleRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleError {
    SourceTooSmall { needed: usize, actual: usize },
    BufferTooSmall { needed: usize, actual: usize },
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::SourceTooSmall { needed, actual } => {
                write!(f, "Source buffer too small ({} < {} bytes)", actual, needed)
            }
            ScaleError::BufferTooSmall { needed, actual } => {
                write!(f, "Output buffer too small ({} < {} bytes)", actual, needed)
            }
        }
    }
}

impl std::error::Error for ScaleError {}

/// Scale one line along the horizontal axis.
///
/// `dst` must hold at least `factor.scaled_len(src.len())` samples.
#[inline]
pub fn scale_line(src: &[u8], factor: ScaleFactor, dst: &mut [u8]) {
    let m = factor.magnitude() as usize;
    if factor.is_upscale() {
        for (run, &sample) in dst.chunks_exact_mut(m).zip(src) {
            run.fill(sample);
        }
    } else {
        for (out, &sample) in dst.iter_mut().zip(src.iter().step_by(m)) {
            *out = sample;
        }
    }
}

/// Main scaling entry point.
/// `src` is the whole source raster (stride `request.source.w`), `dst` receives the
/// scaled rectangle tightly packed and must hold `request.destination().area()` bytes.
pub fn scale_nearest(src: &[u8], request: &ScaleRequest, dst: &mut [u8]) -> Result<(), ScaleError> {
    let needed_src = request.required_source_len();
    if src.len() < needed_src {
        return Err(ScaleError::SourceTooSmall {
            needed: needed_src,
            actual: src.len(),
        });
    }
    let out = request.destination();
    let dst_len = out.area();
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall {
            needed: dst_len,
            actual: dst.len(),
        });
    }

    let width = request.rect.w as usize;
    let dwidth = out.w as usize;
    let y_scale = request.y_scale;
    let m = y_scale.magnitude() as usize;

    if y_scale.is_upscale() {
        for row in 0..request.rect.h {
            let s = request.source_offset(row);
            let first = row as usize * m * dwidth;
            scale_line(&src[s..s + width], request.x_scale, &mut dst[first..first + dwidth]);
            // Replicate whole rows in bulk rather than per pixel.
            for copy in 1..m {
                let d = first + copy * dwidth;
                dst.copy_within(first..first + dwidth, d);
            }
        }
    } else {
        for (out_row, row) in (0..request.rect.h).step_by(m).enumerate() {
            let s = request.source_offset(row);
            let d = out_row * dwidth;
            scale_line(&src[s..s + width], request.x_scale, &mut dst[d..d + dwidth]);
        }
    }

    Ok(())
}

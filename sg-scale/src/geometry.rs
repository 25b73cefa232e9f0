// SPDX-License-Identifier: MIT
//! # Request Geometry
//!
//! Types describing one rescaling request: the source raster size, the rectangle
//! to scale, the per-axis factors and the destination size derived from them.
//!
//! ## Destination Size
//!
//! Per axis, for a rectangle extent `n` and factor `s`:
//!
//! ```text
//! s > 0  →  n * s
//! s < 0  →  ceil(n / |s|)
//! ```
//!
//! The ceiling matches nearest-neighbour downscaling that keeps samples
//! `0, |s|, 2|s|, …`: a trailing partial group still contributes its first sample.

use std::fmt;

/// Every factor accepted by the scalers, in the order the benchmark sweep uses.
pub const VALID_FACTORS: [i32; 8] = [-4, -3, -2, -1, 1, 2, 3, 4];

/// Largest factor magnitude (the accelerator encodes `|s| - 1` in two bits).
pub const MAX_SCALE: u32 = 4;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Number of samples in a raster of this size.
    pub fn area(&self) -> usize {
        self.w as usize * self.h as usize
    }
}

/// Sub-rectangle of a source raster, in source pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Signed integer scale factor for one axis.
///
/// Positive values upscale by replication, negative values downscale by
/// skipping. Zero and magnitudes above [`MAX_SCALE`] cannot be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScaleFactor(i8);

impl ScaleFactor {
    /// Identity factor (`1`). The accelerator treats `-1` identically.
    pub const IDENTITY: ScaleFactor = ScaleFactor(1);

    /// Every representable factor, in [`VALID_FACTORS`] order.
    pub const ALL: [ScaleFactor; 8] = [
        ScaleFactor(-4),
        ScaleFactor(-3),
        ScaleFactor(-2),
        ScaleFactor(-1),
        ScaleFactor(1),
        ScaleFactor(2),
        ScaleFactor(3),
        ScaleFactor(4),
    ];

    /// Returns `None` unless `value` is one of [`VALID_FACTORS`].
    pub fn new(value: i32) -> Option<Self> {
        if VALID_FACTORS.contains(&value) {
            Some(Self(value as i8))
        } else {
            None
        }
    }

    /// Upscaling factor of the given magnitude, if representable.
    pub fn up(magnitude: u32) -> Option<Self> {
        Self::new(i32::try_from(magnitude).ok()?)
    }

    /// Downscaling factor of the given magnitude, if representable.
    pub fn down(magnitude: u32) -> Option<Self> {
        Self::new(-i32::try_from(magnitude).ok()?)
    }

    pub fn get(self) -> i32 {
        self.0 as i32
    }

    /// `true` for positive factors, including the identity `1`.
    pub fn is_upscale(self) -> bool {
        self.0 > 0
    }

    pub fn magnitude(self) -> u32 {
        self.0.unsigned_abs() as u32
    }

    /// Length of an axis of `len` samples after applying this factor.
    pub fn scaled_len(self, len: u32) -> u32 {
        let m = self.magnitude();
        if self.is_upscale() {
            len * m
        } else {
            len.div_ceil(m)
        }
    }

    /// Factor that undoes this one (up by `s` ↔ down by `s`).
    pub fn reciprocal(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reasons a [`ScaleRequest`] cannot be formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// Rectangle has zero width or height.
    EmptyRect,
    /// Top-left corner lies outside the source raster.
    StartOutOfBounds { x: u32, y: u32 },
    /// Bottom-right corner lies outside the source raster.
    EndOutOfBounds { x_end: u64, y_end: u64 },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::EmptyRect => write!(f, "Rectangle is empty"),
            GeometryError::StartOutOfBounds { x, y } => {
                write!(f, "Rectangle start ({}, {}) lies outside the source", x, y)
            }
            GeometryError::EndOutOfBounds { x_end, y_end } => {
                write!(f, "Rectangle end ({}, {}) lies outside the source", x_end, y_end)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// One unit of rescaling work, shared by the software, accelerator and hybrid paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaleRequest {
    /// Dimensions of the whole source raster (row stride = `source.w`).
    pub source: Size,
    /// Rectangle of the source to scale.
    pub rect: Rect,
    pub x_scale: ScaleFactor,
    pub y_scale: ScaleFactor,
}

impl ScaleRequest {
    /// Validate the rectangle against the source and build the request.
    pub fn new(
        source: Size,
        rect: Rect,
        x_scale: ScaleFactor,
        y_scale: ScaleFactor,
    ) -> Result<Self, GeometryError> {
        if rect.w == 0 || rect.h == 0 {
            return Err(GeometryError::EmptyRect);
        }
        if rect.x >= source.w || rect.y >= source.h {
            return Err(GeometryError::StartOutOfBounds { x: rect.x, y: rect.y });
        }
        let x_end = rect.x as u64 + rect.w as u64;
        let y_end = rect.y as u64 + rect.h as u64;
        if x_end > source.w as u64 || y_end > source.h as u64 {
            return Err(GeometryError::EndOutOfBounds { x_end, y_end });
        }
        Ok(Self {
            source,
            rect,
            x_scale,
            y_scale,
        })
    }

    /// Request covering the whole source raster.
    pub fn full(source: Size, x_scale: ScaleFactor, y_scale: ScaleFactor) -> Result<Self, GeometryError> {
        Self::new(
            source,
            Rect {
                x: 0,
                y: 0,
                w: source.w,
                h: source.h,
            },
            x_scale,
            y_scale,
        )
    }

    /// Dimensions of the rescaled output.
    pub fn destination(&self) -> Size {
        Size {
            w: self.x_scale.scaled_len(self.rect.w),
            h: self.y_scale.scaled_len(self.rect.h),
        }
    }

    /// Index of the first sample of rectangle row `row` inside the source raster.
    pub fn source_offset(&self, row: u32) -> usize {
        (self.rect.y + row) as usize * self.source.w as usize + self.rect.x as usize
    }

    /// Smallest source buffer length that contains every row of the rectangle.
    pub fn required_source_len(&self) -> usize {
        self.source_offset(self.rect.h - 1) + self.rect.w as usize
    }
}

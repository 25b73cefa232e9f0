// SPDX-License-Identifier: MIT
//! # sg-scale: Integer Nearest-Neighbour Rescaling for Grayscale Rasters
//!
//! This crate holds the pure-computation half of the hybrid scaler: the request
//! geometry shared by every scaling path and the software reference scaler that
//! the accelerator paths are verified against.
//!
//! ## Key Components
//!
//! - [`geometry`]: scale factors, rectangles and destination size computation
//! - [`nearest`]: the reference nearest-neighbour scaler
//!
//! ## Scale Factors
//!
//! Factors are small signed integers taken from `{-4, -3, -2, -1, 1, 2, 3, 4}`:
//! - positive `s`: every source sample is replicated `s` times
//! - negative `s`: every `|s|`-th sample is kept, starting with the first one
//! - `-1` and `1` are both the identity
//!
//! ## Usage Example
//!
//! ```rust
//! use sg_scale::geometry::{Rect, ScaleFactor, ScaleRequest, Size};
//! use sg_scale::nearest::scale_nearest;
//!
//! let source: Vec<u8> = (0..16u8).collect();
//! let request = ScaleRequest::new(
//!     Size { w: 4, h: 4 },
//!     Rect { x: 0, y: 0, w: 4, h: 4 },
//!     ScaleFactor::new(2).unwrap(),
//!     ScaleFactor::new(-2).unwrap(),
//! )
//! .unwrap();
//!
//! let out = request.destination();
//! let mut destination = vec![0u8; out.area()];
//! scale_nearest(&source, &request, &mut destination).unwrap();
//! assert_eq!(&destination[..8], &[0, 0, 1, 1, 2, 2, 3, 3]);
//! ```

pub mod geometry;
pub mod nearest;

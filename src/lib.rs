//! # Hybrid Scaler Library
//!
//! Driver and verification harness for an integer image-rescaling accelerator
//! that sits between two scatter-gather DMA channels.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `accel`: the accelerator driver (register protocol, descriptor chains,
//!   transfer synchronization) and a host-side model of the hardware
//! - `core`: descriptor pool, completion tracking and timing analysis
//! - `benchmark`: case generation, timed runs of every path and reports
//! - `command`: the line-oriented command protocol
//! - `image_io`: raw image files and PNG previews
//! - `config`: configuration management and validation
//! - `session`: high-level session orchestration
//!
//! The software reference scaler and the request geometry live in the `sg-scale`
//! workspace crate and are re-exported here.
//!
//! ## Scaling Paths
//!
//! - **Software**: the reference nearest-neighbour scaler on the CPU
//! - **Hardware**: every source row goes through the accelerator, which scales both axes
//! - **Hybrid**: vertical downscaling is done by sending only the rows that survive,
//!   the accelerator handles the rest
//!
//! ## Example
//!
//! ```rust
//! use hybrid_scaler::accel::emulator::EmulatedRuntime;
//! use hybrid_scaler::accel::{AcceleratorConfig, AcceleratorContext};
//! use hybrid_scaler::{ScaleFactor, ScaleRequest, Size};
//!
//! let mut context =
//!     AcceleratorContext::initialize(EmulatedRuntime::new(), &AcceleratorConfig::default());
//! assert!(!context.check_status());
//!
//! let size = Size { w: 4, h: 4 };
//! let source: Vec<u8> = (0..16).collect();
//! let request = ScaleRequest::full(size, ScaleFactor::new(2).unwrap(), ScaleFactor::new(-2).unwrap())?;
//!
//! let mut destination = vec![0u8; request.destination().area()];
//! context.scale_hybrid(&source, &request, &mut destination)?;
//! assert_eq!(&destination[..8], &[0, 0, 1, 1, 2, 2, 3, 3]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod accel;
pub mod benchmark;
pub mod command;
pub mod config;
pub mod core;
pub mod error;
pub mod image_io;
pub mod session;

/// Re-export error types for convenience
pub use error::{CommandError, ErrorSeverity, HasSeverity, HwError, Recoverable, StatusCode};

/// Re-export the request geometry and reference scaler from `sg-scale`
pub use sg_scale::geometry::{Rect, ScaleFactor, ScaleRequest, Size};
pub use sg_scale::nearest::scale_nearest;

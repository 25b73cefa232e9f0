//! # Core Infrastructure Module
//!
//! Low-level building blocks shared by the accelerator driver and the benchmark
//! harness: the descriptor arena, completion tracking between the driver and the
//! DMA engines, and timing analysis.

pub mod completion;
pub mod descriptor_pool;
pub mod performance_analysis;

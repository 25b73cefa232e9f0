//! # Configuration Module
//!
//! Configuration structures for scaling and benchmark sessions.

#[allow(clippy::module_inception)]
pub mod config;

pub use config::ScalerConfig;

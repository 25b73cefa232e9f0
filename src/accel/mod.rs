//! # Accelerator Driver
//!
//! Drives the up/down scaler that sits between two scatter-gather DMA channels:
//!
//! ```text
//!  source raster ──▶ tx SGDMA (memory→stream) ──▶ scaler ──▶ rx SGDMA (stream→memory) ──▶ destination
//!                        ▲                           ▲                ▲
//!                   tx chain                    CR / WH regs      rx chain
//! ```
//!
//! - [`regs`]: encoding of the two scaler control registers
//! - [`chain`]: construction of the transmit and receive descriptor chains
//! - [`context`]: session state, the status gate and the per-request entry points
//! - [`sync`]: starting both transfers and waiting for both completions
//! - [`emulator`]: software model of the two channels and the scaler
//!
//! The runtime environment is reached only through the [`DmaRuntime`],
//! [`DmaChannel`] and [`RegisterBus`] traits.

pub mod chain;
pub mod context;
pub mod emulator;
pub mod regs;
pub mod sync;

use crate::core::descriptor_pool::DescriptorPool;

pub use context::{AcceleratorConfig, AcceleratorContext, TransferStats};

/// Line-buffer length of the scaler; rectangles wider or taller are rejected.
pub const BUFFER_SIZE: u32 = 1024;

/// Default name of the memory-to-stream channel.
pub const SGDMA_M2S_NAME: &str = "sgdma_m2s";

/// Default name of the stream-to-memory channel.
pub const SGDMA_S2M_NAME: &str = "sgdma_s2m";

/// Callback invoked once per completed transfer, from the engine's context.
pub type CompletionCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// One direction of a scatter-gather DMA engine.
pub trait DmaChannel {
    /// Installs the completion callback. Replaces any previous one.
    fn register_callback(&mut self, callback: CompletionCallback);

    /// Starts executing the chain whose first descriptor is in slot `head`.
    ///
    /// Returns immediately; completion is reported through the callback.
    ///
    /// # Errors
    ///
    /// Returns a description of why the engine refused the chain.
    ///
    /// # Safety
    ///
    /// Every address in the chain must stay valid for the accesses the channel
    /// performs (reads for memory-to-stream, writes for stream-to-memory) until the
    /// completion callback has fired or [`DmaChannel::stop`] has returned, and no
    /// other reference may access the written memory in that time.
    unsafe fn start_async(&mut self, pool: &DescriptorPool, head: usize) -> Result<(), String>;

    /// Halts the channel. Idempotent.
    ///
    /// After this returns the channel no longer touches memory described by the
    /// chain it was started with.
    fn stop(&mut self);
}

/// Memory-mapped 32-bit register window of the scaler.
pub trait RegisterBus {
    fn write32(&mut self, offset: usize, value: u32);
    fn read32(&self, offset: usize) -> u32;
}

/// The runtime capability the driver is built on.
pub trait DmaRuntime {
    type Channel: DmaChannel;
    type Registers: RegisterBus;

    /// Opens a DMA channel by name, `None` if no such channel exists.
    fn open_channel(&mut self, name: &str) -> Option<Self::Channel>;

    /// Register window of the scaler.
    fn scaler_registers(&mut self) -> Self::Registers;

    /// Flushes the data cache ahead of a timed section.
    fn flush_data_cache(&self) {}
}

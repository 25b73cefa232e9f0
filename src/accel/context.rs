//! Accelerator session state.
//!
//! An [`AcceleratorContext`] owns both DMA channels, the scaler register window and
//! the descriptor pool for the lifetime of a session. Requests borrow the context
//! mutably, so at most one transfer is in flight.
//!
//! Failures are returned as [`HwError`] and also recorded as a [`StatusCode`] on
//! the context. [`AcceleratorContext::check_status`] is the gate callers consult
//! between steps.

use std::sync::Arc;
use std::time::Duration;

use sg_scale::geometry::{MAX_SCALE, ScaleRequest};

use super::chain::{self, ChainLayout};
use super::regs::{self, ScalerRegisters};
use super::{BUFFER_SIZE, DmaChannel, DmaRuntime, SGDMA_M2S_NAME, SGDMA_S2M_NAME, sync};
use crate::core::completion::{CompletionTracker, Direction};
use crate::core::descriptor_pool::DescriptorPool;
use crate::error::{HwError, StatusCode};

/// Descriptors needed by the largest request the scaler accepts: every source row,
/// every destination row at the largest upscale, and two stop markers.
pub const DESCRIPTOR_CAPACITY: usize = (BUFFER_SIZE + BUFFER_SIZE * MAX_SCALE + 2) as usize;

type ChainBuilder =
    fn(&mut DescriptorPool, &ScaleRequest, &[u8], &mut [u8]) -> Result<ChainLayout, HwError>;

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorConfig {
    /// Memory-to-stream channel name
    pub tx_channel: String,
    /// Stream-to-memory channel name
    pub rx_channel: String,
    /// Bound on the completion wait, `None` to wait indefinitely
    pub transfer_timeout: Option<Duration>,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            tx_channel: SGDMA_M2S_NAME.to_string(),
            rx_channel: SGDMA_S2M_NAME.to_string(),
            transfer_timeout: None,
        }
    }
}

/// What one accelerator run put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    /// Transmit descriptors, stop marker included
    pub tx_descriptors: usize,
    /// Receive descriptors, stop marker included
    pub rx_descriptors: usize,
    /// Source rows sent to the scaler
    pub rows_sent: u32,
}

impl TransferStats {
    pub fn descriptors(&self) -> usize {
        self.tx_descriptors + self.rx_descriptors
    }
}

impl From<&ChainLayout> for TransferStats {
    fn from(layout: &ChainLayout) -> Self {
        Self {
            tx_descriptors: layout.tx.slots(),
            rx_descriptors: layout.rx.slots(),
            rows_sent: layout.rows_sent,
        }
    }
}

/// Single-owner accelerator session.
pub struct AcceleratorContext<R: DmaRuntime> {
    runtime: R,
    status: StatusCode,
    tx: Option<R::Channel>,
    rx: Option<R::Channel>,
    registers: Option<R::Registers>,
    pool: Option<DescriptorPool>,
    completion: Arc<CompletionTracker>,
    transfer_timeout: Option<Duration>,
}

impl<R: DmaRuntime> AcceleratorContext<R> {
    /// Opens both channels, allocates the descriptor pool and wires the completion
    /// callbacks.
    ///
    /// Never fails outright: the first failure is recorded in [`status`](Self::status)
    /// and the partially initialized context is returned for the caller to gate on.
    pub fn initialize(runtime: R, config: &AcceleratorConfig) -> Self {
        let mut context = Self {
            runtime,
            status: StatusCode::OK,
            tx: None,
            rx: None,
            registers: None,
            pool: None,
            completion: Arc::new(CompletionTracker::new()),
            transfer_timeout: config.transfer_timeout,
        };
        match context.open(config) {
            Ok(()) => log::info!(
                "accelerator ready: tx '{}', rx '{}', {} descriptors",
                config.tx_channel,
                config.rx_channel,
                DESCRIPTOR_CAPACITY
            ),
            Err(error) => {
                log::error!("accelerator initialization failed: {}", error);
                context.status = error.status();
            }
        }
        context
    }

    fn open(&mut self, config: &AcceleratorConfig) -> Result<(), HwError> {
        let mut tx = self
            .runtime
            .open_channel(&config.tx_channel)
            .ok_or_else(|| HwError::TxOpen {
                channel: config.tx_channel.clone(),
            })?;
        let mut rx = self
            .runtime
            .open_channel(&config.rx_channel)
            .ok_or_else(|| HwError::RxOpen {
                channel: config.rx_channel.clone(),
            })?;
        let pool = DescriptorPool::new(DESCRIPTOR_CAPACITY)?;

        let completion = Arc::clone(&self.completion);
        tx.register_callback(Box::new(move || completion.notify(Direction::Transmit)));
        let completion = Arc::clone(&self.completion);
        rx.register_callback(Box::new(move || completion.notify(Direction::Receive)));

        self.registers = Some(self.runtime.scaler_registers());
        self.tx = Some(tx);
        self.rx = Some(rx);
        self.pool = Some(pool);
        Ok(())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// `true` once initialization succeeded and until [`cleanup`](Self::cleanup).
    pub fn is_ready(&self) -> bool {
        !self.status.is_fatal()
            && self.tx.is_some()
            && self.rx.is_some()
            && self.registers.is_some()
            && self.pool.is_some()
    }

    /// Status gate.
    ///
    /// Returns `false` when the status is clear. Otherwise prints the diagnostic and
    /// returns `true`. Initialization failures release every resource; per-request
    /// failures stop both channels and clear the status, keeping the pool for the
    /// next request.
    pub fn check_status(&mut self) -> bool {
        if self.status.is_ok() {
            return false;
        }
        log::error!("accelerator: {}", self.status);
        eprintln!("ERROR: {}", self.status.message());
        if self.status.is_fatal() {
            self.cleanup();
        } else {
            self.stop_channels();
            self.status = StatusCode::OK;
        }
        true
    }

    /// Stops both channels and releases the descriptor pool. Idempotent.
    pub fn cleanup(&mut self) {
        self.stop_channels();
        if self.pool.take().is_some() {
            log::debug!("descriptor pool released");
        }
    }

    fn stop_channels(&mut self) {
        if let Some(tx) = self.tx.as_mut() {
            tx.stop();
        }
        if let Some(rx) = self.rx.as_mut() {
            rx.stop();
        }
    }

    /// Rescales `request` entirely on the accelerator.
    ///
    /// `destination` must hold at least `request.destination().area()` bytes.
    pub fn scale_hw(
        &mut self,
        source: &[u8],
        request: &ScaleRequest,
        destination: &mut [u8],
    ) -> Result<TransferStats, HwError> {
        self.run(source, request, destination, chain::build_scale_chains)
    }

    /// Rescales `request` with vertical downscaling done by row selection on the
    /// transmit side and everything else on the accelerator.
    pub fn scale_hybrid(
        &mut self,
        source: &[u8],
        request: &ScaleRequest,
        destination: &mut [u8],
    ) -> Result<TransferStats, HwError> {
        self.run(source, request, destination, chain::build_hybrid_chains)
    }

    pub fn flush_data_cache(&self) {
        self.runtime.flush_data_cache();
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn pool(&self) -> Option<&DescriptorPool> {
        self.pool.as_ref()
    }

    fn run(
        &mut self,
        source: &[u8],
        request: &ScaleRequest,
        destination: &mut [u8],
        build: ChainBuilder,
    ) -> Result<TransferStats, HwError> {
        if !self.status.is_fatal() {
            self.status = StatusCode::OK;
        }
        let result = self.transfer(source, request, destination, build);
        if let Err(error) = &result {
            if !self.status.is_fatal() {
                self.status = error.status();
            }
        }
        result
    }

    fn transfer(
        &mut self,
        source: &[u8],
        request: &ScaleRequest,
        destination: &mut [u8],
        build: ChainBuilder,
    ) -> Result<TransferStats, HwError> {
        if self.status.is_fatal() {
            return Err(HwError::NotInitialized);
        }
        let (Some(tx), Some(rx), Some(registers), Some(pool)) = (
            self.tx.as_mut(),
            self.rx.as_mut(),
            self.registers.as_mut(),
            self.pool.as_mut(),
        ) else {
            return Err(HwError::NotInitialized);
        };

        regs::check_geometry(request.rect.w, request.rect.h)?;
        let layout = build(pool, request, source, destination)?;

        let words = ScalerRegisters::encode(
            request.x_scale,
            layout.y_scale,
            request.rect.w,
            layout.rows_sent,
        );
        log::debug!(
            "scaler registers: CR {:#010x}, WH {:#010x}",
            words.control,
            words.geometry
        );
        words.write_to(registers);

        // SAFETY: the chains point into `source` and `destination`, which stay
        // borrowed until this function returns, and `run_transfers` stops both
        // channels before returning.
        unsafe {
            sync::run_transfers(
                tx,
                rx,
                pool,
                &layout,
                &self.completion,
                self.transfer_timeout,
            )?;
        }
        Ok(TransferStats::from(&layout))
    }
}

impl<R: DmaRuntime> Drop for AcceleratorContext<R> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::emulator::{EmulatedRuntime, EmulatorConfig};
    use sg_scale::geometry::{ScaleFactor, Size};

    fn ramp(size: Size) -> Vec<u8> {
        (0..size.area()).map(|i| i as u8).collect()
    }

    #[test]
    fn test_initialize_records_open_failures() {
        let tx_missing = EmulatedRuntime::with_config(EmulatorConfig {
            fail_open_tx: true,
            ..Default::default()
        });
        let mut context = AcceleratorContext::initialize(tx_missing, &AcceleratorConfig::default());
        assert_eq!(context.status(), StatusCode::TX_OPEN_FAILED);
        assert!(!context.is_ready());
        assert!(context.check_status());
        assert!(context.pool().is_none());

        let rx_missing = EmulatedRuntime::with_config(EmulatorConfig {
            fail_open_rx: true,
            ..Default::default()
        });
        let context = AcceleratorContext::initialize(rx_missing, &AcceleratorConfig::default());
        assert_eq!(context.status(), StatusCode::RX_OPEN_FAILED);
    }

    #[test]
    fn test_unknown_channel_name() {
        let config = AcceleratorConfig {
            tx_channel: "nope".into(),
            ..Default::default()
        };
        let context = AcceleratorContext::initialize(EmulatedRuntime::new(), &config);
        assert_eq!(context.status(), StatusCode::TX_OPEN_FAILED);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut context =
            AcceleratorContext::initialize(EmulatedRuntime::new(), &AcceleratorConfig::default());
        assert!(context.is_ready());
        assert_eq!(context.pool().map(|p| p.capacity()), Some(DESCRIPTOR_CAPACITY));
        context.cleanup();
        context.cleanup();
        assert!(context.pool().is_none());

        let size = Size { w: 4, h: 4 };
        let request =
            ScaleRequest::full(size, ScaleFactor::IDENTITY, ScaleFactor::IDENTITY).unwrap();
        let mut out = vec![0u8; 16];
        let err = context.scale_hw(&ramp(size), &request, &mut out).unwrap_err();
        assert_eq!(err, HwError::NotInitialized);
        assert_eq!(context.status(), StatusCode::NOT_INITIALIZED);
    }

    #[test]
    fn test_per_request_failure_keeps_session() {
        let mut context =
            AcceleratorContext::initialize(EmulatedRuntime::new(), &AcceleratorConfig::default());
        let size = Size { w: 8, h: 8 };
        let source = ramp(size);
        let request = ScaleRequest::full(size, ScaleFactor::new(2).unwrap(), ScaleFactor::IDENTITY)
            .unwrap();

        let mut short = vec![0u8; 10];
        let err = context.scale_hw(&source, &request, &mut short).unwrap_err();
        assert_eq!(err.status(), StatusCode::BUFFER_TOO_SMALL);
        assert!(context.check_status());
        assert!(context.status().is_ok());
        assert!(context.pool().is_some());

        let mut out = vec![0u8; request.destination().area()];
        let stats = context.scale_hw(&source, &request, &mut out).unwrap();
        assert_eq!(stats.descriptors(), 8 + 8 + 2);
        assert!(!context.check_status());
        assert_eq!(&out[..4], &[0, 0, 1, 1]);
    }
}

//! Host-side model of the two SGDMA channels and the up/down scaler between them.
//!
//! The transmit channel reads its chain's segments from memory and pushes them
//! through a scaler model that latched the CR/WH registers when the transfer
//! started. Scaled lines travel over a `crossbeam-channel` stream to the receive
//! channel, which scatters them into its own chain's segments. Each channel runs on
//! its own worker thread and fires its completion callback when its chain is done.
//!
//! Failure injection covers the paths the driver has to survive: a channel that
//! cannot be opened, a chain the engine refuses, and a stalled engine that never
//! completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use sg_scale::geometry::ScaleFactor;

use super::regs::{CR_ADDR, ScalerRegisters, WH_ADDR};
use super::{CompletionCallback, DmaChannel, DmaRuntime, RegisterBus, SGDMA_M2S_NAME, SGDMA_S2M_NAME};
use crate::core::completion::Direction;
use crate::core::descriptor_pool::{DescriptorPool, TransferDescriptor};

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Failure injection switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// `open_channel` returns `None` for the memory-to-stream channel
    pub fail_open_tx: bool,
    /// `open_channel` returns `None` for the stream-to-memory channel
    pub fail_open_rx: bool,
    /// The transmit channel refuses every chain
    pub fail_start_tx: bool,
    /// The receive channel refuses every chain
    pub fail_start_rx: bool,
    /// Both channels accept chains but never move data or complete
    pub stall: bool,
}

/// State shared by the register window and both channels.
#[derive(Default)]
struct Fabric {
    registers: Mutex<[u32; 2]>,
    register_writes: AtomicUsize,
    stream: Mutex<Option<Receiver<Vec<u8>>>>,
    starts: [AtomicUsize; 2],
    running: [AtomicBool; 2],
}

fn slot(direction: Direction) -> usize {
    match direction {
        Direction::Transmit => 0,
        Direction::Receive => 1,
    }
}

/// Emulated accelerator runtime.
pub struct EmulatedRuntime {
    config: EmulatorConfig,
    fabric: Arc<Fabric>,
}

impl EmulatedRuntime {
    pub fn new() -> Self {
        Self::with_config(EmulatorConfig::default())
    }

    pub fn with_config(config: EmulatorConfig) -> Self {
        Self {
            config,
            fabric: Arc::new(Fabric::default()),
        }
    }

    /// Observation handle that outlives moving the runtime into a context.
    pub fn probe(&self) -> EmulatorProbe {
        EmulatorProbe {
            fabric: Arc::clone(&self.fabric),
        }
    }
}

impl Default for EmulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaRuntime for EmulatedRuntime {
    type Channel = EmulatedChannel;
    type Registers = EmulatedRegisters;

    fn open_channel(&mut self, name: &str) -> Option<EmulatedChannel> {
        let (direction, fail_open, fail_start) = match name {
            SGDMA_M2S_NAME => (
                Direction::Transmit,
                self.config.fail_open_tx,
                self.config.fail_start_tx,
            ),
            SGDMA_S2M_NAME => (
                Direction::Receive,
                self.config.fail_open_rx,
                self.config.fail_start_rx,
            ),
            _ => return None,
        };
        if fail_open {
            log::debug!("emulator: refusing to open '{}'", name);
            return None;
        }
        Some(EmulatedChannel {
            direction,
            fabric: Arc::clone(&self.fabric),
            fail_start,
            stall: self.config.stall,
            callback: None,
            worker: None,
        })
    }

    fn scaler_registers(&mut self) -> EmulatedRegisters {
        EmulatedRegisters {
            fabric: Arc::clone(&self.fabric),
        }
    }
}

/// Read-only view of the emulator's internal state.
#[derive(Clone)]
pub struct EmulatorProbe {
    fabric: Arc<Fabric>,
}

impl EmulatorProbe {
    /// Total register writes since creation.
    pub fn register_writes(&self) -> usize {
        self.fabric.register_writes.load(Ordering::Acquire)
    }

    pub fn registers(&self) -> ScalerRegisters {
        let words = self.fabric.registers.lock();
        ScalerRegisters {
            control: words[0],
            geometry: words[1],
        }
    }

    /// Chains accepted by the channel in `direction`.
    pub fn starts(&self, direction: Direction) -> usize {
        self.fabric.starts[slot(direction)].load(Ordering::Acquire)
    }

    /// `true` while the channel in `direction` has a transfer that was not stopped.
    pub fn is_running(&self, direction: Direction) -> bool {
        self.fabric.running[slot(direction)].load(Ordering::Acquire)
    }
}

/// Register window of the emulated scaler.
pub struct EmulatedRegisters {
    fabric: Arc<Fabric>,
}

impl RegisterBus for EmulatedRegisters {
    fn write32(&mut self, offset: usize, value: u32) {
        let index = match offset {
            CR_ADDR => 0,
            WH_ADDR => 1,
            _ => {
                log::warn!("emulator: write to unmapped register offset {}", offset);
                return;
            }
        };
        self.fabric.registers.lock()[index] = value;
        self.fabric.register_writes.fetch_add(1, Ordering::AcqRel);
    }

    fn read32(&self, offset: usize) -> u32 {
        let words = self.fabric.registers.lock();
        match offset {
            CR_ADDR => words[0],
            WH_ADDR => words[1],
            _ => 0,
        }
    }
}

struct Worker {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// One emulated SGDMA channel.
pub struct EmulatedChannel {
    direction: Direction,
    fabric: Arc<Fabric>,
    fail_start: bool,
    stall: bool,
    callback: Option<Arc<dyn Fn() + Send + Sync>>,
    worker: Option<Worker>,
}

impl DmaChannel for EmulatedChannel {
    fn register_callback(&mut self, callback: CompletionCallback) {
        self.callback = Some(Arc::from(callback));
    }

    unsafe fn start_async(&mut self, pool: &DescriptorPool, head: usize) -> Result<(), String> {
        if self.fail_start {
            return Err(format!("{:?} engine rejected the chain", self.direction));
        }
        if self.worker.is_some() {
            return Err(format!("{:?} engine is busy", self.direction));
        }

        let segments = pool.walk(head);
        let cancel = Arc::new(AtomicBool::new(false));
        let callback = self.callback.clone();
        let stall = self.stall;

        let handle = match self.direction {
            Direction::Transmit => {
                let (sender, receiver) = crossbeam_channel::unbounded();
                *self.fabric.stream.lock() = Some(receiver);
                let latched = {
                    let words = self.fabric.registers.lock();
                    ScalerRegisters {
                        control: words[0],
                        geometry: words[1],
                    }
                };
                let cancel = Arc::clone(&cancel);
                thread::spawn(move || {
                    if stall {
                        wait_for_cancel(&cancel);
                        return;
                    }
                    if transmit(&segments, ScalerModel::latch(latched), &sender, &cancel) {
                        if let Some(callback) = callback {
                            callback();
                        }
                    }
                })
            }
            Direction::Receive => {
                let Some(stream) = self.fabric.stream.lock().take() else {
                    return Err("no stream source connected".to_string());
                };
                let cancel = Arc::clone(&cancel);
                thread::spawn(move || {
                    if stall {
                        wait_for_cancel(&cancel);
                        return;
                    }
                    if receive(&segments, &stream, &cancel) {
                        if let Some(callback) = callback {
                            callback();
                        }
                    }
                })
            }
        };

        let index = slot(self.direction);
        self.fabric.starts[index].fetch_add(1, Ordering::AcqRel);
        self.fabric.running[index].store(true, Ordering::Release);
        self.worker = Some(Worker { cancel, handle });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.store(true, Ordering::Release);
            if worker.handle.join().is_err() {
                log::error!("emulator: {:?} worker panicked", self.direction);
            }
        }
        self.fabric.running[slot(self.direction)].store(false, Ordering::Release);
    }
}

impl Drop for EmulatedChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wait_for_cancel(cancel: &AtomicBool) {
    while !cancel.load(Ordering::Acquire) {
        thread::sleep(POLL_INTERVAL);
    }
}

/// Reads every segment and streams the scaled lines. `false` if cancelled.
fn transmit(
    segments: &[TransferDescriptor],
    mut scaler: ScalerModel,
    sender: &Sender<Vec<u8>>,
    cancel: &AtomicBool,
) -> bool {
    for segment in segments {
        if cancel.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `start_async`'s contract keeps the segment readable until `stop`
        // has joined this thread.
        let bytes = unsafe {
            std::slice::from_raw_parts(segment.addr as usize as *const u8, segment.length as usize)
        };
        for line in scaler.push(bytes) {
            // The receiver only goes away when rx is stopped or restarted.
            let _ = sender.send(line);
        }
    }
    true
}

/// Fills every segment from the stream. `false` if cancelled.
///
/// A stream that ends early leaves the channel waiting for a stop, as the engine
/// would.
fn receive(segments: &[TransferDescriptor], stream: &Receiver<Vec<u8>>, cancel: &AtomicBool) -> bool {
    let mut pending: Vec<u8> = Vec::new();
    for segment in segments {
        let length = segment.length as usize;
        while pending.len() < length {
            if cancel.load(Ordering::Acquire) {
                return false;
            }
            match stream.recv_timeout(POLL_INTERVAL) {
                Ok(line) => pending.extend_from_slice(&line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("emulator: stream ended {} bytes short", length - pending.len());
                    wait_for_cancel(cancel);
                    return false;
                }
            }
        }
        // SAFETY: `start_async`'s contract keeps the segment writable and otherwise
        // unaliased until `stop` has joined this thread.
        unsafe {
            std::ptr::copy_nonoverlapping(pending.as_ptr(), segment.addr as usize as *mut u8, length);
        }
        pending.drain(..length);
    }
    true
}

/// Streaming nearest-neighbour scaler as configured by one CR/WH pair.
struct ScalerModel {
    x_scale: ScaleFactor,
    y_scale: ScaleFactor,
    width: usize,
    height: u32,
    row: u32,
    pending: Vec<u8>,
}

impl ScalerModel {
    fn latch(registers: ScalerRegisters) -> Self {
        let (x_scale, y_scale, width, height) = registers.decode();
        log::trace!(
            "emulator: latched x {} y {} {}x{}",
            x_scale,
            y_scale,
            width,
            height
        );
        Self {
            x_scale,
            y_scale,
            width: width as usize,
            height,
            row: 0,
            pending: Vec::new(),
        }
    }

    /// Consumes input samples and returns the output lines they complete.
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        if self.width == 0 {
            return lines;
        }
        self.pending.extend_from_slice(bytes);
        while self.pending.len() >= self.width && self.row < self.height {
            let input: Vec<u8> = self.pending.drain(..self.width).collect();
            let output = self.scale_horizontal(&input);
            let m = self.y_scale.magnitude();
            if self.y_scale.is_upscale() {
                for _ in 0..m {
                    lines.push(output.clone());
                }
            } else if self.row % m == 0 {
                lines.push(output);
            }
            self.row += 1;
        }
        lines
    }

    fn scale_horizontal(&self, input: &[u8]) -> Vec<u8> {
        let m = self.x_scale.magnitude() as usize;
        if self.x_scale.is_upscale() {
            input
                .iter()
                .flat_map(|&sample| std::iter::repeat(sample).take(m))
                .collect()
        } else {
            input.iter().step_by(m).copied().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::regs::encode_control;

    fn model(x: i32, y: i32, w: u32, h: u32) -> ScalerModel {
        ScalerModel::latch(ScalerRegisters::encode(
            ScaleFactor::new(x).unwrap(),
            ScaleFactor::new(y).unwrap(),
            w,
            h,
        ))
    }

    #[test]
    fn test_model_upscales_both_axes() {
        let mut scaler = model(2, 3, 2, 1);
        let lines = scaler.push(&[7, 9]);
        assert_eq!(lines, vec![vec![7, 7, 9, 9]; 3]);
    }

    #[test]
    fn test_model_downscale_keeps_anchored_rows() {
        let mut scaler = model(-2, -3, 5, 7);
        let input: Vec<u8> = (0..35).collect();
        let lines = scaler.push(&input);
        assert_eq!(lines, vec![vec![0, 2, 4], vec![15, 17, 19], vec![30, 32, 34]]);
    }

    #[test]
    fn test_model_reassembles_split_lines() {
        let mut scaler = model(1, 1, 4, 2);
        assert!(scaler.push(&[1, 2, 3]).is_empty());
        assert_eq!(scaler.push(&[4, 5]), vec![vec![1, 2, 3, 4]]);
        assert_eq!(scaler.push(&[6, 7, 8, 9, 10]), vec![vec![5, 6, 7, 8]]);
    }

    #[test]
    fn test_register_window() {
        let runtime = EmulatedRuntime::new();
        let probe = runtime.probe();
        let mut runtime = runtime;
        let mut regs = runtime.scaler_registers();
        let control = encode_control(ScaleFactor::new(-2).unwrap(), ScaleFactor::IDENTITY);
        regs.write32(CR_ADDR, control);
        regs.write32(WH_ADDR, 0x0010_0008);
        regs.write32(64, 1);
        assert_eq!(probe.register_writes(), 2);
        assert_eq!(regs.read32(CR_ADDR), control);
        assert_eq!(probe.registers().decode().2, 8);
    }

    #[test]
    fn test_rx_without_stream_is_refused() {
        let mut runtime = EmulatedRuntime::new();
        let mut rx = runtime.open_channel(SGDMA_S2M_NAME).unwrap();
        let pool = DescriptorPool::new(2).unwrap();
        let result = unsafe { rx.start_async(&pool, 0) };
        assert!(result.is_err());
        assert!(runtime.open_channel("sgdma_other").is_none());
    }
}

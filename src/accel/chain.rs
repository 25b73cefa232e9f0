//! Descriptor chain construction.
//!
//! Both chains of a request are written back to back into the pool starting at
//! slot 0: the transmit chain (one descriptor per source row sent, then a stop)
//! followed by the receive chain (one descriptor per destination row, then a stop).

use sg_scale::geometry::{ScaleFactor, ScaleRequest};

use crate::core::descriptor_pool::{DescriptorPool, TransferDescriptor};
use crate::error::HwError;

/// A chain written into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    /// Slot of the first descriptor
    pub head: usize,
    /// Data descriptors, excluding the stop marker
    pub lines: usize,
}

impl Chain {
    /// Slots occupied, stop marker included.
    pub fn slots(&self) -> usize {
        self.lines + 1
    }
}

/// Transmit and receive chains of one request, plus what the scaler must be told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLayout {
    pub tx: Chain,
    pub rx: Chain,
    /// Vertical factor the scaler applies to the rows actually sent
    pub y_scale: ScaleFactor,
    /// Rows actually sent to the scaler
    pub rows_sent: u32,
}

impl ChainLayout {
    pub fn descriptors_used(&self) -> usize {
        self.tx.slots() + self.rx.slots()
    }
}

/// Appends linked descriptors to the pool from a running slot cursor.
struct ChainWriter<'a> {
    pool: &'a mut DescriptorPool,
    next: usize,
}

impl<'a> ChainWriter<'a> {
    fn new(pool: &'a mut DescriptorPool) -> Self {
        Self { pool, next: 0 }
    }

    /// Writes the descriptors for `lines`, then a stop marker.
    fn append<I>(&mut self, lines: I) -> Result<Chain, HwError>
    where
        I: IntoIterator<Item = (u64, u32)>,
    {
        let head = self.next;
        let mut count = 0;
        for (addr, length) in lines {
            let slot = self.next;
            let successor = u32::try_from(slot + 1).map_err(|_| HwError::BufferTooSmall {
                buffer: "descriptor pool",
                needed: slot + 2,
                actual: self.pool.capacity(),
            })?;
            self.pool.set(slot, TransferDescriptor::line(addr, length, successor))?;
            self.next += 1;
            count += 1;
        }
        self.pool.set(self.next, TransferDescriptor::STOP)?;
        self.next += 1;
        Ok(Chain { head, lines: count })
    }
}

fn check_buffers(request: &ScaleRequest, source: &[u8], destination: &[u8]) -> Result<(), HwError> {
    let needed = request.required_source_len();
    if source.len() < needed {
        return Err(HwError::BufferTooSmall {
            buffer: "source",
            needed,
            actual: source.len(),
        });
    }
    let needed = request.destination().area();
    if destination.len() < needed {
        return Err(HwError::BufferTooSmall {
            buffer: "destination",
            needed,
            actual: destination.len(),
        });
    }
    Ok(())
}

fn build(
    pool: &mut DescriptorPool,
    request: &ScaleRequest,
    source: &[u8],
    destination: &mut [u8],
    source_rows: impl Iterator<Item = u32>,
) -> Result<(Chain, Chain), HwError> {
    check_buffers(request, source, destination)?;

    let out = request.destination();
    let source_base = source.as_ptr() as u64;
    let destination_base = destination.as_mut_ptr() as u64;
    let width = request.rect.w;
    let dwidth = out.w;

    let mut writer = ChainWriter::new(pool);
    let tx = writer.append(
        source_rows.map(|row| (source_base + request.source_offset(row) as u64, width)),
    )?;
    let rx = writer.append(
        (0..out.h).map(|row| (destination_base + row as u64 * dwidth as u64, dwidth)),
    )?;
    Ok((tx, rx))
}

/// Builds the chains for the pure accelerator path: every rectangle row is sent and
/// the scaler performs both axes.
pub fn build_scale_chains(
    pool: &mut DescriptorPool,
    request: &ScaleRequest,
    source: &[u8],
    destination: &mut [u8],
) -> Result<ChainLayout, HwError> {
    let (tx, rx) = build(pool, request, source, destination, 0..request.rect.h)?;
    log::debug!(
        "scale chains: tx {} lines of {}, rx {} lines of {}",
        tx.lines,
        request.rect.w,
        rx.lines,
        request.destination().w
    );
    Ok(ChainLayout {
        tx,
        rx,
        y_scale: request.y_scale,
        rows_sent: request.rect.h,
    })
}

/// Builds the chains for the hybrid path.
///
/// When the vertical factor downscales, only rows `0, |y|, 2|y|, …` of the rectangle
/// are sent (`ceil(h / |y|)` rows, the destination height) and the scaler is told to
/// pass rows through unchanged. Otherwise identical to [`build_scale_chains`].
pub fn build_hybrid_chains(
    pool: &mut DescriptorPool,
    request: &ScaleRequest,
    source: &[u8],
    destination: &mut [u8],
) -> Result<ChainLayout, HwError> {
    if request.y_scale.is_upscale() {
        return build_scale_chains(pool, request, source, destination);
    }

    let stride = request.y_scale.magnitude() as usize;
    let (tx, rx) = build(
        pool,
        request,
        source,
        destination,
        (0..request.rect.h).step_by(stride),
    )?;
    let rows_sent = tx.lines as u32;
    log::debug!(
        "hybrid chains: sent {} of {} rows (stride {}), rx {} lines",
        rows_sent,
        request.rect.h,
        stride,
        rx.lines
    );
    Ok(ChainLayout {
        tx,
        rx,
        y_scale: ScaleFactor::IDENTITY,
        rows_sent,
    })
}

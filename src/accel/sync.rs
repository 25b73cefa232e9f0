//! Transfer synchronization.
//!
//! Starts the transmit chain, then the receive chain, then blocks until both
//! completion counters have advanced. Both channels are stopped before returning,
//! on every path.

use std::time::{Duration, Instant};

use super::DmaChannel;
use super::chain::ChainLayout;
use crate::core::completion::CompletionTracker;
use crate::core::descriptor_pool::DescriptorPool;
use crate::error::HwError;

/// Runs one request's chains to completion.
///
/// With `timeout = None` the wait is unbounded; otherwise both channels are stopped
/// and [`HwError::Timeout`] is returned once the bound passes.
///
/// # Safety
///
/// Every address in the chains described by `layout` must stay valid for the
/// accesses of its channel until this function returns, and nothing else may
/// access the receive-side memory in that time.
pub unsafe fn run_transfers<C: DmaChannel>(
    tx: &mut C,
    rx: &mut C,
    pool: &DescriptorPool,
    layout: &ChainLayout,
    completion: &CompletionTracker,
    timeout: Option<Duration>,
) -> Result<(), HwError> {
    completion.reset();

    // SAFETY: the caller keeps the chain memory valid until we return, and the
    // channel is stopped on every path below.
    if let Err(reason) = unsafe { tx.start_async(pool, layout.tx.head) } {
        log::warn!("tx chain refused: {}", reason);
        return Err(HwError::TxStart { reason });
    }

    // SAFETY: as above.
    if let Err(reason) = unsafe { rx.start_async(pool, layout.rx.head) } {
        log::warn!("rx chain refused: {}, stopping tx", reason);
        tx.stop();
        return Err(HwError::RxStart { reason });
    }

    let started = Instant::now();
    let completed = completion.wait_both(timeout);
    tx.stop();
    rx.stop();

    if !completed {
        let waited_ms = started.elapsed().as_millis() as u64;
        log::warn!("transfer did not complete within {}ms", waited_ms);
        return Err(HwError::Timeout { waited_ms });
    }
    Ok(())
}

//! Failure handling of the accelerator context
//!
//! Every per-request failure must leave both channels stopped and the context
//! usable; initialization failures and cleanup must make every later request
//! fail with the not-initialized status.

mod common;

use std::time::{Duration, Instant};

use common::{context, context_with, factor, ramp};
use hybrid_scaler::accel::emulator::EmulatorConfig;
use hybrid_scaler::core::completion::Direction;
use hybrid_scaler::{HwError, ScaleRequest, Size, StatusCode};

fn request(w: u32, h: u32) -> ScaleRequest {
    ScaleRequest::full(Size { w, h }, factor(2), factor(-2)).unwrap()
}

/// A refused transmit chain never reaches the receive channel.
#[test]
fn test_transmit_start_failure() {
    let (mut ctx, probe) = context_with(
        EmulatorConfig {
            fail_start_tx: true,
            ..EmulatorConfig::default()
        },
        None,
    );
    assert!(ctx.is_ready());
    let request = request(8, 8);
    let source = ramp(request.source);
    let mut out = vec![0u8; request.destination().area()];

    let error = ctx.scale_hw(&source, &request, &mut out).unwrap_err();
    assert!(matches!(error, HwError::TxStart { .. }));
    assert_eq!(ctx.status(), StatusCode::TX_START_FAILED);
    assert_eq!(probe.starts(Direction::Transmit), 0);
    assert_eq!(probe.starts(Direction::Receive), 0);

    assert!(ctx.check_status());
    assert_eq!(ctx.status(), StatusCode::OK);
    assert!(ctx.pool().is_some());
}

/// A refused receive chain stops the transmit channel that was already running.
#[test]
fn test_receive_start_failure_stops_transmit() {
    let (mut ctx, probe) = context_with(
        EmulatorConfig {
            fail_start_rx: true,
            ..EmulatorConfig::default()
        },
        None,
    );
    let request = request(8, 8);
    let source = ramp(request.source);
    let mut out = vec![0u8; request.destination().area()];

    let error = ctx.scale_hybrid(&source, &request, &mut out).unwrap_err();
    assert!(matches!(error, HwError::RxStart { .. }));
    assert_eq!(ctx.status(), StatusCode::RX_START_FAILED);
    assert_eq!(probe.starts(Direction::Transmit), 1);
    assert_eq!(probe.starts(Direction::Receive), 0);
    assert!(!probe.is_running(Direction::Transmit));
    assert!(ctx.check_status());
    assert!(!ctx.check_status());
}

/// A stalled transfer is abandoned once the configured bound elapses.
#[test]
fn test_stalled_transfer_times_out() {
    let (mut ctx, probe) = context_with(
        EmulatorConfig {
            stall: true,
            ..EmulatorConfig::default()
        },
        Some(Duration::from_millis(50)),
    );
    let request = request(8, 8);
    let source = ramp(request.source);
    let mut out = vec![0u8; request.destination().area()];

    let started = Instant::now();
    let error = ctx.scale_hw(&source, &request, &mut out).unwrap_err();
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(matches!(error, HwError::Timeout { waited_ms } if waited_ms >= 50));
    assert_eq!(ctx.status(), StatusCode::TRANSFER_TIMEOUT);
    assert_eq!(probe.starts(Direction::Transmit), 1);
    assert_eq!(probe.starts(Direction::Receive), 1);
    assert!(!probe.is_running(Direction::Transmit));
    assert!(!probe.is_running(Direction::Receive));
    assert!(out.iter().all(|&sample| sample == 0));

    assert!(ctx.check_status());
    assert!(ctx.is_ready());
}

#[test]
fn test_oversized_rectangle_touches_nothing() {
    let (mut ctx, probe) = context();
    let wide = ScaleRequest::full(Size { w: 1025, h: 2 }, factor(1), factor(1)).unwrap();
    let source = ramp(wide.source);
    let mut out = vec![0u8; wide.destination().area()];

    let error = ctx.scale_hw(&source, &wide, &mut out).unwrap_err();
    assert_eq!(error.status(), StatusCode::WIDTH_TOO_LARGE);
    assert_eq!(ctx.status(), StatusCode::WIDTH_TOO_LARGE);
    assert_eq!(probe.register_writes(), 0);
    assert_eq!(probe.starts(Direction::Transmit), 0);
    assert!(ctx
        .pool()
        .unwrap()
        .descriptors()
        .iter()
        .all(|d| *d == Default::default()));
    assert!(ctx.check_status());

    let tall = ScaleRequest::full(Size { w: 2, h: 1025 }, factor(1), factor(-4)).unwrap();
    let source = ramp(tall.source);
    let mut out = vec![0u8; tall.destination().area()];
    let error = ctx.scale_hybrid(&source, &tall, &mut out).unwrap_err();
    assert_eq!(error.status(), StatusCode::HEIGHT_TOO_LARGE);
    assert_eq!(ctx.status(), StatusCode::HEIGHT_TOO_LARGE);
    assert_eq!(probe.register_writes(), 0);
}

#[test]
fn test_short_destination_keeps_context() {
    let (mut ctx, _probe) = context();
    let request = request(8, 8);
    let source = ramp(request.source);
    let mut short = vec![0u8; request.destination().area() - 1];

    let error = ctx.scale_hw(&source, &request, &mut short).unwrap_err();
    assert_eq!(error.status(), StatusCode::BUFFER_TOO_SMALL);
    assert!(ctx.check_status());
    assert!(ctx.pool().is_some());

    let mut out = vec![0u8; request.destination().area()];
    ctx.scale_hw(&source, &request, &mut out).unwrap();
    assert_eq!(&out[..4], &[0, 0, 1, 1]);
}

#[test]
fn test_requests_after_cleanup_fail() {
    let (mut ctx, probe) = context();
    let request = request(4, 4);
    let source = ramp(request.source);
    let mut out = vec![0u8; request.destination().area()];

    ctx.cleanup();
    ctx.cleanup();
    assert!(ctx.pool().is_none());
    assert_eq!(
        ctx.scale_hw(&source, &request, &mut out).unwrap_err(),
        HwError::NotInitialized
    );
    assert_eq!(ctx.status(), StatusCode::NOT_INITIALIZED);
    assert_eq!(
        ctx.scale_hybrid(&source, &request, &mut out).unwrap_err(),
        HwError::NotInitialized
    );
    assert_eq!(probe.register_writes(), 0);
    assert!(ctx.check_status());
}

#[test]
fn test_open_failure_is_sticky() {
    let (mut ctx, probe) = context_with(
        EmulatorConfig {
            fail_open_rx: true,
            ..EmulatorConfig::default()
        },
        None,
    );
    assert_eq!(ctx.status(), StatusCode::RX_OPEN_FAILED);
    assert!(!ctx.is_ready());

    let request = request(4, 4);
    let source = ramp(request.source);
    let mut out = vec![0u8; request.destination().area()];
    assert!(ctx.scale_hw(&source, &request, &mut out).is_err());
    assert_eq!(ctx.status(), StatusCode::RX_OPEN_FAILED);
    assert_eq!(probe.register_writes(), 0);

    assert!(ctx.check_status());
    assert!(ctx.pool().is_none());
}

//! End-to-end scaling through the emulated accelerator: software, hardware and
//! hybrid paths must agree byte for byte.

mod common;

use common::{context, factor, pattern, ramp};
use hybrid_scaler::accel::regs::ScalerRegisters;
use hybrid_scaler::benchmark::verify;
use hybrid_scaler::{Rect, ScaleFactor, ScaleRequest, Size, scale_nearest};
use proptest::prelude::*;

fn reference(source: &[u8], request: &ScaleRequest) -> Vec<u8> {
    let mut out = vec![0u8; request.destination().area()];
    scale_nearest(source, request, &mut out).unwrap();
    out
}

#[test]
fn test_full_upscale_produces_blocks() {
    let (mut ctx, _probe) = context();
    let size = Size { w: 16, h: 16 };
    let source = ramp(size);
    let request = ScaleRequest::full(size, factor(2), factor(2)).unwrap();
    assert_eq!(request.destination(), Size { w: 32, h: 32 });

    let expected = reference(&source, &request);
    for y in 0..32 {
        for x in 0..32 {
            assert_eq!(expected[y * 32 + x], source[(y / 2) * 16 + x / 2]);
        }
    }

    let mut hw = vec![0u8; 32 * 32];
    let stats = ctx.scale_hw(&source, &request, &mut hw).unwrap();
    assert_eq!(stats.descriptors(), 16 + 32 + 2);
    assert_eq!(verify(&expected, &hw), 0);

    let mut hybrid = vec![0u8; 32 * 32];
    ctx.scale_hybrid(&source, &request, &mut hybrid).unwrap();
    assert_eq!(verify(&expected, &hybrid), 0);
    assert!(!ctx.check_status());
}

#[test]
fn test_region_downscale_takes_every_other_sample() {
    let (mut ctx, _probe) = context();
    let size = Size { w: 16, h: 16 };
    let source = ramp(size);
    let request = ScaleRequest::new(
        size,
        Rect { x: 4, y: 4, w: 8, h: 8 },
        factor(-2),
        factor(-2),
    )
    .unwrap();
    assert_eq!(request.destination(), Size { w: 4, h: 4 });

    let expected: Vec<u8> = (0..4)
        .flat_map(|i| (0..4).map(move |j| ((4 + 2 * i) * 16 + 4 + 2 * j) as u8))
        .collect();
    assert_eq!(reference(&source, &request), expected);

    let mut hw = vec![0u8; 16];
    ctx.scale_hw(&source, &request, &mut hw).unwrap();
    assert_eq!(hw, expected);

    let mut hybrid = vec![0u8; 16];
    let stats = ctx.scale_hybrid(&source, &request, &mut hybrid).unwrap();
    assert_eq!(stats.descriptors(), 2 * 4 + 2);
    assert_eq!(hybrid, expected);
}

#[test]
fn test_every_factor_pair_agrees() {
    let (mut ctx, _probe) = context();
    let size = Size { w: 13, h: 11 };
    let source = pattern(size).data;
    let rect = Rect { x: 1, y: 2, w: 10, h: 7 };

    for x in ScaleFactor::ALL {
        for y in ScaleFactor::ALL {
            let request = ScaleRequest::new(size, rect, x, y).unwrap();
            let expected = reference(&source, &request);
            let mut hw = vec![0u8; expected.len()];
            let mut hybrid = vec![0u8; expected.len()];
            ctx.scale_hw(&source, &request, &mut hw).unwrap();
            ctx.scale_hybrid(&source, &request, &mut hybrid).unwrap();
            assert_eq!(hw, expected, "hardware x {} y {}", x, y);
            assert_eq!(hybrid, expected, "hybrid x {} y {}", x, y);
        }
    }
}

#[test]
fn test_hybrid_uneven_division_programs_corrected_registers() {
    let (mut ctx, probe) = context();
    let size = Size { w: 8, h: 12 };
    let source = ramp(size);
    let request = ScaleRequest::new(
        size,
        Rect { x: 0, y: 1, w: 8, h: 10 },
        factor(3),
        factor(-3),
    )
    .unwrap();
    assert_eq!(request.destination(), Size { w: 24, h: 4 });

    let mut out = vec![0u8; 24 * 4];
    let stats = ctx.scale_hybrid(&source, &request, &mut out).unwrap();
    assert_eq!(stats.rows_sent, 4);
    assert_eq!(stats.descriptors(), 2 * 4 + 2);

    let (x, y, w, h) = probe.registers().decode();
    assert_eq!((x.get(), y, w, h), (3, ScaleFactor::IDENTITY, 8, 4));
    assert_eq!(out, reference(&source, &request));
    // Rows 1, 4, 7 and 10 of the source.
    assert_eq!(out[3 * 24], source[10 * 8]);

    ctx.scale_hw(&source, &request, &mut out).unwrap();
    assert_eq!(
        probe.registers(),
        ScalerRegisters::encode(factor(3), factor(-3), 8, 10)
    );
}

#[test]
fn test_widest_accepted_rectangle() {
    let (mut ctx, _probe) = context();
    let size = Size { w: 1024, h: 3 };
    let source = pattern(size).data;
    let request = ScaleRequest::full(size, factor(4), factor(-2)).unwrap();
    let expected = reference(&source, &request);
    let mut out = vec![0u8; expected.len()];
    ctx.scale_hw(&source, &request, &mut out).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn test_context_is_reused_across_requests() {
    let (mut ctx, probe) = context();
    let size = Size { w: 20, h: 20 };
    let source = pattern(size).data;
    for (i, (xs, ys)) in [(2, -4), (-3, 1), (4, 4), (-1, -1)].into_iter().enumerate() {
        let request = ScaleRequest::full(size, factor(xs), factor(ys)).unwrap();
        let mut out = vec![0u8; request.destination().area()];
        ctx.scale_hw(&source, &request, &mut out).unwrap();
        assert_eq!(out, reference(&source, &request));
        assert_eq!(probe.register_writes(), 2 * (i + 1));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn accelerator_paths_match_reference(
        (w, h, x, y, rw, rh) in (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
            (Just(w), Just(h), 0..w, 0..h).prop_flat_map(|(w, h, x, y)| {
                (Just(w), Just(h), Just(x), Just(y), 1..=w - x, 1..=h - y)
            })
        }),
        xi in 0usize..8,
        yi in 0usize..8,
    ) {
        let (mut ctx, _probe) = context();
        let size = Size { w, h };
        let source = pattern(size).data;
        let request = ScaleRequest::new(
            size,
            Rect { x, y, w: rw, h: rh },
            ScaleFactor::ALL[xi],
            ScaleFactor::ALL[yi],
        )
        .unwrap();
        let expected = reference(&source, &request);

        let mut hw = vec![0u8; expected.len()];
        ctx.scale_hw(&source, &request, &mut hw).unwrap();
        prop_assert_eq!(&hw, &expected);

        let mut hybrid = vec![0u8; expected.len()];
        ctx.scale_hybrid(&source, &request, &mut hybrid).unwrap();
        prop_assert_eq!(&hybrid, &expected);
    }
}

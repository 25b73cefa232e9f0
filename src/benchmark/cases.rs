//! Benchmark case generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sg_scale::geometry::{GeometryError, Rect, ScaleFactor, ScaleRequest, Size};

/// Full-image cases at the start of every benchmark, one per factor.
pub const BENCH_CASES: usize = 8;

/// Seed derived from the system clock.
pub fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

/// Builds the case list: the fixed sweep, then `random_cases` random rectangles.
///
/// The fixed sweep scales the whole image with symmetric factors `-4..=4`
/// (without 0). Random cases draw `x` in `[0, W)`, `y` in `[0, H)`, `w` in
/// `[1, W - x]`, `h` in `[1, H - y]` and each factor independently. The same seed
/// always yields the same list.
pub fn generate_cases(
    source: Size,
    random_cases: usize,
    seed: u64,
) -> Result<Vec<ScaleRequest>, GeometryError> {
    let mut cases = Vec::with_capacity(BENCH_CASES + random_cases);
    for factor in ScaleFactor::ALL {
        cases.push(ScaleRequest::full(source, factor, factor)?);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..random_cases {
        let x = rng.gen_range(0..source.w);
        let y = rng.gen_range(0..source.h);
        let w = rng.gen_range(1..=source.w - x);
        let h = rng.gen_range(1..=source.h - y);
        let x_scale = ScaleFactor::ALL[rng.gen_range(0..ScaleFactor::ALL.len())];
        let y_scale = ScaleFactor::ALL[rng.gen_range(0..ScaleFactor::ALL.len())];
        cases.push(ScaleRequest::new(source, Rect { x, y, w, h }, x_scale, y_scale)?);
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_sweep_comes_first() {
        let source = Size { w: 32, h: 24 };
        let cases = generate_cases(source, 5, 7).unwrap();
        assert_eq!(cases.len(), BENCH_CASES + 5);
        let factors: Vec<i32> = cases[..BENCH_CASES].iter().map(|c| c.x_scale.get()).collect();
        assert_eq!(factors, vec![-4, -3, -2, -1, 1, 2, 3, 4]);
        assert!(cases[..BENCH_CASES]
            .iter()
            .all(|c| c.rect == Rect { x: 0, y: 0, w: 32, h: 24 } && c.x_scale == c.y_scale));
    }

    #[test]
    fn test_same_seed_same_cases() {
        let source = Size { w: 100, h: 80 };
        assert_eq!(
            generate_cases(source, 50, 1234).unwrap(),
            generate_cases(source, 50, 1234).unwrap()
        );
        assert_ne!(
            generate_cases(source, 50, 1234).unwrap(),
            generate_cases(source, 50, 4321).unwrap()
        );
    }

    #[test]
    fn test_empty_source_is_rejected() {
        assert_eq!(
            generate_cases(Size { w: 0, h: 4 }, 1, 0),
            Err(GeometryError::EmptyRect)
        );
    }

    proptest! {
        #[test]
        fn random_cases_stay_inside_source(w in 1u32..64, h in 1u32..64, seed in any::<u64>()) {
            let cases = generate_cases(Size { w, h }, 20, seed).unwrap();
            for case in &cases[BENCH_CASES..] {
                prop_assert!(case.rect.w >= 1 && case.rect.h >= 1);
                prop_assert!(case.rect.x + case.rect.w <= w);
                prop_assert!(case.rect.y + case.rect.h <= h);
            }
        }
    }
}

//! Jittered sleep used after a failed cycle.
//!
//! The delay is stretched by a uniform factor in `[0, ratio]`, so many
//! watchers that failed on the same outage do not retry in lockstep.

use rand::Rng;
use std::time::Duration;

/// Upper bound for the jitter ratio; larger values are clamped.
pub const MAX_JITTER_RATIO: f64 = 1.0;

/// `base` stretched by a random fraction in `[0, ratio]`. `ratio <= 0` disables jitter.
/// Saturates at `Duration::MAX` instead of overflowing.
pub fn jittered(base: Duration, ratio: f64, rng: &mut impl Rng) -> Duration {
    if ratio <= 0.0 || !ratio.is_finite() || base.is_zero() {
        return base;
    }
    let extra = rng.gen_range(0.0..=ratio.min(MAX_JITTER_RATIO));
    Duration::try_from_secs_f64(base.as_secs_f64() * extra)
        .ok()
        .and_then(|stretch| base.checked_add(stretch))
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_zero_ratio_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Duration::from_secs(60);
        assert_eq!(jittered(base, 0.0, &mut rng), base);
    }

    #[test]
    fn test_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let base = Duration::from_secs(60);
        for _ in 0..1_000 {
            let d = jittered(base, 0.2, &mut rng);
            assert!(d >= base);
            assert!(d <= Duration::from_secs(72));
        }
    }

    #[test]
    fn test_huge_values_saturate() {
        let mut rng = StdRng::seed_from_u64(3);
        let base = Duration::from_secs(u64::MAX - 1);
        for _ in 0..100 {
            assert!(jittered(base, 0.2, &mut rng) >= base);
        }

        let base = Duration::from_secs(60);
        for _ in 0..100 {
            let d = jittered(base, f64::MAX, &mut rng);
            assert!(d >= base);
            assert!(d <= Duration::from_secs(120));
        }
    }

    #[test]
    fn test_actually_varies() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = Duration::from_secs(60);
        let first = jittered(base, 0.5, &mut rng);
        let spread = (0..50).any(|_| jittered(base, 0.5, &mut rng) != first);
        assert!(spread);
    }
}

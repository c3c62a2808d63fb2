//! Critical damping and scalar remapping helpers.

/// Fraction of the remaining distance to cover this frame so that a value
/// halves its error every `half_life` seconds.
///
/// A non-positive half-life snaps (returns 1). The result is always in `[0, 1]`.
pub fn interpolant(half_life: f32, dt: f32) -> f32 {
    if half_life <= 0.0 || !half_life.is_finite() {
        return 1.0;
    }
    if dt <= 0.0 {
        return 0.0;
    }
    (1.0 - 2.0_f32.powf(-dt / half_life)).clamp(0.0, 1.0)
}

/// Hermite smoothstep of `t` clamped to `[0, 1]`.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linearly remap `value` from `[in_min, in_max]` to `[out_min, out_max]`
/// without clamping.
pub fn rescale(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let span = in_max - in_min;
    if span.abs() < f32::EPSILON {
        return out_min;
    }
    out_min + (value - in_min) / span * (out_max - out_min)
}

/// Like [`rescale`], but the input is clamped to `[in_min, in_max]` first.
pub fn clamp_rescale(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let (lo, hi) = if in_min <= in_max {
        (in_min, in_max)
    } else {
        (in_max, in_min)
    };
    rescale(value.clamp(lo, hi), in_min, in_max, out_min, out_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_interpolant_half_life() {
        // After exactly one half-life, half the error is gone.
        assert!((interpolant(0.25, 0.25) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_interpolant_zero_half_life_snaps() {
        assert_eq!(interpolant(0.0, 0.016), 1.0);
        assert_eq!(interpolant(-1.0, 0.016), 1.0);
    }

    #[test]
    fn test_interpolant_zero_dt_holds() {
        assert_eq!(interpolant(0.07, 0.0), 0.0);
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(2.0), 1.0);
    }

    #[test]
    fn test_rescale_reversed_range() {
        // Zoom fraction 0.25 maps to "fully zoomed in" (1.0).
        let v = clamp_rescale(0.25, 0.25, 8.0, 1.0, 0.0);
        assert!((v - 1.0).abs() < 1e-6);
        let v = clamp_rescale(100.0, 0.25, 8.0, 1.0, 0.0);
        assert!(v.abs() < 1e-6);
    }

    #[test]
    fn test_rescale_degenerate_span() {
        assert_eq!(rescale(3.0, 1.0, 1.0, 5.0, 9.0), 5.0);
    }

    proptest! {
        #[test]
        fn interpolant_stays_in_unit_range(h in -1.0f32..10.0, dt in 0.0f32..5.0) {
            let a = interpolant(h, dt);
            prop_assert!((0.0..=1.0).contains(&a));
        }
    }
}

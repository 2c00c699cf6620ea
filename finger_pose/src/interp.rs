//! Clamped linear interpolation.

use num_traits::Float;

/// Map `x` linearly from `domain` onto `range`, clamping outside the domain.
///
/// `domain.0` maps to `range.0` and `domain.1` to `range.1`, whichever way
/// round either pair is ordered.  A zero-width domain has no slope; the
/// midpoint of `range` is returned instead of dividing by zero.
pub fn interp_clamped<T: Float>(x: T, domain: (T, T), range: (T, T)) -> T {
    let (d0, d1) = domain;
    let (r0, r1) = range;

    if d0 == d1 {
        return midpoint(r0, r1);
    }

    let t = (x - d0) / (d1 - d0);
    if t <= T::zero() {
        r0
    } else if t >= T::one() {
        r1
    } else {
        r0 + (r1 - r0) * t
    }
}

/// Arithmetic mean of two values.
pub fn midpoint<T: Float>(a: T, b: T) -> T {
    (a + b) / (T::one() + T::one())
}

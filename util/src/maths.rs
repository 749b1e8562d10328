//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Limit the magnitude of a value to `limit`, keeping its sign.
///
/// A NaN value is mapped to zero so that the result is always inside
/// `[-limit, limit]`.
pub fn abs_cap<T>(value: T, limit: T) -> T
where
    T: Float
{
    let limit = limit.abs();

    if value.is_nan() {
        T::zero()
    }
    else if value > limit {
        limit
    }
    else if value < -limit {
        -limit
    }
    else {
        value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 10f64), 0f64), 5f64);
        assert_eq!(lin_map((0f64, 2f64), (0f64, 1f64), 1f64), 0.5f64);
    }

    #[test]
    fn test_abs_cap() {
        assert_eq!(abs_cap(2f64, 1f64), 1f64);
        assert_eq!(abs_cap(-2f64, 1f64), -1f64);
        assert_eq!(abs_cap(0.5f64, -1f64), 0.5f64);
        assert_eq!(abs_cap(f64::NAN, 1f64), 0f64);
        assert_eq!(abs_cap(f64::NEG_INFINITY, 0.25f64), -0.25f64);
    }
}

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

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    // Sum all elements of the points
    let mut sum = T::from(0).unwrap();

    for i in 0..point_0.len() {
        sum += (point_0[i] - point_1[i]).powi(2);
    }

    // Return the squareroot of the sum
    Some(sum.sqrt())
}

pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::AddAssign
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle into the range (-pi, pi].
///
/// Angles such as heading errors must be wrapped before use so that the
/// shortest rotation between two headings is always chosen.
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float + std::ops::Rem
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid maps an exact odd multiple of pi onto -pi, which is outside
    // the (-pi, pi] range
    if wrapped == -pi_t {
        pi_t
    }
    else {
        wrapped
    }
}

/// Get the shortest signed angular distance from `a` to `b`.
///
/// The result is in the range (-pi, pi], positive when the shortest rotation
/// from `a` to `b` is anticlockwise.
pub fn ang_dist<T>(a: T, b: T) -> T
where
    T: Float + std::ops::Rem
{
    wrap_to_pi(b - a)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
/// This result is not an element of the function's codomain, but it is the
/// closest floating point number in the real numbers and thus fulfills the
/// property `self == self.div_euclid(rhs) * rhs + self.rem_euclid(rhs)`
/// approximatively.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::Sub + std::ops::Rem
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_wrap_to_pi() {
        assert_eq!(wrap_to_pi(0f64), 0f64);
        assert_eq!(wrap_to_pi(PI), PI);
        assert_eq!(wrap_to_pi(-PI), PI);
        assert!((wrap_to_pi(3.0 * PI) - PI).abs() < 1e-9);
        assert!((wrap_to_pi(PI + 0.1) - (-PI + 0.1)).abs() < 1e-9);
        assert!((wrap_to_pi(-PI - 0.1) - (PI - 0.1)).abs() < 1e-9);
        assert!((wrap_to_pi(2.0 * PI)).abs() < 1e-9);
    }

    #[test]
    fn test_ang_dist() {
        assert_eq!(ang_dist(1f64, 2f64), 1f64);
        assert_eq!(ang_dist(2f64, 1f64), -1f64);
        assert!((ang_dist(-3.0, 3.0) - (6.0 - 2.0 * PI)).abs() < 1e-9);
        assert!((ang_dist(3.0, -3.0) - (2.0 * PI - 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5), 5.0);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 1f64), 0.0), 0.5);
    }
}

//! Rational approximation of `f32` values for 16-bit hosts.
//!
//! The host VM only has `i16` arithmetic, so parameters cross the boundary
//! as `num / den` pairs. [`fraction_approx`] walks the Stern–Brocot tree
//! between `floor(x)` and `floor(x) + 1`, comparing each mediant against
//! `x` in `f32`, until either the mediant equals `x` or a denominator
//! would exceed [`MAX_TERM`].

/// Largest numerator or denominator magnitude the search produces.
pub const MAX_TERM: i32 = 0x7fff;

/// Approximate `x` by `num / den` with `1 <= den <= 0x7fff`.
///
/// Integers (and any value equal in `f32` to a fraction whose denominator
/// fits) come back exactly. Otherwise the search returns the closest
/// bound it reached before the denominators overflowed: the lower bound
/// `a/b` if its denominator still fits, the upper bound `c/d` otherwise.
///
/// Values beyond the `i16` range (infinities included) saturate to
/// `(±0x7fff, 1)` and NaN maps to `(0, 1)`. Within range, a numerator too
/// wide for `i16` wraps as it would on the host.
///
/// # Examples
///
/// ```
/// use axon_host::fraction_approx;
///
/// assert_eq!(fraction_approx(0.5), (1, 2));
/// assert_eq!(fraction_approx(-0.125), (-1, 8));
/// assert_eq!(fraction_approx(100.0), (100, 1));
/// ```
pub fn fraction_approx(x: f32) -> (i16, i16) {
    if x.is_nan() {
        return (0, 1);
    }
    if x > i16::MAX as f32 {
        return (MAX_TERM as i16, 1);
    }
    if x < i16::MIN as f32 {
        return (-MAX_TERM as i16, 1);
    }

    let mut a = x.floor() as i32;
    let mut b = 1i32;
    let mut c = a + 1;
    let mut d = 1i32;

    if x == a as f32 {
        return (a as i16, 1);
    }

    while b <= MAX_TERM && d <= MAX_TERM {
        let m = (a + c) as f32 / (b + d) as f32;
        if x == m {
            if b + d <= MAX_TERM {
                return ((a + c) as i16, (b + d) as i16);
            }
            break;
        } else if x > m {
            a += c;
            b += d;
        } else {
            c += a;
            d += b;
        }
    }

    if b > MAX_TERM {
        (c as i16, d as i16)
    } else {
        (a as i16, b as i16)
    }
}

/// Convert a host fraction back to `f32`; `None` for a zero denominator.
pub fn fraction_value(num: i16, den: i16) -> Option<f32> {
    (den != 0).then(|| num as f32 / den as f32)
}

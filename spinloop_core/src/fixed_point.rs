//! Q15/Q30 fixed-point primitives.
//!
//! Two scales are in use:
//! - **unit** (Q15, `i32` holding `[-32768, 32767]`): gains and normalized error, ±1.0.
//! - **control** (Q30, `i32` holding `[CTRL_MIN, CTRL_MAX]`): controller output and
//!   intermediate terms, ±1.0 meaning ±100% duty.
//!
//! Every primitive here is total. Overflow saturates; nothing wraps except where a
//! wrapping counter or tick is the point.

/// Fractional bits of the unit scale.
pub const UNIT_FRAC_BITS: u32 = 15;
/// Fractional bits of the control scale.
pub const CTRL_FRAC_BITS: u32 = 30;

/// 1.0 in unit scale (not itself representable; the range is half-open).
pub const UNIT_ONE: i64 = 1 << UNIT_FRAC_BITS;
pub const UNIT_MAX: i32 = 32_767;
pub const UNIT_MIN: i32 = -32_768;

/// +100% duty, 2^30 - 1.
pub const CTRL_MAX: i32 = 0x3FFF_FFFF;
/// -100% duty, -2^30.
pub const CTRL_MIN: i32 = -0x4000_0000;

/// Clamp a widened value into the control range.
#[inline]
pub fn saturate_control(x: i64) -> i32 {
    if x > i64::from(CTRL_MAX) {
        CTRL_MAX
    } else if x < i64::from(CTRL_MIN) {
        CTRL_MIN
    } else {
        x as i32
    }
}

/// Clamp a widened value into the unit range.
#[inline]
pub fn saturate_unit(x: i64) -> i32 {
    x.clamp(i64::from(UNIT_MIN), i64::from(UNIT_MAX)) as i32
}

/// Clamp a widened value into the `i32` range.
#[inline]
pub fn saturate_i32(x: i64) -> i32 {
    x.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Express `error` as a Q15 fraction of `full_scale`: `error * 32768 / full_scale`.
///
/// Division truncates toward zero; results beyond ±1.0 saturate to the unit bounds.
/// `full_scale` must be nonzero (enforced when the controller config is validated);
/// a zero divisor yields the saturation bound matching the sign of `error`.
#[inline]
pub fn normalize_error(error: i64, full_scale: i32) -> i32 {
    if full_scale == 0 {
        debug_assert!(false, "normalize_error: full_scale must be nonzero");
        return match error.signum() {
            1 => UNIT_MAX,
            -1 => UNIT_MIN,
            _ => 0,
        };
    }
    saturate_unit(error.saturating_mul(UNIT_ONE) / i64::from(full_scale))
}

/// Multiply two fixed-point values and rescale the product to `target_frac` bits.
///
/// The raw integers are multiplied in 128-bit, then arithmetically shifted right by
/// `a_frac + b_frac - target_frac` (rounding toward negative infinity). When the
/// target has more fractional bits than the product the result is shifted left.
/// The result saturates to the `i64` range; narrow it with `saturate_control` or
/// `saturate_unit`.
#[inline]
pub fn mul_fixed(a: i64, a_frac: u32, b: i64, b_frac: u32, target_frac: u32) -> i64 {
    let product = i128::from(a) * i128::from(b);
    let src_frac = a_frac + b_frac;
    let scaled = if src_frac >= target_frac {
        product >> (src_frac - target_frac).min(127)
    } else {
        product.saturating_mul(1_i128 << (target_frac - src_frac).min(126))
    };
    scaled.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Elapsed ticks between two readings of a wrapping 32-bit tick counter.
#[inline]
pub fn wrapping_dt(now: u32, last: u32) -> u32 {
    now.wrapping_sub(last)
}

/// Signed distance travelled by a wrapping 16-bit counter.
///
/// The subtraction happens in the counter's native width, so an overflow from
/// `i16::MAX` to `i16::MIN` reads as a small forward step.
#[inline]
pub fn wrapping_count_delta(now: i16, last: i16) -> i16 {
    now.wrapping_sub(last)
}

/// Absolute value of an `i64` that cannot overflow for the ranges used here.
#[inline]
pub fn abs_i64(x: i64) -> i64 {
    x.saturating_abs()
}

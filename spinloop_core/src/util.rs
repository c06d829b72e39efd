//! Time and period helpers shared by the loop plumbing.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Next tick at or after `now_ms` that lands on a multiple of `period_ms` and differs
/// from `last_ms`, in wrapping millisecond ticks.
///
/// This is the pacing rule of the control loop: run on period boundaries and never
/// twice on the same millisecond.
#[inline]
pub fn next_deadline_ms(now_ms: u32, last_ms: Option<u32>, period_ms: u32) -> u32 {
    let period = period_ms.max(1);
    let rem = now_ms % period;
    let mut deadline = if rem == 0 {
        now_ms
    } else {
        now_ms.wrapping_add(period - rem)
    };
    if last_ms == Some(deadline) {
        deadline = deadline.wrapping_add(period);
    }
    deadline
}

/// Control frequency for a period in milliseconds, floored, at least 1 Hz.
#[inline]
pub fn rate_hz(period_ms: u32) -> u32 {
    (MILLIS_PER_SEC / u64::from(period_ms.max(1))).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_rounds_up_to_period() {
        assert_eq!(next_deadline_ms(0, None, 10), 0);
        assert_eq!(next_deadline_ms(3, None, 10), 10);
        assert_eq!(next_deadline_ms(10, Some(10), 10), 20);
        assert_eq!(next_deadline_ms(11, Some(10), 10), 20);
    }

    #[test]
    fn deadline_zero_period_is_every_ms() {
        assert_eq!(next_deadline_ms(7, Some(6), 0), 7);
        assert_eq!(next_deadline_ms(7, Some(7), 0), 8);
    }

    #[test]
    fn rate_hz_floors() {
        assert_eq!(rate_hz(10), 100);
        assert_eq!(rate_hz(3), 333);
        assert_eq!(rate_hz(5000), 1);
    }
}

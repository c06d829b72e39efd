//! Signed Q30 command to two-channel PWM compare values.

/// Fractional bits of the command scale.
pub const CTRL_FRAC_BITS: u32 = 30;

/// Compare values for the two bridge channels.
///
/// At most one channel is nonzero. Channel 2 carries positive commands and
/// channel 1 negative ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PwmOutput {
    pub ch1: u32,
    pub ch2: u32,
}

impl PwmOutput {
    pub const OFF: PwmOutput = PwmOutput { ch1: 0, ch2: 0 };

    /// Signed compare value: positive when channel 2 drives.
    pub fn signed_duty(&self) -> i64 {
        i64::from(self.ch2) - i64::from(self.ch1)
    }
}

/// Map a command to compare values for a timer counting `0..=timer_arr`.
///
/// `duty = |command| * (timer_arr + 1) >> 30`, clamped to `timer_arr`. The most
/// negative command has magnitude `2^30`, i.e. full duty.
pub fn duty_from_command(command: i32, timer_arr: u32) -> PwmOutput {
    if command == 0 {
        return PwmOutput::OFF;
    }
    let top = u64::from(timer_arr) + 1;
    let mag = u64::from(command.unsigned_abs());
    let duty = ((mag * top) >> CTRL_FRAC_BITS).min(u64::from(timer_arr)) as u32;
    if command > 0 {
        PwmOutput { ch1: 0, ch2: duty }
    } else {
        PwmOutput { ch1: duty, ch2: 0 }
    }
}

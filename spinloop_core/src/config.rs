//! Runtime configuration for the controller and the velocity estimator.
//!
//! These are the structs the core validates and runs with. They are separate from the
//! TOML-deserialized schema in `spinloop_config`; see `conversions` for the mapping.

use crate::error::{BuildError, Result};
use crate::fixed_point::{CTRL_MAX, UNIT_MAX};

/// When the integrator is allowed to accumulate, judged on `|error|` in rpm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationWindow {
    /// Integrate on every tick.
    #[default]
    Always,
    /// Integrate only while `|error| <= rpm`.
    Fixed { rpm: u32 },
    /// Integrate while `|error| <= max(min_rpm, |reference| * percent / 100)`.
    Proportional { min_rpm: u32, percent: u32 },
}

impl IntegrationWindow {
    /// Window half-width in rpm for the given reference, or `None` when unbounded.
    #[inline]
    pub fn width_rpm(&self, reference: i32) -> Option<i64> {
        match *self {
            IntegrationWindow::Always => None,
            IntegrationWindow::Fixed { rpm } => Some(i64::from(rpm)),
            IntegrationWindow::Proportional { min_rpm, percent } => {
                let scaled = i64::from(reference).abs() * i64::from(percent) / 100;
                Some(scaled.max(i64::from(min_rpm)))
            }
        }
    }
}

/// PI controller tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerCfg {
    /// Proportional gain, Q15 (0..=32767 ~ 0..1.0).
    pub kp_q15: i32,
    /// Integral gain, Q15 per second.
    pub ki_q15: i32,
    /// Feedforward, control units (Q30) per rpm of reference. 0 disables.
    pub feedforward_per_rpm: i32,
    /// Errors with `|error| <= deadband_rpm` are treated as zero.
    pub deadband_rpm: u32,
    /// Error magnitude that normalizes to 1.0 in Q15.
    pub full_scale_rpm: i32,
    /// Integration-enable window.
    pub integration_window: IntegrationWindow,
    /// Integrator magnitude bound, Q30.
    pub integrator_clamp: i32,
    /// Maximum change of the output per accepted update, Q30. `None` disables.
    pub slew_max_step: Option<u32>,
    /// Timestamp ticks per second (1000 for millisecond ticks).
    pub time_units_per_second: u32,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            kp_q15: 4000,
            ki_q15: 300,
            feedforward_per_rpm: 100_000,
            deadband_rpm: 30,
            full_scale_rpm: 4000,
            integration_window: IntegrationWindow::Always,
            integrator_clamp: CTRL_MAX,
            slew_max_step: None,
            time_units_per_second: 1000,
        }
    }
}

impl ControllerCfg {
    /// Reject configurations the update path cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(0..=UNIT_MAX).contains(&self.kp_q15) {
            return Err(invalid("kp_q15 must be in 0..=32767"));
        }
        if !(0..=UNIT_MAX).contains(&self.ki_q15) {
            return Err(invalid("ki_q15 must be in 0..=32767"));
        }
        if self.full_scale_rpm <= 0 {
            return Err(invalid("full_scale_rpm must be > 0"));
        }
        if self.integrator_clamp < 0 {
            return Err(invalid("integrator_clamp must be >= 0"));
        }
        if self.time_units_per_second == 0 {
            return Err(invalid("time_units_per_second must be > 0"));
        }
        if self.slew_max_step == Some(0) {
            return Err(invalid("slew_max_step must be > 0 when set"));
        }
        if let IntegrationWindow::Proportional { percent, .. } = self.integration_window
            && percent == 0
        {
            return Err(invalid("integration window percent must be > 0"));
        }
        Ok(())
    }
}

/// Rolling-window velocity estimator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorCfg {
    /// Ring buffer slots.
    pub capacity: usize,
    /// Target averaging window, in timestamp ticks.
    pub window_ms: u32,
    /// IIR smoothing shift (0 disables smoothing).
    pub smoothing_shift: u32,
    /// Encoder counts per mechanical revolution (PPR x quadrature factor).
    pub counts_per_rev: u32,
    /// Timestamp ticks per second (1000 for millisecond ticks).
    pub time_units_per_second: u32,
    /// Shortest expected spacing between updates; sizes the buffer check.
    pub expected_min_dt_ms: u32,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            capacity: 32,
            window_ms: 90,
            smoothing_shift: 3,
            counts_per_rev: 512 * 4,
            time_units_per_second: 1000,
            expected_min_dt_ms: 10,
        }
    }
}

/// Largest shift accepted for the IIR smoothing stage.
pub const MAX_SMOOTHING_SHIFT: u32 = 15;
/// Upper bound on ring buffer slots.
pub const MAX_ESTIMATOR_CAPACITY: usize = 4096;

impl EstimatorCfg {
    /// Reject configurations the update path cannot run with.
    ///
    /// The buffer must be able to span the target window at the expected call rate:
    /// `capacity * expected_min_dt_ms >= window_ms`.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity > MAX_ESTIMATOR_CAPACITY {
            return Err(invalid("estimator capacity must be in 1..=4096"));
        }
        if self.window_ms == 0 {
            return Err(invalid("estimator window_ms must be > 0"));
        }
        if self.smoothing_shift > MAX_SMOOTHING_SHIFT {
            return Err(invalid("estimator smoothing_shift must be <= 15"));
        }
        if self.counts_per_rev == 0 {
            return Err(invalid("counts_per_rev must be > 0"));
        }
        if self.time_units_per_second == 0 {
            return Err(invalid("time_units_per_second must be > 0"));
        }
        if self.expected_min_dt_ms == 0 {
            return Err(invalid("expected_min_dt_ms must be > 0"));
        }
        let span = (self.capacity as u64).saturating_mul(u64::from(self.expected_min_dt_ms));
        if span < u64::from(self.window_ms) {
            return Err(invalid(
                "estimator capacity * expected_min_dt_ms must cover window_ms",
            ));
        }
        Ok(())
    }

    /// Numerator scale converting counts per tick into revolutions per minute.
    #[inline]
    pub fn time_units_per_minute(&self) -> i64 {
        i64::from(self.time_units_per_second) * 60
    }
}

/// Scheduling of the outer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCfg {
    /// Control period in milliseconds.
    pub period_ms: u32,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self { period_ms: 10 }
    }
}

#[inline]
fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

//! `From` implementations bridging `spinloop_config` types to `spinloop_core` types.
//!
//! The core structs are validated again when a controller or estimator is built.

use crate::config::{ControllerCfg, EstimatorCfg, IntegrationWindow, ScheduleCfg};
use crate::fixed_point::CTRL_MAX;

// ── IntegrationWindow ────────────────────────────────────────────────────────

impl From<&spinloop_config::IntegrationWindowCfg> for IntegrationWindow {
    fn from(c: &spinloop_config::IntegrationWindowCfg) -> Self {
        match *c {
            spinloop_config::IntegrationWindowCfg::Always => IntegrationWindow::Always,
            spinloop_config::IntegrationWindowCfg::Fixed { rpm } => IntegrationWindow::Fixed { rpm },
            spinloop_config::IntegrationWindowCfg::Proportional { min_rpm, percent } => {
                IntegrationWindow::Proportional { min_rpm, percent }
            }
        }
    }
}

// ── ControllerCfg ────────────────────────────────────────────────────────────

impl From<&spinloop_config::ControllerCfg> for ControllerCfg {
    fn from(c: &spinloop_config::ControllerCfg) -> Self {
        let clamp = c
            .integrator_clamp
            .map_or(CTRL_MAX, |v| v.clamp(0, i64::from(CTRL_MAX)) as i32);
        Self {
            kp_q15: c.kp_q15,
            ki_q15: c.ki_q15,
            feedforward_per_rpm: c.feedforward_per_rpm,
            deadband_rpm: c.deadband_rpm,
            full_scale_rpm: c.full_scale_rpm,
            integration_window: IntegrationWindow::from(&c.integration_window),
            integrator_clamp: clamp,
            slew_max_step: c.slew_max_step,
            time_units_per_second: 1000,
        }
    }
}

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

/// Needs the whole config: the expected call spacing is the control period.
impl From<&spinloop_config::Config> for EstimatorCfg {
    fn from(c: &spinloop_config::Config) -> Self {
        Self {
            capacity: c.estimator.capacity,
            window_ms: c.estimator.window_ms,
            smoothing_shift: c.estimator.smoothing_shift,
            counts_per_rev: c.estimator.counts_per_rev(),
            time_units_per_second: 1000,
            expected_min_dt_ms: c.schedule.period_ms,
        }
    }
}

// ── ScheduleCfg ──────────────────────────────────────────────────────────────

impl From<&spinloop_config::ScheduleCfg> for ScheduleCfg {
    fn from(c: &spinloop_config::ScheduleCfg) -> Self {
        Self {
            period_ms: c.period_ms,
        }
    }
}

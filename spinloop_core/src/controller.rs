//! Discrete-time PI velocity controller in Q30 fixed point.
//!
//! One call to [`PiController::update`] per control tick turns a reference velocity,
//! the estimated velocity and a wrapping millisecond timestamp into a saturated
//! actuation command. The integrator is bounded by `integrator_clamp` and frozen
//! whenever further integration would push the output deeper into saturation.

use crate::config::ControllerCfg;
use crate::error::Result;
use crate::fixed_point::{
    CTRL_FRAC_BITS, CTRL_MAX, CTRL_MIN, UNIT_FRAC_BITS, abs_i64, mul_fixed, normalize_error,
    saturate_control, wrapping_dt,
};

/// Split of the last emitted command into its contributions, all Q30.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Terms {
    pub feedforward: i32,
    pub proportional: i32,
    pub integrator: i32,
}

pub struct PiController {
    cfg: ControllerCfg,
    integrator: i32,
    last_tick: u32,
    previous_output: i32,
    initialized: bool,
    last_terms: Terms,
}

impl core::fmt::Debug for PiController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PiController")
            .field("integrator", &self.integrator)
            .field("previous_output", &self.previous_output)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl PiController {
    /// Validate `cfg` and build a controller in its reset state.
    pub fn new(cfg: ControllerCfg) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            integrator: 0,
            last_tick: 0,
            previous_output: 0,
            initialized: false,
            last_terms: Terms::default(),
        })
    }

    /// Replace the tuning while running. An invalid config is rejected and the
    /// current one stays in effect. Controller state is kept.
    pub fn set_config(&mut self, cfg: ControllerCfg) -> Result<()> {
        cfg.validate()?;
        tracing::debug!(?cfg, "controller retuned");
        self.cfg = cfg;
        let clamp = self.cfg.integrator_clamp;
        self.integrator = self.integrator.clamp(-clamp, clamp);
        Ok(())
    }

    pub fn config(&self) -> &ControllerCfg {
        &self.cfg
    }

    /// Committed integrator, Q30.
    pub fn integrator(&self) -> i32 {
        self.integrator
    }

    /// Last emitted command, Q30.
    pub fn previous_output(&self) -> i32 {
        self.previous_output
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Contributions behind the last emitted command (before slew limiting).
    pub fn last_terms(&self) -> Terms {
        self.last_terms
    }

    /// Zero all state; the next `update` re-initializes and returns 0.
    pub fn reset(&mut self) {
        self.integrator = 0;
        self.last_tick = 0;
        self.previous_output = 0;
        self.initialized = false;
        self.last_terms = Terms::default();
    }

    /// Run one control tick and return the Q30 command.
    ///
    /// - The first call after construction or `reset` records `timestamp` and returns 0.
    /// - A call with the same timestamp as the previous one returns the held output.
    pub fn update(&mut self, reference: i32, measured: i32, timestamp: u32) -> i32 {
        if !self.initialized {
            self.last_tick = timestamp;
            self.integrator = 0;
            self.previous_output = 0;
            self.last_terms = Terms::default();
            self.initialized = true;
            return 0;
        }

        let dt = wrapping_dt(timestamp, self.last_tick);
        self.last_tick = timestamp;
        if dt == 0 {
            return self.previous_output;
        }

        let mut error = i64::from(reference) - i64::from(measured);
        if abs_i64(error) <= i64::from(self.cfg.deadband_rpm) {
            error = 0;
        }
        let e_q15 = normalize_error(error, self.cfg.full_scale_rpm);

        // Feedforward runs on the raw reference: actuation per rpm, independent of error.
        let ff = saturate_control(i64::from(self.cfg.feedforward_per_rpm) * i64::from(reference));
        let p = saturate_control(mul_fixed(
            i64::from(self.cfg.kp_q15),
            UNIT_FRAC_BITS,
            i64::from(e_q15),
            UNIT_FRAC_BITS,
            CTRL_FRAC_BITS,
        ));

        let integrate = match self.cfg.integration_window.width_rpm(reference) {
            Some(width) => abs_i64(error) <= width,
            None => true,
        };

        let clamp = self.cfg.integrator_clamp;
        let i_candidate = if integrate {
            let rate = mul_fixed(
                i64::from(self.cfg.ki_q15),
                UNIT_FRAC_BITS,
                i64::from(e_q15),
                UNIT_FRAC_BITS,
                CTRL_FRAC_BITS,
            );
            // Rectangular integration; ticks -> seconds with truncating division.
            let di = rate.saturating_mul(i64::from(dt))
                / i64::from(self.cfg.time_units_per_second);
            saturate_control(i64::from(self.integrator).saturating_add(di)).clamp(-clamp, clamp)
        } else {
            self.integrator
        };

        // Anti-windup: only freeze when the candidate deepens the saturation it causes.
        let u_candidate = i64::from(ff) + i64::from(p) + i64::from(i_candidate);
        let deepens = (u_candidate > i64::from(CTRL_MAX) && e_q15 > 0)
            || (u_candidate < i64::from(CTRL_MIN) && e_q15 < 0);
        if deepens {
            tracing::debug!(
                integrator = self.integrator,
                candidate = i_candidate,
                "integrator frozen at saturation"
            );
        } else {
            self.integrator = i_candidate;
        }

        let mut u = saturate_control(i64::from(ff) + i64::from(p) + i64::from(self.integrator));
        self.last_terms = Terms {
            feedforward: ff,
            proportional: p,
            integrator: self.integrator,
        };

        if let Some(step) = self.cfg.slew_max_step {
            let step = i64::from(step);
            let du = (i64::from(u) - i64::from(self.previous_output)).clamp(-step, step);
            u = saturate_control(i64::from(self.previous_output) + du);
        }

        self.previous_output = u;
        tracing::trace!(
            reference,
            measured,
            dt,
            error,
            e_q15,
            ff,
            p,
            i = self.integrator,
            u,
            "pi update"
        );
        u
    }
}

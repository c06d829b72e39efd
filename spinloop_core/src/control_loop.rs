//! The per-tick pipeline (`ControlLoop`).
//!
//! One tick reads the raw encoder counter, feeds the velocity estimator, runs the PI
//! controller against the current setpoint and hands the command to the actuator.
//! Pacing lives in `runner`; this type only knows how to execute a single tick.

use eyre::WrapErr;
use spinloop_traits::{Actuator, Encoder, ReferenceSource};

use crate::config::{ControllerCfg, EstimatorCfg, ScheduleCfg};
use crate::controller::PiController;
use crate::error::{BuildError, Result};
use crate::estimator::VelocityEstimator;
use crate::hw_error::map_hw_error;

/// What happened on one control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick_ms: u32,
    /// Setpoint, rpm.
    pub reference: i32,
    /// Smoothed estimate, rpm.
    pub velocity: i32,
    /// Q30 command handed to the actuator.
    pub command: i32,
}

pub struct ControlLoop<E: Encoder, A: Actuator, R: ReferenceSource> {
    pub(crate) encoder: E,
    pub(crate) actuator: A,
    pub(crate) reference: R,
    pub(crate) controller: PiController,
    pub(crate) estimator: VelocityEstimator,
    pub(crate) schedule: ScheduleCfg,
    pub(crate) enabled: bool,
    pub(crate) last_report: Option<TickReport>,
}

impl<E: Encoder, A: Actuator, R: ReferenceSource> core::fmt::Debug for ControlLoop<E, A, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("controller", &self.controller)
            .field("estimator", &self.estimator)
            .field("period_ms", &self.schedule.period_ms)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<E: Encoder, A: Actuator, R: ReferenceSource> ControlLoop<E, A, R> {
    /// Validate every config and assemble a statically dispatched loop.
    pub fn new(
        encoder: E,
        actuator: A,
        reference: R,
        controller: ControllerCfg,
        estimator: EstimatorCfg,
        schedule: ScheduleCfg,
    ) -> Result<Self> {
        if schedule.period_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "period_ms must be > 0",
            )));
        }
        let controller = PiController::new(controller).wrap_err("controller config")?;
        let estimator = VelocityEstimator::new(estimator).wrap_err("estimator config")?;
        Ok(Self {
            encoder,
            actuator,
            reference,
            controller,
            estimator,
            schedule,
            enabled: false,
            last_report: None,
        })
    }

    pub fn controller(&self) -> &PiController {
        &self.controller
    }

    /// Mutable access for live retuning via `PiController::set_config`.
    pub fn controller_mut(&mut self) -> &mut PiController {
        &mut self.controller
    }

    pub fn estimator(&self) -> &VelocityEstimator {
        &self.estimator
    }

    pub fn schedule(&self) -> &ScheduleCfg {
        &self.schedule
    }

    pub fn last_report(&self) -> Option<TickReport> {
        self.last_report
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Run exactly one tick at `now_ms`. Enables the actuator on first use.
    pub fn step_at(&mut self, now_ms: u32) -> Result<TickReport> {
        if !self.enabled {
            self.actuator
                .enable()
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("enabling actuator")?;
            self.enabled = true;
        }

        let count = self
            .encoder
            .read_count()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading encoder")?;

        let reference = self.reference.reference_at(now_ms);
        let velocity = self.estimator.update(count, now_ms);
        let command = self.controller.update(reference, velocity, now_ms);

        self.actuator
            .apply(command)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("applying command")?;

        let report = TickReport {
            tick_ms: now_ms,
            reference,
            velocity,
            command,
        };
        self.last_report = Some(report);
        Ok(report)
    }

    /// Reset controller and estimator; the next tick re-primes both.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.estimator.reset();
        self.last_report = None;
        tracing::debug!("control loop reset");
    }

    /// Drive the actuator to zero and disable it.
    ///
    /// Both calls are attempted even if the first fails; the first error is returned.
    pub fn stop(&mut self) -> Result<()> {
        let zeroed = self.actuator.apply(0);
        let disabled = self.actuator.disable();
        self.enabled = false;
        zeroed
            .and(disabled)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("stopping actuator")
    }
}

//! Type-state builder for the boxed `DynControlLoop`.
//!
//! The builder enforces at compile time that Encoder, Actuator, and Reference are
//! provided before `build()` is available. `try_build()` is always available for
//! dynamic checks.

use std::marker::PhantomData;

use spinloop_traits::{Actuator, Encoder, ReferenceSource};

use crate::config::{ControllerCfg, EstimatorCfg, ScheduleCfg};
use crate::control_loop::ControlLoop;
use crate::error::{BuildError, Result};

// ── Public dynamic-dispatch alias ────────────────────────────────────────────

/// Control loop over boxed collaborators, as produced by the builder.
pub type DynControlLoop =
    ControlLoop<Box<dyn Encoder>, Box<dyn Actuator>, Box<dyn ReferenceSource>>;

impl DynControlLoop {
    /// Start building a control loop.
    pub fn builder() -> ControlLoopBuilder<Missing, Missing, Missing> {
        ControlLoopBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `DynControlLoop`. All configs are validated on `build()`.
pub struct ControlLoopBuilder<E, A, R> {
    encoder: Option<Box<dyn Encoder>>,
    actuator: Option<Box<dyn Actuator>>,
    reference: Option<Box<dyn ReferenceSource>>,
    controller: Option<ControllerCfg>,
    estimator: Option<EstimatorCfg>,
    schedule: Option<ScheduleCfg>,
    _e: PhantomData<E>,
    _a: PhantomData<A>,
    _r: PhantomData<R>,
}

impl Default for ControlLoopBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            encoder: None,
            actuator: None,
            reference: None,
            controller: None,
            estimator: None,
            schedule: None,
            _e: PhantomData,
            _a: PhantomData,
            _r: PhantomData,
        }
    }
}

impl<E, A, R> ControlLoopBuilder<E, A, R> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<DynControlLoop> {
        let encoder = self
            .encoder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoder))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let reference = self
            .reference
            .ok_or_else(|| eyre::Report::new(BuildError::MissingReference))?;

        ControlLoop::new(
            encoder,
            actuator,
            reference,
            self.controller.unwrap_or_default(),
            self.estimator.unwrap_or_default(),
            self.schedule.unwrap_or_default(),
        )
    }

    /// Move every field into a builder with different markers.
    fn retag<E2, A2, R2>(self) -> ControlLoopBuilder<E2, A2, R2> {
        ControlLoopBuilder {
            encoder: self.encoder,
            actuator: self.actuator,
            reference: self.reference,
            controller: self.controller,
            estimator: self.estimator,
            schedule: self.schedule,
            _e: PhantomData,
            _a: PhantomData,
            _r: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<E, A, R> ControlLoopBuilder<E, A, R> {
    pub fn with_controller(mut self, controller: ControllerCfg) -> Self {
        self.controller = Some(controller);
        self
    }
    pub fn with_estimator(mut self, estimator: EstimatorCfg) -> Self {
        self.estimator = Some(estimator);
        self
    }
    pub fn with_schedule(mut self, schedule: ScheduleCfg) -> Self {
        self.schedule = Some(schedule);
        self
    }
}

// Setters that advance type-state
impl<A, R> ControlLoopBuilder<Missing, A, R> {
    pub fn with_encoder(self, encoder: impl Encoder + 'static) -> ControlLoopBuilder<Set, A, R> {
        let mut next = self.retag();
        next.encoder = Some(Box::new(encoder));
        next
    }
}

impl<E, R> ControlLoopBuilder<E, Missing, R> {
    pub fn with_actuator(
        self,
        actuator: impl Actuator + 'static,
    ) -> ControlLoopBuilder<E, Set, R> {
        let mut next = self.retag();
        next.actuator = Some(Box::new(actuator));
        next
    }
}

impl<E, A> ControlLoopBuilder<E, A, Missing> {
    pub fn with_reference(
        self,
        reference: impl ReferenceSource + 'static,
    ) -> ControlLoopBuilder<E, A, Set> {
        let mut next = self.retag();
        next.reference = Some(Box::new(reference));
        next
    }
}

impl ControlLoopBuilder<Set, Set, Set> {
    /// Validate and build. Only available when Encoder, Actuator, and Reference are set.
    pub fn build(self) -> Result<DynControlLoop> {
        self.try_build()
    }
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Velocity control core (hardware-agnostic).
//!
//! This crate provides the fixed-point PI velocity controller and the rolling-window
//! encoder velocity estimator, plus the plumbing that wires them to an encoder, an
//! actuator and a setpoint source through the `spinloop_traits` seams.
//!
//! ## Architecture
//!
//! - **Fixed point**: Q15 unit scale and Q30 control scale (`fixed_point` module)
//! - **Configuration**: Runtime tuning structs with validation (`config` module)
//! - **Controller**: PI with feedforward, deadband and anti-windup (`controller` module)
//! - **Estimator**: Ring-buffer velocity estimate with IIR smoothing (`estimator` module)
//! - **Loop**: One tick = read, estimate, control, actuate (`control_loop` module)
//! - **Runner**: Period pacing and shutdown handling (`runner` module)
//!
//! ## Numeric contract
//!
//! `PiController::update` and `VelocityEstimator::update` never fail, never panic
//! and never allocate. Overflow saturates. Timestamps are wrapping 32-bit
//! millisecond ticks; the encoder counter is a wrapping 16-bit value.

// Module declarations
pub mod builder;
pub mod config;
pub mod control_loop;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod estimator;
pub mod fixed_point;
pub mod hw_error;
pub mod mocks;
pub mod reference;
pub mod runner;
pub mod util;

// ── Re-exports ───────────────────────────────────────────────────────────────

pub use builder::{ControlLoopBuilder, DynControlLoop, Missing, Set};
pub use config::{ControllerCfg, EstimatorCfg, IntegrationWindow, ScheduleCfg};
pub use control_loop::{ControlLoop, TickReport};
pub use controller::{PiController, Terms};
pub use error::{BuildError, LoopError, Report, Result, StopReason};
pub use estimator::VelocityEstimator;
pub use reference::{ConstantReference, ProfileReference, SquareWaveReference};
pub use runner::{RunParams, RunSummary};

use thiserror::Error;

/// Failures of the plumbing around the numeric core (sensor reads, actuator writes).
///
/// The controller and estimator updates themselves never fail.
#[derive(Debug, Error, Clone)]
pub enum LoopError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("stopped: {0}")]
    Stopped(StopReason),
}

/// Why a control run was halted before its planned end.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    #[error("encoder unavailable")]
    EncoderLost,
}

/// Configuration rejected at construction time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing encoder")]
    MissingEncoder,
    #[error("missing actuator")]
    MissingActuator,
    #[error("missing reference source")]
    MissingReference,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

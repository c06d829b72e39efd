//! Seams between the numeric control core and the surrounding plumbing.
//!
//! The core never touches hardware directly: the tick source, the encoder counter,
//! the actuator driver and the setpoint generator are all reached through these traits.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Read-only access to a wrapping 16-bit incremental position counter.
///
/// Implementations must never reset or write the counter.
pub trait Encoder {
    fn read_count(&mut self) -> Result<i16, Box<dyn std::error::Error + Send + Sync>>;
}

/// Consumer of the signed Q30 actuation command.
///
/// Magnitude maps to duty cycle, sign to direction, zero to "motor off".
pub trait Actuator {
    fn apply(&mut self, command: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn enable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn disable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Supplies the signed velocity setpoint (rpm) for a given tick.
pub trait ReferenceSource {
    fn reference_at(&mut self, now_ms: u32) -> i32;
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    fn read_count(&mut self) -> Result<i16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_count()
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn apply(&mut self, command: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).apply(command)
    }
    fn enable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).enable()
    }
    fn disable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).disable()
    }
}

impl<R: ReferenceSource + ?Sized> ReferenceSource for Box<R> {
    fn reference_at(&mut self, now_ms: u32) -> i32 {
        (**self).reference_at(now_ms)
    }
}

//! Simulated encoder/actuator rig and PWM duty mapping.
//!
//! The rig is a test double for host runs: the encoder counter advances at a rate
//! proportional to the last applied duty. It does not model motor dynamics.
pub mod error;
pub mod pwm;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use spinloop_traits::{Actuator, Clock, Encoder};

use crate::error::HwError;
use crate::pwm::{PwmOutput, duty_from_command};

const MICROS_PER_MINUTE: i128 = 60_000_000;

/// Parameters of the simulated rig.
#[derive(Debug, Clone)]
pub struct RigCfg {
    pub timer_arr: u32,
    /// Shaft speed at 100% duty.
    pub rpm_at_full_duty: u32,
    pub counts_per_rev: u32,
    pub initial_count: i16,
}

impl Default for RigCfg {
    fn default() -> Self {
        Self {
            timer_arr: 999,
            rpm_at_full_duty: 3000,
            counts_per_rev: 2048,
            initial_count: 0,
        }
    }
}

struct RigState {
    clock: Box<dyn Clock>,
    cfg: RigCfg,
    count: i16,
    // Sub-count remainder, in units of 1 / (top * MICROS_PER_MINUTE) counts
    residual: i128,
    last: Instant,
    pwm: PwmOutput,
    enabled: bool,
    connected: bool,
}

impl RigState {
    /// Integrate the current duty up to now.
    fn advance(&mut self) {
        let now = self.clock.now();
        let elapsed_us = now.saturating_duration_since(self.last).as_micros() as i128;
        self.last = now;
        if elapsed_us == 0 {
            return;
        }
        let top = i128::from(self.cfg.timer_arr) + 1;
        let num = i128::from(self.pwm.signed_duty())
            * i128::from(self.cfg.rpm_at_full_duty)
            * i128::from(self.cfg.counts_per_rev)
            * elapsed_us
            + self.residual;
        let den = top * MICROS_PER_MINUTE;
        let whole = num / den;
        self.residual = num % den;
        // Truncation to 16 bits is the counter wrap.
        self.count = self.count.wrapping_add(whole as i16);
    }
}

/// Shared state behind a simulated encoder/actuator pair.
#[derive(Clone)]
pub struct SimulatedRig {
    state: Rc<RefCell<RigState>>,
}

impl core::fmt::Debug for SimulatedRig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("SimulatedRig")
            .field("count", &s.count)
            .field("pwm", &s.pwm)
            .field("enabled", &s.enabled)
            .finish()
    }
}

impl SimulatedRig {
    pub fn new(clock: impl Clock + 'static, cfg: RigCfg) -> Self {
        let last = clock.now();
        let count = cfg.initial_count;
        Self {
            state: Rc::new(RefCell::new(RigState {
                clock: Box::new(clock),
                cfg,
                count,
                residual: 0,
                last,
                pwm: PwmOutput::OFF,
                enabled: false,
                connected: true,
            })),
        }
    }

    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            state: Rc::clone(&self.state),
        }
    }

    pub fn actuator(&self) -> SimActuator {
        SimActuator {
            state: Rc::clone(&self.state),
        }
    }

    /// Current counter value, advanced to now.
    pub fn count(&self) -> i16 {
        let mut s = self.state.borrow_mut();
        s.advance();
        s.count
    }

    pub fn pwm(&self) -> PwmOutput {
        self.state.borrow().pwm
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    /// Make subsequent encoder reads fail with `HwError::EncoderDisconnected`.
    pub fn set_encoder_connected(&self, connected: bool) {
        self.state.borrow_mut().connected = connected;
    }
}

/// Encoder half of a `SimulatedRig`. Reads never modify the counter.
pub struct SimEncoder {
    state: Rc<RefCell<RigState>>,
}

impl Encoder for SimEncoder {
    fn read_count(&mut self) -> Result<i16, Box<dyn std::error::Error + Send + Sync>> {
        let mut s = self.state.borrow_mut();
        if !s.connected {
            return Err(Box::new(HwError::EncoderDisconnected));
        }
        s.advance();
        Ok(s.count)
    }
}

/// PWM half of a `SimulatedRig`.
pub struct SimActuator {
    state: Rc<RefCell<RigState>>,
}

impl Actuator for SimActuator {
    fn apply(&mut self, command: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut s = self.state.borrow_mut();
        if !s.enabled && command != 0 {
            return Err(Box::new(HwError::ActuatorDisabled));
        }
        s.advance();
        s.pwm = duty_from_command(command, s.cfg.timer_arr);
        tracing::trace!(command, ch1 = s.pwm.ch1, ch2 = s.pwm.ch2, "pwm update");
        Ok(())
    }

    fn enable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut s = self.state.borrow_mut();
        s.advance();
        s.enabled = true;
        tracing::debug!("actuator enabled (simulated)");
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut s = self.state.borrow_mut();
        s.advance();
        s.pwm = PwmOutput::OFF;
        s.enabled = false;
        tracing::debug!("actuator disabled (simulated)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinloop_traits::ManualClock;
    use std::time::Duration;

    #[test]
    fn counter_advances_with_duty() {
        let clock = ManualClock::new();
        let rig = SimulatedRig::new(clock.clone(), RigCfg::default());
        let mut enc = rig.encoder();
        let mut act = rig.actuator();
        act.enable().unwrap();
        // 50% duty of 3000 rpm = 1500 rpm = 51.2 counts/ms
        act.apply(1 << 29).unwrap();
        assert_eq!(rig.pwm(), PwmOutput { ch1: 0, ch2: 500 });
        clock.advance(Duration::from_millis(10));
        assert_eq!(enc.read_count().unwrap(), 512);
        act.apply(-(1 << 29)).unwrap();
        clock.advance(Duration::from_millis(10));
        assert_eq!(enc.read_count().unwrap(), 0);
    }

    #[test]
    fn fractional_counts_accumulate() {
        let clock = ManualClock::new();
        let rig = SimulatedRig::new(clock.clone(), RigCfg::default());
        let mut act = rig.actuator();
        act.enable().unwrap();
        // 1/1000 duty of 3000 rpm = 3 rpm = 0.1024 counts/ms
        act.apply((1 << 30) / 1000 + 1).unwrap();
        assert_eq!(rig.pwm().ch2, 1);
        for _ in 0..100 {
            clock.advance(Duration::from_millis(1));
            rig.count();
        }
        assert_eq!(rig.count(), 10);
    }

    #[test]
    fn disabled_actuator_rejects_nonzero_command() {
        let rig = SimulatedRig::new(ManualClock::new(), RigCfg::default());
        let mut act = rig.actuator();
        assert!(act.apply(1000).is_err());
        act.apply(0).unwrap();
        act.enable().unwrap();
        act.apply(1 << 28).unwrap();
        act.disable().unwrap();
        assert_eq!(rig.pwm(), PwmOutput::OFF);
        assert!(!rig.is_enabled());
    }

    #[test]
    fn disconnected_encoder_reports_typed_error() {
        let rig = SimulatedRig::new(ManualClock::new(), RigCfg::default());
        rig.set_encoder_connected(false);
        let err = rig.encoder().read_count().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::EncoderDisconnected)
        ));
    }
}

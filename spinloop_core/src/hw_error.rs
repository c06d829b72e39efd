//! Maps `Box<dyn Error>` from trait boundaries to typed `LoopError`.
//!
//! The traits in `spinloop_traits` use `Box<dyn Error + Send + Sync>` so any driver
//! can plug in; this module converts those to the typed loop error, with an optional
//! feature-gated path for `spinloop_hardware::HwError` downcasting.

use crate::error::{LoopError, StopReason};

/// Map a trait-boundary error to a typed `LoopError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> LoopError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<spinloop_hardware::error::HwError>() {
            return match hw {
                spinloop_hardware::error::HwError::EncoderDisconnected => {
                    LoopError::Stopped(StopReason::EncoderLost)
                }
                other => LoopError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("disconnected") {
        LoopError::Stopped(StopReason::EncoderLost)
    } else {
        LoopError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_errors_map_to_hardware() {
        let e: Box<dyn std::error::Error + Send + Sync> = "bus glitch".into();
        assert!(matches!(map_hw_error(&*e), LoopError::Hardware(s) if s == "bus glitch"));
    }

    #[test]
    fn disconnect_text_maps_to_encoder_lost() {
        let e: Box<dyn std::error::Error + Send + Sync> = "encoder disconnected".into();
        assert!(matches!(
            map_hw_error(&*e),
            LoopError::Stopped(StopReason::EncoderLost)
        ));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_downcast() {
        use spinloop_hardware::error::HwError;
        let lost: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::EncoderDisconnected);
        assert!(matches!(
            map_hw_error(&*lost),
            LoopError::Stopped(StopReason::EncoderLost)
        ));
        let disabled: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::ActuatorDisabled);
        assert!(
            matches!(map_hw_error(&*disabled), LoopError::HardwareFault(s) if s == "actuator disabled")
        );
    }
}

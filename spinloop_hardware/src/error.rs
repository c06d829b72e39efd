use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("encoder disconnected")]
    EncoderDisconnected,
    #[error("actuator disabled")]
    ActuatorDisabled,
}

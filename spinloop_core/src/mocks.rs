//! Test and helper mocks for spinloop_core

use std::collections::VecDeque;

/// Encoder that replays a fixed list of counter values, then fails.
#[derive(Debug, Default)]
pub struct ScriptedEncoder {
    counts: VecDeque<i16>,
}

impl ScriptedEncoder {
    pub fn new(counts: impl IntoIterator<Item = i16>) -> Self {
        Self {
            counts: counts.into_iter().collect(),
        }
    }
}

impl spinloop_traits::Encoder for ScriptedEncoder {
    fn read_count(&mut self) -> Result<i16, Box<dyn std::error::Error + Send + Sync>> {
        self.counts
            .pop_front()
            .ok_or_else(|| "script exhausted".into())
    }
}

/// Actuator that records every command it receives.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub applied: Vec<i32>,
    pub enabled: bool,
}

impl spinloop_traits::Actuator for RecordingActuator {
    fn apply(&mut self, command: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.applied.push(command);
        Ok(())
    }
    fn enable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.enabled = true;
        Ok(())
    }
    fn disable(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.enabled = false;
        Ok(())
    }
}

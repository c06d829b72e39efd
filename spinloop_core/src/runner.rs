use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use spinloop_traits::{Actuator, Clock, Encoder, ReferenceSource};

use crate::control_loop::{ControlLoop, TickReport};
use crate::error::{LoopError, Result, StopReason};
use crate::util::{next_deadline_ms, rate_hz};

/// Limits and pacing for one `run`.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    /// Control period in milliseconds; ticks land on multiples of it.
    pub period_ms: u32,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Stop once the next deadline would fall at or beyond this many ms after start.
    pub duration_ms: Option<u64>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub last: Option<TickReport>,
    /// Largest `|command|` emitted, Q30.
    pub peak_command: u32,
    /// Ticks that started one or more periods after their deadline.
    pub missed_deadlines: u64,
    /// True when the run ended because the shutdown flag was raised.
    pub interrupted: bool,
}

#[inline]
fn limits_reached(ticks: u64, elapsed_at_deadline_ms: u64, params: &RunParams) -> bool {
    params.max_ticks.is_some_and(|max| ticks >= max)
        || params
            .duration_ms
            .is_some_and(|d| elapsed_at_deadline_ms >= d)
}

#[inline]
fn is_late(tick_ms: u32, deadline_ms: u32, period_ms: u32) -> bool {
    tick_ms.wrapping_sub(deadline_ms) >= period_ms.max(1)
}

/// Run the loop until a limit is hit or `shutdown` is raised.
///
/// The actuator is stopped on every exit path.
pub fn run<E, A, R, C>(
    control: &mut ControlLoop<E, A, R>,
    clock: &C,
    params: &RunParams,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    E: Encoder,
    A: Actuator,
    R: ReferenceSource,
    C: Clock + ?Sized,
{
    run_with(control, clock, params, shutdown, |_| {})
}

/// Like [`run`], calling `on_tick` after every executed tick.
pub fn run_with<E, A, R, C, F>(
    control: &mut ControlLoop<E, A, R>,
    clock: &C,
    params: &RunParams,
    shutdown: &AtomicBool,
    mut on_tick: F,
) -> Result<RunSummary>
where
    E: Encoder,
    A: Actuator,
    R: ReferenceSource,
    C: Clock + ?Sized,
    F: FnMut(&TickReport),
{
    let period = params.period_ms.max(1);
    let epoch = clock.now();
    let mut summary = RunSummary::default();
    // The epoch tick counts as taken; the first tick runs one period later.
    let mut last_tick: Option<u32> = Some(clock.tick_ms(epoch));

    tracing::info!(
        period_ms = period,
        rate_hz = rate_hz(period),
        max_ticks = ?params.max_ticks,
        duration_ms = ?params.duration_ms,
        "control loop start"
    );

    let outcome = loop {
        if shutdown.load(Ordering::Relaxed) {
            summary.interrupted = true;
            break Ok(());
        }

        let now_ms = clock.tick_ms(epoch);
        let deadline = next_deadline_ms(now_ms, last_tick, period);
        let wait = deadline.wrapping_sub(now_ms);
        let elapsed_at_deadline = clock.ms_since(epoch).saturating_add(u64::from(wait));
        if limits_reached(summary.ticks, elapsed_at_deadline, params) {
            break Ok(());
        }
        if wait > 0 {
            clock.sleep(Duration::from_millis(u64::from(wait)));
        }

        let tick_ms = clock.tick_ms(epoch);
        if is_late(tick_ms, deadline, period) {
            summary.missed_deadlines += 1;
            tracing::warn!(deadline, tick_ms, "control tick missed its deadline");
        }

        match control.step_at(tick_ms) {
            Ok(report) => {
                summary.ticks += 1;
                summary.peak_command = summary.peak_command.max(report.command.unsigned_abs());
                summary.last = Some(report);
                on_tick(&report);
            }
            Err(e) => break Err(e),
        }
        last_tick = Some(tick_ms);
    };

    let stopped = control.stop();
    match outcome {
        Ok(()) => {
            stopped?;
            tracing::info!(
                ticks = summary.ticks,
                peak_command = summary.peak_command,
                missed = summary.missed_deadlines,
                interrupted = summary.interrupted,
                "control loop stop"
            );
            Ok(summary)
        }
        Err(e) => {
            if let Err(stop_err) = stopped {
                tracing::warn!(error = %stop_err, "actuator stop failed after loop error");
            }
            let lost = matches!(
                e.downcast_ref::<LoopError>(),
                Some(LoopError::Stopped(StopReason::EncoderLost))
            );
            tracing::error!(error = %e, encoder_lost = lost, "control loop aborted");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_by_ticks_or_duration() {
        let p = RunParams {
            period_ms: 10,
            max_ticks: Some(3),
            duration_ms: None,
        };
        assert!(!limits_reached(2, 10_000, &p));
        assert!(limits_reached(3, 0, &p));

        let p = RunParams {
            period_ms: 10,
            max_ticks: None,
            duration_ms: Some(100),
        };
        assert!(!limits_reached(1_000, 99, &p));
        assert!(limits_reached(0, 100, &p));
    }

    #[test]
    fn late_means_a_full_period_behind() {
        assert!(!is_late(10, 10, 10));
        assert!(!is_late(19, 10, 10));
        assert!(is_late(20, 10, 10));
        // wrapped tick counter
        assert!(!is_late(3, u32::MAX - 2, 10));
    }
}

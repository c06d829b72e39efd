//! Loop execution: config mapping, rig assembly, run and report.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use spinloop_core::error::Result as CoreResult;
use spinloop_core::runner::{RunParams, RunSummary, run, run_with};
use spinloop_core::{
    ConstantReference, ControllerCfg, DynControlLoop, EstimatorCfg, ProfileReference, ScheduleCfg,
    SquareWaveReference, TickReport,
};
use spinloop_hardware::{RigCfg, SimulatedRig};
use spinloop_traits::{Clock, ManualClock, MonotonicClock, ReferenceSource};

/// Options of the `run` subcommand.
#[derive(Debug, Clone)]
pub struct RunOpts {
    pub duration_ms: u64,
    pub max_ticks: Option<u64>,
    pub realtime: bool,
    pub reference_csv: Option<PathBuf>,
    pub trace_csv: Option<PathBuf>,
}

/// Build the setpoint source from config, or from `csv_override` when given.
pub fn build_reference(
    cfg: &spinloop_config::Config,
    csv_override: Option<&Path>,
) -> CoreResult<Box<dyn ReferenceSource>> {
    if let Some(path) = csv_override {
        return load_profile(path);
    }
    Ok(match &cfg.reference {
        spinloop_config::ReferenceCfg::Square {
            amplitude_rpm,
            half_period_ms,
        } => Box::new(SquareWaveReference::new(*amplitude_rpm, *half_period_ms)),
        spinloop_config::ReferenceCfg::Constant { rpm } => Box::new(ConstantReference(*rpm)),
        spinloop_config::ReferenceCfg::Profile { csv } => return load_profile(Path::new(csv)),
    })
}

fn load_profile(path: &Path) -> CoreResult<Box<dyn ReferenceSource>> {
    let rows = spinloop_config::load_reference_csv(path)?;
    tracing::info!(points = rows.len(), path = %path.display(), "reference profile loaded");
    Ok(Box::new(ProfileReference::new(
        rows.into_iter().map(|r| (r.t_ms, r.rpm)).collect(),
    )))
}

fn rig_cfg(cfg: &spinloop_config::Config) -> RigCfg {
    RigCfg {
        timer_arr: cfg.actuator.timer_arr,
        rpm_at_full_duty: cfg.sim.rpm_at_full_duty,
        counts_per_rev: cfg.estimator.counts_per_rev(),
        initial_count: cfg.sim.initial_count,
    }
}

/// Wire the simulated rig into a control loop.
///
/// Config mapping uses the `From` impls in `spinloop_core::conversions`.
pub fn assemble(
    cfg: &spinloop_config::Config,
    clock: impl Clock + 'static,
    reference: Box<dyn ReferenceSource>,
) -> CoreResult<(SimulatedRig, DynControlLoop)> {
    let rig = SimulatedRig::new(clock, rig_cfg(cfg));
    let controller: ControllerCfg = (&cfg.controller).into();
    let estimator: EstimatorCfg = cfg.into();
    let schedule: ScheduleCfg = (&cfg.schedule).into();
    let control = DynControlLoop::builder()
        .with_encoder(rig.encoder())
        .with_actuator(rig.actuator())
        .with_reference(reference)
        .with_controller(controller)
        .with_estimator(estimator)
        .with_schedule(schedule)
        .build()?;
    Ok((rig, control))
}

/// Writes one CSV row per tick; keeps the first I/O error for later.
struct TraceSink {
    writer: csv::Writer<std::fs::File>,
    error: Option<csv::Error>,
}

impl TraceSink {
    fn create(path: &Path) -> CoreResult<Self> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
        writer
            .write_record(["tick_ms", "reference", "velocity", "command"])
            .map_err(|e| eyre::eyre!("write trace CSV header: {e}"))?;
        Ok(Self {
            writer,
            error: None,
        })
    }

    fn record(&mut self, r: &TickReport) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self
            .writer
            .serialize((r.tick_ms, r.reference, r.velocity, r.command))
        {
            tracing::warn!(error = %e, "trace CSV write failed; further rows dropped");
            self.error = Some(e);
        }
    }

    fn finish(mut self) -> CoreResult<()> {
        if let Some(e) = self.error {
            return Err(eyre::eyre!("write trace CSV: {e}"));
        }
        self.writer.flush().wrap_err("flush trace CSV")?;
        Ok(())
    }
}

pub fn run_loop(
    cfg: &spinloop_config::Config,
    opts: &RunOpts,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let reference = build_reference(cfg, opts.reference_csv.as_deref())?;
    let params = RunParams {
        period_ms: cfg.schedule.period_ms,
        max_ticks: opts.max_ticks,
        duration_ms: Some(opts.duration_ms),
    };
    let mut trace = opts.trace_csv.as_deref().map(TraceSink::create).transpose()?;

    let summary = if opts.realtime {
        let clock = MonotonicClock::new();
        let (_rig, mut control) = assemble(cfg, clock, reference)?;
        execute(&mut control, &clock, &params, &shutdown, trace.as_mut())?
    } else {
        let clock = ManualClock::new();
        let (_rig, mut control) = assemble(cfg, clock.clone(), reference)?;
        execute(&mut control, &clock, &params, &shutdown, trace.as_mut())?
    };

    if let Some(t) = trace {
        t.finish()?;
    }
    Ok(summary)
}

fn execute(
    control: &mut DynControlLoop,
    clock: &impl Clock,
    params: &RunParams,
    shutdown: &AtomicBool,
    trace: Option<&mut TraceSink>,
) -> CoreResult<RunSummary> {
    match trace {
        Some(sink) => run_with(control, clock, params, shutdown, |r| sink.record(r)),
        None => run(control, clock, params, shutdown),
    }
}

/// Short self test: build everything from config and run a few simulated ticks.
pub fn self_check(cfg: &spinloop_config::Config) -> CoreResult<RunSummary> {
    let clock = ManualClock::new();
    let reference = build_reference(cfg, None)?;
    let (rig, mut control) = assemble(cfg, clock.clone(), reference)?;
    let params = RunParams {
        period_ms: cfg.schedule.period_ms,
        max_ticks: Some(10),
        duration_ms: None,
    };
    let summary = run(&mut control, &clock, &params, &AtomicBool::new(false))?;
    if rig.is_enabled() || rig.pwm() != spinloop_hardware::pwm::PwmOutput::OFF {
        eyre::bail!("actuator still driven after stop");
    }
    Ok(summary)
}

/// Duty fraction of a Q30 command magnitude, in percent.
#[inline]
pub fn duty_percent(command_mag: u32) -> f64 {
    f64::from(command_mag) * 100.0 / f64::from(1u32 << 30)
}

pub fn summary_json(summary: &RunSummary) -> serde_json::Value {
    use serde_json::json;
    let last = summary.last.map(|r| {
        json!({
            "tick_ms": r.tick_ms,
            "reference": r.reference,
            "velocity": r.velocity,
            "command": r.command,
        })
    });
    json!({
        "ticks": summary.ticks,
        "interrupted": summary.interrupted,
        "missed_deadlines": summary.missed_deadlines,
        "peak_command": summary.peak_command,
        "peak_duty_pct": duty_percent(summary.peak_command),
        "last": last,
    })
}

pub fn summary_text(summary: &RunSummary) -> String {
    let mut s = format!(
        "run complete: ticks={} missed_deadlines={} peak_duty={:.1}%",
        summary.ticks,
        summary.missed_deadlines,
        duty_percent(summary.peak_command)
    );
    if let Some(r) = summary.last {
        s.push_str(&format!(
            "\nlast tick {} ms: reference={} rpm velocity={} rpm command={}",
            r.tick_ms, r.reference, r.velocity, r.command
        ));
    }
    if summary.interrupted {
        s.push_str("\ninterrupted by shutdown request");
    }
    s
}

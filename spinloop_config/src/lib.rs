#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and reference-profile parsing for the velocity loop.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section has defaults, so an empty file is a valid configuration that
//!   reproduces the stock tuning.
//! - Reference profile CSV loader enforces headers and strictly increasing time.
use serde::Deserialize;

/// +100% duty in control units (Q30).
pub const CTRL_MAX: i64 = 0x3FFF_FFFF;

/// Reference profile CSV schema.
///
/// Expected headers:
/// t_ms,rpm
///
/// Example:
/// t_ms,rpm
/// 0,500
/// 2000,1500
/// 5000,-800
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRow {
    pub t_ms: u32,
    pub rpm: i32,
}

/// When the integrator may accumulate.
///
/// TOML: `[controller.integration_window]` with `mode = "always" | "fixed" | "proportional"`.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum IntegrationWindowCfg {
    #[default]
    Always,
    Fixed {
        rpm: u32,
    },
    Proportional {
        #[serde(default)]
        min_rpm: u32,
        percent: u32,
    },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControllerCfg {
    /// Proportional gain, Q15 (32767 ~ 1.0)
    pub kp_q15: i32,
    /// Integral gain, Q15 per second
    pub ki_q15: i32,
    /// Feedforward in control units per rpm of reference; 0 disables
    pub feedforward_per_rpm: i32,
    pub deadband_rpm: u32,
    /// Error that normalizes to 1.0
    pub full_scale_rpm: i32,
    /// Integrator bound in control units; defaults to full scale
    pub integrator_clamp: Option<i64>,
    /// Max output change per update in control units; absent disables
    pub slew_max_step: Option<u32>,
    pub integration_window: IntegrationWindowCfg,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            kp_q15: 4000,
            ki_q15: 300,
            feedforward_per_rpm: 100_000,
            deadband_rpm: 30,
            full_scale_rpm: 4000,
            integrator_clamp: None,
            slew_max_step: None,
            integration_window: IntegrationWindowCfg::Always,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EstimatorCfg {
    /// Ring buffer slots
    pub capacity: usize,
    /// Target averaging window (ms)
    pub window_ms: u32,
    /// IIR smoothing shift; 0 disables
    pub smoothing_shift: u32,
    /// Encoder pulses per revolution, per channel
    pub ppr: u32,
    /// Counts per pulse (4 for quadrature x4)
    pub quadrature: u32,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            capacity: 32,
            window_ms: 90,
            smoothing_shift: 3,
            ppr: 512,
            quadrature: 4,
        }
    }
}

impl EstimatorCfg {
    /// Encoder counts per mechanical revolution.
    pub fn counts_per_rev(&self) -> u32 {
        self.ppr.saturating_mul(self.quadrature)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleCfg {
    /// Control period (ms)
    pub period_ms: u32,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self { period_ms: 10 }
    }
}

/// Velocity setpoint source.
///
/// TOML: `[reference]` with `kind = "square" | "constant" | "profile"`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReferenceCfg {
    /// Reverses the sign of `amplitude_rpm` on every multiple of `half_period_ms`.
    Square {
        amplitude_rpm: i32,
        half_period_ms: u32,
    },
    Constant {
        rpm: i32,
    },
    /// Piecewise-constant profile from a `t_ms,rpm` CSV file.
    Profile {
        csv: String,
    },
}

impl Default for ReferenceCfg {
    fn default() -> Self {
        ReferenceCfg::Square {
            amplitude_rpm: 2000,
            half_period_ms: 4000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ActuatorCfg {
    /// PWM timer auto-reload value; the counter period is `timer_arr + 1`
    pub timer_arr: u32,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self { timer_arr: 999 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Shaft speed the simulated rig reaches at 100% duty
    pub rpm_at_full_duty: u32,
    /// Initial raw counter value
    pub initial_count: i16,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            rpm_at_full_duty: 3000,
            initial_count: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerCfg,
    pub estimator: EstimatorCfg,
    pub schedule: ScheduleCfg,
    pub reference: ReferenceCfg,
    pub actuator: ActuatorCfg,
    pub sim: SimCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Load a reference profile. Rows must have strictly increasing `t_ms`.
pub fn load_reference_csv(path: &std::path::Path) -> eyre::Result<Vec<ProfileRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open reference CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "rpm"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "reference CSV must have headers 't_ms,rpm', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<ProfileRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<ProfileRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if let Some(prev) = rows.last()
            && row.t_ms <= prev.t_ms
        {
            eyre::bail!(
                "reference CSV t_ms must be strictly increasing (row {}: {} after {})",
                idx + 2,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("reference CSV has no rows");
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Controller
        let c = &self.controller;
        if !(0..=32_767).contains(&c.kp_q15) {
            eyre::bail!("controller.kp_q15 must be in [0, 32767]");
        }
        if !(0..=32_767).contains(&c.ki_q15) {
            eyre::bail!("controller.ki_q15 must be in [0, 32767]");
        }
        if c.full_scale_rpm <= 0 {
            eyre::bail!("controller.full_scale_rpm must be > 0");
        }
        if let Some(clamp) = c.integrator_clamp
            && !(0..=CTRL_MAX).contains(&clamp)
        {
            eyre::bail!("controller.integrator_clamp must be in [0, {CTRL_MAX}]");
        }
        if c.slew_max_step == Some(0) {
            eyre::bail!("controller.slew_max_step must be > 0 when set");
        }
        if let IntegrationWindowCfg::Proportional { percent, .. } = c.integration_window
            && percent == 0
        {
            eyre::bail!("controller.integration_window.percent must be > 0");
        }

        // Estimator
        let e = &self.estimator;
        if e.capacity == 0 || e.capacity > 4096 {
            eyre::bail!("estimator.capacity must be in [1, 4096]");
        }
        if e.window_ms == 0 {
            eyre::bail!("estimator.window_ms must be > 0");
        }
        if e.smoothing_shift > 15 {
            eyre::bail!("estimator.smoothing_shift must be <= 15");
        }
        if e.ppr == 0 || e.quadrature == 0 {
            eyre::bail!("estimator.ppr and estimator.quadrature must be > 0");
        }

        // Schedule
        if self.schedule.period_ms == 0 {
            eyre::bail!("schedule.period_ms must be > 0");
        }
        let span = (e.capacity as u64).saturating_mul(u64::from(self.schedule.period_ms));
        if span < u64::from(e.window_ms) {
            eyre::bail!("estimator.capacity * schedule.period_ms must be >= estimator.window_ms");
        }

        // Reference
        match &self.reference {
            ReferenceCfg::Square { half_period_ms, .. } => {
                if *half_period_ms == 0 {
                    eyre::bail!("reference.half_period_ms must be > 0");
                }
                if half_period_ms % self.schedule.period_ms != 0 {
                    eyre::bail!("reference.half_period_ms must be a multiple of schedule.period_ms");
                }
            }
            ReferenceCfg::Constant { .. } => {}
            ReferenceCfg::Profile { csv } => {
                if csv.trim().is_empty() {
                    eyre::bail!("reference.csv must not be empty");
                }
            }
        }

        // Actuator
        if self.actuator.timer_arr == 0 {
            eyre::bail!("actuator.timer_arr must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

//! Rolling-window velocity estimator for a wrapping 16-bit encoder counter.
//!
//! Each update stores `(delta_count, delta_time)` in a fixed ring buffer, trims the
//! oldest samples until the summed time is back at the target window, computes
//! `v = sum_dx * ticks_per_minute / (counts_per_rev * sum_dt)` and smooths it with a
//! shift-based first-order IIR. The result is in integer rpm.

use crate::config::EstimatorCfg;
use crate::error::Result;
use crate::fixed_point::{saturate_i32, wrapping_count_delta, wrapping_dt};

/// One buffered sample. `dt` saturates at `u16::MAX` ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Sample {
    dx: i16,
    dt: u16,
}

pub struct VelocityEstimator {
    cfg: EstimatorCfg,
    primed: bool,
    previous_count: i16,
    previous_tick: u32,
    samples: Vec<Sample>,
    write_idx: usize,
    filled: usize,
    sum_dx: i64,
    sum_dt: u64,
    filtered: i32,
}

impl core::fmt::Debug for VelocityEstimator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VelocityEstimator")
            .field("filled", &self.filled)
            .field("sum_dx", &self.sum_dx)
            .field("sum_dt", &self.sum_dt)
            .field("filtered", &self.filtered)
            .finish()
    }
}

impl VelocityEstimator {
    /// Validate `cfg` and allocate the ring buffer. No allocation happens after this.
    pub fn new(cfg: EstimatorCfg) -> Result<Self> {
        cfg.validate()?;
        let samples = vec![Sample::default(); cfg.capacity];
        Ok(Self {
            cfg,
            primed: false,
            previous_count: 0,
            previous_tick: 0,
            samples,
            write_idx: 0,
            filled: 0,
            sum_dx: 0,
            sum_dt: 0,
            filtered: 0,
        })
    }

    pub fn config(&self) -> &EstimatorCfg {
        &self.cfg
    }

    /// Smoothed velocity returned by the last update, rpm.
    pub fn filtered(&self) -> i32 {
        self.filtered
    }

    /// Number of ring slots currently holding data.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// `(sum of count deltas, sum of time deltas)` over the filled slots.
    pub fn window_sums(&self) -> (i64, u64) {
        (self.sum_dx, self.sum_dt)
    }

    /// Zero all state; the next update re-primes and returns 0.
    pub fn reset(&mut self) {
        self.primed = false;
        self.previous_count = 0;
        self.previous_tick = 0;
        self.clear_window();
        self.filtered = 0;
    }

    fn clear_window(&mut self) {
        self.samples.fill(Sample::default());
        self.write_idx = 0;
        self.filled = 0;
        self.sum_dx = 0;
        self.sum_dt = 0;
    }

    /// Feed one counter reading taken at `timestamp` and return the smoothed rpm.
    ///
    /// The counter is only read, never written. A repeated timestamp returns the
    /// previous estimate without touching the window.
    pub fn update(&mut self, raw_counter: i16, timestamp: u32) -> i32 {
        if !self.primed {
            self.previous_count = raw_counter;
            self.previous_tick = timestamp;
            self.clear_window();
            self.filtered = 0;
            self.primed = true;
            return 0;
        }

        let dt = wrapping_dt(timestamp, self.previous_tick);
        self.previous_tick = timestamp;
        if dt == 0 {
            return self.filtered;
        }

        let dx = wrapping_count_delta(raw_counter, self.previous_count);
        self.previous_count = raw_counter;

        let cap = self.samples.len();
        self.evict(self.write_idx);
        let sample = Sample {
            dx,
            dt: u16::try_from(dt).unwrap_or(u16::MAX),
        };
        self.samples[self.write_idx] = sample;
        self.sum_dx += i64::from(sample.dx);
        self.sum_dt += u64::from(sample.dt);
        self.write_idx = (self.write_idx + 1) % cap;
        if self.filled < cap {
            self.filled += 1;
        }

        let window = u64::from(self.cfg.window_ms);
        while self.sum_dt > window && self.filled > 1 {
            let oldest = (self.write_idx + cap - self.filled) % cap;
            self.evict(oldest);
            self.filled -= 1;
        }

        if self.sum_dt == 0 {
            return self.filtered;
        }

        let num = i128::from(self.sum_dx) * i128::from(self.cfg.time_units_per_minute());
        let den = i128::from(self.cfg.counts_per_rev) * i128::from(self.sum_dt);
        // Truncating division, v = K * dx / dt.
        let rpm = (num / den).clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32;

        let step = (i64::from(rpm) - i64::from(self.filtered)) >> self.cfg.smoothing_shift;
        self.filtered = saturate_i32(i64::from(self.filtered) + step);
        tracing::trace!(
            dx,
            dt,
            filled = self.filled,
            sum_dx = self.sum_dx,
            sum_dt = self.sum_dt,
            rpm,
            filtered = self.filtered,
            "velocity update"
        );
        self.filtered
    }

    /// Remove slot `idx` from the running sums and zero it.
    #[inline]
    fn evict(&mut self, idx: usize) {
        let old = self.samples[idx];
        self.sum_dx -= i64::from(old.dx);
        self.sum_dt -= u64::from(old.dt);
        self.samples[idx] = Sample::default();
    }

    #[cfg(test)]
    fn sums_match_buffer(&self) -> bool {
        let dx: i64 = self.samples.iter().map(|s| i64::from(s.dx)).sum();
        let dt: u64 = self.samples.iter().map(|s| u64::from(s.dt)).sum();
        dx == self.sum_dx && dt == self.sum_dt
    }
}

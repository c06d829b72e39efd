//! Velocity setpoint generators.

use spinloop_traits::ReferenceSource;

/// Fixed setpoint.
#[derive(Debug, Clone, Copy)]
pub struct ConstantReference(pub i32);

impl ReferenceSource for ConstantReference {
    fn reference_at(&mut self, _now_ms: u32) -> i32 {
        self.0
    }
}

/// Direction-reversal policy: starts at `+amplitude` and negates on every tick after
/// 0 that lands on a multiple of `half_period_ms`.
///
/// Ticks that are skipped over never flip the sign, so the caller should query on
/// every control tick with a period that divides `half_period_ms`.
#[derive(Debug, Clone)]
pub struct SquareWaveReference {
    half_period_ms: u32,
    current: i32,
    last_flip: Option<u32>,
}

impl SquareWaveReference {
    pub fn new(amplitude_rpm: i32, half_period_ms: u32) -> Self {
        Self {
            half_period_ms: half_period_ms.max(1),
            current: amplitude_rpm,
            last_flip: Some(0),
        }
    }
}

impl ReferenceSource for SquareWaveReference {
    fn reference_at(&mut self, now_ms: u32) -> i32 {
        if now_ms.is_multiple_of(self.half_period_ms) && self.last_flip != Some(now_ms) {
            self.current = self.current.saturating_neg();
            self.last_flip = Some(now_ms);
            tracing::debug!(now_ms, reference = self.current, "reference reversed");
        }
        self.current
    }
}

/// Piecewise-constant schedule of `(t_ms, rpm)` points, sorted by time.
///
/// Before the first point the setpoint is 0; after the last it holds the last value.
#[derive(Debug, Clone)]
pub struct ProfileReference {
    points: Vec<(u32, i32)>,
}

impl ProfileReference {
    pub fn new(mut points: Vec<(u32, i32)>) -> Self {
        points.sort_by_key(|p| p.0);
        Self { points }
    }

    pub fn points(&self) -> &[(u32, i32)] {
        &self.points
    }
}

impl ReferenceSource for ProfileReference {
    fn reference_at(&mut self, now_ms: u32) -> i32 {
        let idx = self.points.partition_point(|p| p.0 <= now_ms);
        if idx == 0 { 0 } else { self.points[idx - 1].1 }
    }
}

//! Observer/physical resynchronization loop.
//!
//! The physical state (PS) random-walks on the unit sphere. The observer
//! state (OS) stays put until the update signal crosses the threshold, then
//! snaps toward PS, paying energy and leaving a scar where it happened.

use std::collections::VecDeque;

use contracts::{
    finite_or, RecalibrationConfig, RecalibrationSnapshot, ScarPosition, UtilityStrategyKind,
};
use rand::rngs::StdRng;
use tracing::debug;

use crate::energy::EnergyLedger;
use crate::memory::{random_sphere_position, SpatialMemoryStore};
use crate::rng::{stream_rng, symmetric, STREAM_RECALIBRATION};
use crate::utility::{SignalContext, UtilityEngine, UtilityOutput};

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm(v: Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Project onto the unit sphere; degenerate vectors keep `fallback`.
fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let length = norm(v);
    if !length.is_finite() || length <= f64::EPSILON {
        return fallback;
    }
    [v[0] / length, v[1] / length, v[2] / length]
}

/// Chord distance halved, so antipodal points are 1 apart.
fn sphere_error(a: Vec3, b: Vec3) -> f64 {
    (norm(sub(a, b)) / 2.0).clamp(0.0, 1.0)
}

fn sphere_point(position: ScarPosition) -> Vec3 {
    match position {
        ScarPosition::Sphere { x, y, z } => [x, y, z],
        ScarPosition::Cell { .. } => [0.0, 0.0, 1.0],
    }
}

fn population_variance(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecalibrationReport {
    pub tick: u64,
    pub output: UtilityOutput,
    /// A recalibration event fired this tick.
    pub fired: bool,
    pub error_before: f64,
    pub error_after: f64,
    pub energy_level: f64,
    pub scar_count: usize,
}

#[derive(Debug, Clone)]
pub struct Recalibrator {
    config: RecalibrationConfig,
    seed: u64,
    rng: StdRng,
    physical: Vec3,
    observer: Vec3,
    ledger: EnergyLedger,
    utility: UtilityEngine,
    scars: SpatialMemoryStore,
    error_history: VecDeque<f64>,
    delta_history: VecDeque<f64>,
    last_report: Option<RecalibrationReport>,
    recalibration_count: u64,
    tick: u64,
    elapsed: f64,
}

impl Recalibrator {
    pub fn new(config: RecalibrationConfig, seed: u64) -> Self {
        let config = config.normalized();
        let mut rng = stream_rng(seed, STREAM_RECALIBRATION);
        let start = sphere_point(random_sphere_position(&mut rng));
        Self {
            ledger: EnergyLedger::new(config.energy),
            utility: UtilityEngine::new(config.utility),
            scars: SpatialMemoryStore::new(config.memory),
            error_history: VecDeque::with_capacity(config.history_len),
            delta_history: VecDeque::with_capacity(config.history_len),
            config,
            seed,
            rng,
            physical: start,
            observer: start,
            last_report: None,
            recalibration_count: 0,
            tick: 0,
            elapsed: 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config, self.seed);
    }

    pub fn config(&self) -> &RecalibrationConfig {
        &self.config
    }

    pub fn ledger(&self) -> &EnergyLedger {
        &self.ledger
    }

    pub fn scars(&self) -> &SpatialMemoryStore {
        &self.scars
    }

    pub fn utility(&self) -> &UtilityEngine {
        &self.utility
    }

    pub fn physical(&self) -> [f64; 3] {
        self.physical
    }

    pub fn observer(&self) -> [f64; 3] {
        self.observer
    }

    pub fn prediction_error(&self) -> f64 {
        sphere_error(self.physical, self.observer)
    }

    pub fn last_report(&self) -> Option<&RecalibrationReport> {
        self.last_report.as_ref()
    }

    pub fn recalibration_count(&self) -> u64 {
        self.recalibration_count
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Mean |utility delta| over the recent window; 0 before the first tick.
    pub fn mean_abs_delta(&self) -> f64 {
        if self.delta_history.is_empty() {
            return 0.0;
        }
        self.delta_history.iter().map(|d| d.abs()).sum::<f64>() / self.delta_history.len() as f64
    }

    /// Replace the physical state, e.g. to inject a disturbance.
    pub fn set_physical(&mut self, point: [f64; 3]) {
        self.physical = normalize_or(point, self.physical);
    }

    pub fn step(&mut self, dt: f64) -> RecalibrationReport {
        let dt = finite_or(dt, 0.0).max(0.0);
        self.tick = self.tick.saturating_add(1);
        self.elapsed += dt;

        let previous = self.physical;
        let amplitude = self.config.drift_step * dt;
        let drifted = [
            previous[0] + symmetric(&mut self.rng, amplitude),
            previous[1] + symmetric(&mut self.rng, amplitude),
            previous[2] + symmetric(&mut self.rng, amplitude),
        ];
        self.physical = normalize_or(drifted, previous);

        let error_before = self.prediction_error();
        let context = SignalContext {
            prediction_error: error_before,
            magnitude: sphere_error(self.physical, previous),
            variance: population_variance(&self.error_history),
            energy_fraction: self.ledger.fraction(),
            recursive_activity: self
                .last_report
                .map_or(0.0, |report| report.output.delta.abs()),
            external_influx: self.budget_influx(dt),
            dt,
        };
        let output = self.utility.evaluate(&context);
        push_bounded(&mut self.error_history, error_before, self.config.history_len);
        push_bounded(&mut self.delta_history, output.delta, self.config.history_len);

        let fired = output.utility > self.config.update_threshold && !self.ledger.is_depleted();
        if fired {
            self.recalibrate(error_before, &output);
        }
        let error_after = self.prediction_error();

        self.ledger.passive_decay();
        self.ledger.replenish(self.config.regen_rate * dt);
        self.scars.tick(dt);

        let report = RecalibrationReport {
            tick: self.tick,
            output,
            fired,
            error_before,
            error_after,
            energy_level: self.ledger.level(),
            scar_count: self.scars.len(),
        };
        self.last_report = Some(report);
        report
    }

    /// Ledger regeneration for `dt`, rescaled from ledger units to the
    /// product-form budget.
    fn budget_influx(&self, dt: f64) -> f64 {
        let regen_fraction = self.config.regen_rate * dt / self.ledger.capacity();
        finite_or(regen_fraction * self.config.utility.budget_capacity, 0.0)
    }

    fn recalibrate(&mut self, error_before: f64, output: &UtilityOutput) {
        let snap = self.config.snap_rate;
        let moved = [
            self.observer[0] + snap * (self.physical[0] - self.observer[0]),
            self.observer[1] + snap * (self.physical[1] - self.observer[1]),
            self.observer[2] + snap * (self.physical[2] - self.observer[2]),
        ];
        self.observer = normalize_or(moved, self.observer);
        let residual = self.prediction_error();

        self.ledger.consume(self.config.correction_cost * error_before);
        self.ledger.reward(1.0 - residual, 1.0);
        let [x, y, z] = self.physical;
        self.scars
            .add_or_reinforce(ScarPosition::sphere(x, y, z), error_before);
        self.recalibration_count = self.recalibration_count.saturating_add(1);

        debug!(
            tick = self.tick,
            utility = output.utility,
            driver = %output.dominant_driver,
            error_before,
            residual,
            energy = self.ledger.level(),
            "observer recalibrated"
        );
    }

    pub fn snapshot(&self) -> RecalibrationSnapshot {
        let (utility, utility_delta, dominant_driver, recalibrated) = match &self.last_report {
            Some(report) => (
                report.output.utility,
                report.output.delta,
                report.output.dominant_driver,
                report.fired,
            ),
            None => (0.0, 0.0, contracts::Driver::PredictionError, false),
        };
        RecalibrationSnapshot {
            tick: self.tick,
            elapsed: self.elapsed,
            strategy: self.strategy(),
            observer: self.observer,
            physical: self.physical,
            prediction_error: self.prediction_error(),
            utility,
            utility_delta,
            dominant_driver,
            recalibrated,
            recalibration_count: self.recalibration_count,
            ledger: self.ledger.snapshot(),
            scars: self.scars.snapshot(),
        }
    }

    pub fn strategy(&self) -> UtilityStrategyKind {
        self.utility.kind()
    }
}

fn push_bounded(buffer: &mut VecDeque<f64>, value: f64, cap: usize) {
    if buffer.len() >= cap {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::UtilityStrategy;
    use contracts::UtilityConfig;

    fn quiet_config() -> RecalibrationConfig {
        RecalibrationConfig {
            drift_step: 0.0,
            ..RecalibrationConfig::default()
        }
    }

    #[test]
    fn starts_synchronized() {
        let recalibrator = Recalibrator::new(RecalibrationConfig::default(), 4);
        assert_eq!(recalibrator.prediction_error(), 0.0);
        assert_eq!(recalibrator.ledger().level(), 100.0);
        assert!(recalibrator.last_report().is_none());
    }

    #[test]
    fn large_disturbance_triggers_full_snap() {
        let mut recalibrator = Recalibrator::new(quiet_config(), 4);
        let [x, y, z] = recalibrator.physical();
        recalibrator.set_physical([-x, -y, -z]);

        let report = recalibrator.step(1.0);
        assert!(report.fired);
        assert!((report.error_before - 1.0).abs() < 1e-9);
        assert!(report.error_after < 1e-9);
        assert_eq!(recalibrator.recalibration_count(), 1);
        assert_eq!(report.scar_count, 1);
        // 100 - 10 + 1.0 (capped) - 0.01 + 0.5 (capped)
        assert!(recalibrator.ledger().accumulated_cost() >= 10.0 - 1e-9);
        assert!(report.energy_level <= 100.0);
    }

    #[test]
    fn small_error_does_not_fire() {
        let mut recalibrator = Recalibrator::new(
            RecalibrationConfig {
                update_threshold: 0.9,
                ..quiet_config()
            },
            4,
        );
        let report = recalibrator.step(1.0);
        assert!(!report.fired);
        assert_eq!(recalibrator.recalibration_count(), 0);
        assert!(recalibrator.scars().is_empty());
    }

    #[test]
    fn depleted_ledger_blocks_recalibration() {
        let mut recalibrator = Recalibrator::new(
            RecalibrationConfig {
                regen_rate: 0.0,
                ..quiet_config()
            },
            4,
        );
        recalibrator.ledger.set(0.0);
        let [x, y, z] = recalibrator.physical();
        recalibrator.set_physical([-x, -y, -z]);
        let report = recalibrator.step(1.0);
        assert!(!report.fired);
        assert!((report.error_after - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_snap_leaves_residual() {
        let mut recalibrator = Recalibrator::new(
            RecalibrationConfig {
                snap_rate: 0.5,
                ..quiet_config()
            },
            9,
        );
        let [x, y, z] = recalibrator.physical();
        // a quarter turn away
        let orthogonal = if x.abs() < 0.9 { [0.0, z, -y] } else { [y, -x, 0.0] };
        recalibrator.set_physical(orthogonal);
        let report = recalibrator.step(1.0);
        assert!(report.fired);
        assert!(report.error_after > 0.0);
        assert!(report.error_after < report.error_before);
    }

    #[test]
    fn product_strategy_runs_through_same_loop() {
        let mut config = quiet_config();
        config.utility = UtilityConfig {
            strategy: UtilityStrategyKind::SalienceProduct,
            ..UtilityConfig::default()
        };
        config.update_threshold = 0.1;
        let mut recalibrator = Recalibrator::new(config, 2);
        assert_eq!(recalibrator.strategy(), UtilityStrategyKind::SalienceProduct);
        let [x, y, z] = recalibrator.physical();
        recalibrator.set_physical([-x, -y, -z]);
        let report = recalibrator.step(1.0);
        // salience 0 with no motion and no variance history
        assert_eq!(report.output.utility, 0.0);
        assert!(!report.fired);
    }

    fn product_budget(recalibrator: &Recalibrator) -> f64 {
        match recalibrator.utility().strategy() {
            UtilityStrategy::SalienceProduct(engine) => engine.budget(),
            UtilityStrategy::WeightedSum(_) => panic!("expected the product strategy"),
        }
    }

    fn drifting_product_config(regen_rate: f64) -> RecalibrationConfig {
        let mut config = RecalibrationConfig {
            drift_step: 0.3,
            update_threshold: 0.02,
            regen_rate,
            ..RecalibrationConfig::default()
        };
        config.utility = UtilityConfig {
            strategy: UtilityStrategyKind::SalienceProduct,
            ..UtilityConfig::default()
        };
        config
    }

    #[test]
    fn product_budget_is_refilled_by_ledger_regeneration() {
        let mut recalibrator = Recalibrator::new(drifting_product_config(0.5), 11);
        for _ in 0..4000 {
            recalibrator.step(1.0);
            // each tick adds 0.5 / 100 of the budget capacity after draining
            // at most half of what was there
            assert!(product_budget(&recalibrator) >= 0.005 - 1e-12);
        }
    }

    #[test]
    fn product_strategy_keeps_firing_late_in_a_long_run() {
        let mut recalibrator = Recalibrator::new(drifting_product_config(20.0), 11);
        let mut early = 0;
        let mut late = 0;
        for tick in 0..4000 {
            if recalibrator.step(1.0).fired {
                if tick < 1000 {
                    early += 1;
                } else if tick >= 3000 {
                    late += 1;
                }
            }
        }
        assert!(early > 0);
        assert!(late > 0);
        assert_eq!(product_budget(&recalibrator), 1.0);
        assert!(!recalibrator.ledger().is_depleted());
    }

    #[test]
    fn reset_reproduces_the_walk() {
        let mut recalibrator = Recalibrator::new(RecalibrationConfig::default(), 77);
        let first = (0..50).map(|_| recalibrator.step(0.5)).collect::<Vec<_>>();
        recalibrator.reset();
        assert_eq!(recalibrator.tick(), 0);
        let second = (0..50).map(|_| recalibrator.step(0.5)).collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(recalibrator.snapshot().tick, 50);
    }

    #[test]
    fn non_finite_dt_is_treated_as_zero() {
        let mut recalibrator = Recalibrator::new(RecalibrationConfig::default(), 1);
        let report = recalibrator.step(f64::NAN);
        assert_eq!(recalibrator.elapsed(), 0.0);
        assert_eq!(report.error_before, 0.0);
    }
}

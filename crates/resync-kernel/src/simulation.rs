//! The single owner of every subsystem. Presentation code holds a
//! `Simulation`, calls `step`, and reads snapshots or accessors; nothing is
//! shared globally.

use std::collections::BTreeMap;

use contracts::{finite_or, SimulationConfig, SimulationSnapshot, SCHEMA_VERSION_V1};
use tracing::{info, warn};

use crate::arena::AgentArena;
use crate::network::ConfirmationNetwork;
use crate::recalibration::Recalibrator;
use crate::thresholds::{assess, CoherenceMetrics, MetricsUpdate, ThresholdAssessment, ThresholdProfile};

/// Scars at or above this intensity count toward memory integrity.
const INTEGRITY_INTENSITY: f64 = 0.5;

#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    recalibrator: Recalibrator,
    arena: AgentArena,
    network: ConfirmationNetwork,
    tick: u64,
    elapsed: f64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        let normalized = config.normalized();
        if normalized != config {
            warn!(
                run_id = %config.run_id,
                "configuration values out of range were clamped"
            );
        }
        if normalized.schema_version != SCHEMA_VERSION_V1 {
            warn!(
                schema_version = %normalized.schema_version,
                expected = SCHEMA_VERSION_V1,
                "unexpected configuration schema version"
            );
        }
        let seed = normalized.seed;
        Self {
            recalibrator: Recalibrator::new(normalized.recalibration, seed),
            arena: AgentArena::new(normalized.arena, seed),
            network: ConfirmationNetwork::new(normalized.network, seed),
            config: normalized,
            tick: 0,
            elapsed: 0.0,
        }
    }

    pub fn from_env() -> Self {
        Self::new(SimulationConfig::from_env())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn recalibrator(&self) -> &Recalibrator {
        &self.recalibrator
    }

    pub fn arena(&self) -> &AgentArena {
        &self.arena
    }

    pub fn network(&self) -> &ConfirmationNetwork {
        &self.network
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance every enabled subsystem once. The arena and network take one
    /// discrete step per call; `dt` only drives the recalibration loop.
    pub fn step(&mut self, dt: f64) -> SimulationSnapshot {
        let dt = finite_or(dt, 0.0).max(0.0);
        self.tick = self.tick.saturating_add(1);
        self.elapsed += dt;
        let systems = self.config.systems;
        if systems.recalibration {
            self.recalibrator.step(dt);
        }
        if systems.arena {
            self.arena.step();
        }
        if systems.network {
            self.network.step();
        }
        self.snapshot()
    }

    pub fn step_n(&mut self, n: u64, dt: f64) -> SimulationSnapshot {
        for _ in 0..n {
            self.step(dt);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        let systems = self.config.systems;
        SimulationSnapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: self.config.run_id.clone(),
            tick: self.tick,
            elapsed: self.elapsed,
            recalibration: systems.recalibration.then(|| self.recalibrator.snapshot()),
            arena: systems.arena.then(|| self.arena.snapshot()),
            network: systems.network.then(|| self.network.snapshot()),
        }
    }

    /// Rebuild everything from the stored configuration.
    pub fn reset(&mut self) {
        self.recalibrator.reset();
        self.arena.reset();
        self.network.reset();
        self.tick = 0;
        self.elapsed = 0.0;
        info!(run_id = %self.config.run_id, seed = self.config.seed, "simulation reset");
    }

    /// Metrics derived from the enabled subsystems.
    pub fn coherence_metrics(&self) -> CoherenceMetrics {
        let systems = self.config.systems;
        let recalibration_error = self.recalibrator.prediction_error();
        let gap = if systems.network {
            self.network.mean_belief_error()
        } else {
            recalibration_error
        };

        let mut domains = BTreeMap::new();
        if systems.recalibration {
            domains.insert("recalibration".to_string(), 1.0 - recalibration_error);
        }
        if systems.arena {
            domains.insert("arena".to_string(), self.arena.active_fraction());
        }
        if systems.network {
            domains.insert("network".to_string(), self.network.confirming_fraction());
        }

        let recursive_modeling = if self.recalibrator.last_report().is_some() {
            1.0 - self.recalibrator.mean_abs_delta()
        } else {
            0.0
        };

        let mut metrics = CoherenceMetrics::default();
        metrics.update_metrics(MetricsUpdate {
            global_coherence_gap: Some(gap),
            recursive_modeling_score: Some(recursive_modeling),
            memory_integrity_score: Some(self.recalibrator.scars().integrity(INTEGRITY_INTENSITY)),
            domain_stabilization: domains,
        });
        metrics
    }

    pub fn assess(&self, profile: &ThresholdProfile) -> ThresholdAssessment {
        assess(&self.coherence_metrics(), profile)
    }
}

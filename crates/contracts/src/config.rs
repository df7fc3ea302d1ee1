//! Configuration records. Every numeric field has a documented range; an
//! out-of-range or non-finite value is clamped by `normalized()` instead of
//! being rejected, so a bad slider value downgrades to the nearest valid one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{clamp_finite, seed_serde, DecayCurve, UtilityStrategyKind, SCHEMA_VERSION_V1};

pub const CONFIG_PATH_ENV: &str = "RESYNC_CONFIG";
pub const SEED_ENV: &str = "RESYNC_SEED";

fn clamp_usize(value: usize, min: usize, max: usize) -> usize {
    value.clamp(min, max)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub schema_version: String,
    pub run_id: String,
    #[serde(with = "seed_serde")]
    pub seed: u64,
    pub systems: SystemToggles,
    pub recalibration: RecalibrationConfig,
    pub arena: ArenaConfig,
    pub network: NetworkConfig,
    pub notes: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_local_001".to_string(),
            seed: 1337,
            systems: SystemToggles::default(),
            recalibration: RecalibrationConfig::default(),
            arena: ArenaConfig::default(),
            network: NetworkConfig::default(),
            notes: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults, overlaid with the JSON file named by `RESYNC_CONFIG` and the
    /// seed in `RESYNC_SEED`. Anything unreadable is ignored.
    pub fn from_env() -> Self {
        let mut config = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|path| !path.trim().is_empty())
            .and_then(|path| Self::load(path).ok())
            .unwrap_or_default();
        if let Some(seed) = std::env::var(SEED_ENV)
            .ok()
            .and_then(|raw| seed_serde::parse_seed(&raw).ok())
        {
            config.seed = seed;
        }
        config
    }

    pub fn normalized(&self) -> Self {
        Self {
            schema_version: self.schema_version.clone(),
            run_id: self.run_id.clone(),
            seed: self.seed,
            systems: self.systems,
            recalibration: self.recalibration.normalized(),
            arena: self.arena.normalized(),
            network: self.network.normalized(),
            notes: self.notes.clone(),
        }
    }

    pub fn is_normalized(&self) -> bool {
        *self == self.normalized()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SystemToggles {
    pub recalibration: bool,
    pub arena: bool,
    pub network: bool,
}

impl Default for SystemToggles {
    fn default() -> Self {
        Self {
            recalibration: true,
            arena: true,
            network: true,
        }
    }
}

/// Bounded resource ledger parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnergyConfig {
    /// Maximum level, [1, 1_000_000].
    pub capacity: f64,
    /// Passive drain per `passive_decay` call, [0, capacity].
    pub decay_rate: f64,
    /// Fixed part of a reward, [0, capacity].
    pub reward_base: f64,
    /// Fit-weighted part of a reward, [0, capacity].
    pub reward_weight: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            decay_rate: 0.01,
            reward_base: 0.3,
            reward_weight: 0.7,
        }
    }
}

impl EnergyConfig {
    pub fn with_capacity(capacity: f64) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let capacity = clamp_finite(self.capacity, 1.0, 1_000_000.0, defaults.capacity);
        Self {
            capacity,
            decay_rate: clamp_finite(self.decay_rate, 0.0, capacity, defaults.decay_rate),
            reward_base: clamp_finite(self.reward_base, 0.0, capacity, defaults.reward_base),
            reward_weight: clamp_finite(self.reward_weight, 0.0, capacity, defaults.reward_weight),
        }
    }
}

/// Scar store parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    /// [1, 4096]
    pub max_entries: usize,
    /// Touches closer than this merge, [0, 2].
    pub merge_radius: f64,
    /// Intensity lost per unit time, [0, 10].
    pub decay_rate: f64,
    /// Entries at or below this are purged, [0, 0.5].
    pub intensity_floor: f64,
    /// Reinforcement cap, (0, 1].
    pub max_intensity: f64,
    pub decay_curve: DecayCurve,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 64,
            merge_radius: 0.15,
            decay_rate: 0.05,
            intensity_floor: 0.01,
            max_intensity: 1.0,
            decay_curve: DecayCurve::Linear,
        }
    }
}

impl MemoryConfig {
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        Self {
            max_entries: clamp_usize(self.max_entries, 1, 4096),
            merge_radius: clamp_finite(self.merge_radius, 0.0, 2.0, defaults.merge_radius),
            decay_rate: clamp_finite(self.decay_rate, 0.0, 10.0, defaults.decay_rate),
            intensity_floor: clamp_finite(self.intensity_floor, 0.0, 0.5, defaults.intensity_floor),
            max_intensity: clamp_finite(self.max_intensity, 0.001, 1.0, defaults.max_intensity),
            decay_curve: self.decay_curve,
        }
    }
}

/// Weights of the weighted-sum utility. Each is clamped to [0, 10].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UtilityWeights {
    pub prediction_error: f64,
    pub salience: f64,
    pub energy: f64,
    pub recursive_activity: f64,
}

impl Default for UtilityWeights {
    fn default() -> Self {
        Self {
            prediction_error: 0.4,
            salience: 0.3,
            energy: 0.2,
            recursive_activity: 0.1,
        }
    }
}

impl UtilityWeights {
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        Self {
            prediction_error: clamp_finite(
                self.prediction_error,
                0.0,
                10.0,
                defaults.prediction_error,
            ),
            salience: clamp_finite(self.salience, 0.0, 10.0, defaults.salience),
            energy: clamp_finite(self.energy, 0.0, 10.0, defaults.energy),
            recursive_activity: clamp_finite(
                self.recursive_activity,
                0.0,
                10.0,
                defaults.recursive_activity,
            ),
        }
    }
}

/// `salience = clamp(baseline + magnitude·m + variance·v, 0, 1)`; each [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SalienceWeights {
    pub baseline: f64,
    pub magnitude: f64,
    pub variance: f64,
}

impl Default for SalienceWeights {
    fn default() -> Self {
        Self {
            baseline: 0.0,
            magnitude: 0.6,
            variance: 0.4,
        }
    }
}

impl SalienceWeights {
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        Self {
            baseline: clamp_finite(self.baseline, 0.0, 1.0, defaults.baseline),
            magnitude: clamp_finite(self.magnitude, 0.0, 1.0, defaults.magnitude),
            variance: clamp_finite(self.variance, 0.0, 1.0, defaults.variance),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UtilityConfig {
    pub strategy: UtilityStrategyKind,
    pub weights: UtilityWeights,
    /// Step size of `update_from_feedback`, [0, 1].
    pub feedback_rate: f64,
    pub salience: SalienceWeights,
    /// Product form: budget ceiling, [0.001, 1000].
    pub budget_capacity: f64,
    /// Product form: budget drained per unit of integrated signal, [0, 100].
    pub budget_gamma: f64,
    /// Product form: prediction error multiplier before clamping, [0, 100].
    pub error_scale: f64,
}

impl Default for UtilityConfig {
    fn default() -> Self {
        Self {
            strategy: UtilityStrategyKind::WeightedSum,
            weights: UtilityWeights::default(),
            feedback_rate: 0.05,
            salience: SalienceWeights::default(),
            budget_capacity: 1.0,
            budget_gamma: 0.5,
            error_scale: 1.0,
        }
    }
}

impl UtilityConfig {
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        Self {
            strategy: self.strategy,
            weights: self.weights.normalized(),
            feedback_rate: clamp_finite(self.feedback_rate, 0.0, 1.0, defaults.feedback_rate),
            salience: self.salience.normalized(),
            budget_capacity: clamp_finite(
                self.budget_capacity,
                0.001,
                1000.0,
                defaults.budget_capacity,
            ),
            budget_gamma: clamp_finite(self.budget_gamma, 0.0, 100.0, defaults.budget_gamma),
            error_scale: clamp_finite(self.error_scale, 0.0, 100.0, defaults.error_scale),
        }
    }
}

/// Observer/physical resynchronization loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecalibrationConfig {
    pub energy: EnergyConfig,
    pub memory: MemoryConfig,
    pub utility: UtilityConfig,
    /// Recalibration fires when utility exceeds this, [0, 1].
    pub update_threshold: f64,
    /// Fraction of the gap closed by one recalibration, [0, 1].
    pub snap_rate: f64,
    /// Energy per unit of prediction error paid on recalibration, [0, capacity].
    pub correction_cost: f64,
    /// Energy regenerated per unit time, [0, capacity].
    pub regen_rate: f64,
    /// Physical random-walk step per unit time, [0, 1].
    pub drift_step: f64,
    /// Prediction errors kept for the variance term, [1, 512].
    pub history_len: usize,
}

impl Default for RecalibrationConfig {
    fn default() -> Self {
        Self {
            energy: EnergyConfig::default(),
            memory: MemoryConfig::default(),
            utility: UtilityConfig::default(),
            update_threshold: 0.35,
            snap_rate: 1.0,
            correction_cost: 10.0,
            regen_rate: 0.5,
            drift_step: 0.05,
            history_len: 32,
        }
    }
}

impl RecalibrationConfig {
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let energy = self.energy.normalized();
        Self {
            energy,
            memory: self.memory.normalized(),
            utility: self.utility.normalized(),
            update_threshold: clamp_finite(
                self.update_threshold,
                0.0,
                1.0,
                defaults.update_threshold,
            ),
            snap_rate: clamp_finite(self.snap_rate, 0.0, 1.0, defaults.snap_rate),
            correction_cost: clamp_finite(
                self.correction_cost,
                0.0,
                energy.capacity,
                defaults.correction_cost,
            ),
            regen_rate: clamp_finite(self.regen_rate, 0.0, energy.capacity, defaults.regen_rate),
            drift_step: clamp_finite(self.drift_step, 0.0, 1.0, defaults.drift_step),
            history_len: clamp_usize(self.history_len, 1, 512),
        }
    }
}

/// Grid world with three competing policies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    /// [3, 128]
    pub width: u16,
    /// [3, 128]
    pub height: u16,
    /// Fraction of cells seeded as Resource, [0, 0.6].
    pub resource_density: f64,
    /// Fraction of cells seeded as Hazard, [0, 0.6].
    pub hazard_density: f64,
    /// Per-agent energy capacity, [1, 10_000].
    pub agent_capacity: f64,
    /// Energy lost by every active agent each step, [0, 100].
    pub base_drain: f64,
    /// [0, 1000]
    pub resource_gain: f64,
    /// [0, 1000]
    pub hazard_penalty: f64,
    /// Recovery on an empty cell, [0, 100].
    pub empty_recovery: f64,
    /// Coherence-gated agents hold when their signal is below this, [0, 1].
    pub gate_threshold: f64,
    /// [0, 1]
    pub value_learning_rate: f64,
    /// [0, 1]
    pub discount: f64,
    /// [0, 1]
    pub epsilon: f64,
    /// [0, 1]
    pub q_learning_rate: f64,
    /// Global ledger cost per gated correction, [0, 1000].
    pub correction_cost: f64,
    /// Threads for the move-scoring phase; 1 scores inline, [1, 32].
    pub scoring_worker_threads: u16,
    pub ledger: EnergyConfig,
    pub scars: MemoryConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 12,
            resource_density: 0.12,
            hazard_density: 0.06,
            agent_capacity: 100.0,
            base_drain: 1.0,
            resource_gain: 15.0,
            hazard_penalty: 20.0,
            empty_recovery: 0.2,
            gate_threshold: 0.03,
            value_learning_rate: 0.2,
            discount: 0.9,
            epsilon: 0.1,
            q_learning_rate: 0.2,
            correction_cost: 1.0,
            scoring_worker_threads: 1,
            ledger: EnergyConfig::default(),
            scars: MemoryConfig {
                merge_radius: 0.5,
                decay_rate: 0.02,
                ..MemoryConfig::default()
            },
        }
    }
}

impl ArenaConfig {
    pub fn normalized(&self) -> Self {
        let d = Self::default();
        let resource_density = clamp_finite(self.resource_density, 0.0, 0.6, d.resource_density);
        let hazard_density = clamp_finite(self.hazard_density, 0.0, 0.6, d.hazard_density);
        Self {
            width: self.width.clamp(3, 128),
            height: self.height.clamp(3, 128),
            resource_density,
            hazard_density,
            agent_capacity: clamp_finite(self.agent_capacity, 1.0, 10_000.0, d.agent_capacity),
            base_drain: clamp_finite(self.base_drain, 0.0, 100.0, d.base_drain),
            resource_gain: clamp_finite(self.resource_gain, 0.0, 1000.0, d.resource_gain),
            hazard_penalty: clamp_finite(self.hazard_penalty, 0.0, 1000.0, d.hazard_penalty),
            empty_recovery: clamp_finite(self.empty_recovery, 0.0, 100.0, d.empty_recovery),
            gate_threshold: clamp_finite(self.gate_threshold, 0.0, 1.0, d.gate_threshold),
            value_learning_rate: clamp_finite(
                self.value_learning_rate,
                0.0,
                1.0,
                d.value_learning_rate,
            ),
            discount: clamp_finite(self.discount, 0.0, 1.0, d.discount),
            epsilon: clamp_finite(self.epsilon, 0.0, 1.0, d.epsilon),
            q_learning_rate: clamp_finite(self.q_learning_rate, 0.0, 1.0, d.q_learning_rate),
            correction_cost: clamp_finite(self.correction_cost, 0.0, 1000.0, d.correction_cost),
            scoring_worker_threads: self.scoring_worker_threads.clamp(1, 32),
            ledger: self.ledger.normalized(),
            scars: self.scars.normalized(),
        }
    }
}

/// Distributed confirmation network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// [2, 64]
    pub node_count: usize,
    /// Fraction of confirming nodes needed for consensus, [0.05, 1].
    pub consensus_threshold: f64,
    /// Prediction error above which a node re-reads the truth, [0, 1].
    pub update_threshold: f64,
    /// Energy paid per individual update, [0, node_capacity].
    pub update_cost: f64,
    /// Share of `update_cost` paid for a group update, [0, 1].
    pub group_cost_fraction: f64,
    /// (0, 100]
    pub node_capacity: f64,
    /// Energy regained per tick, [0, 1].
    pub energy_regen: f64,
    /// Amplitude of uniform observation noise, [0, 0.5].
    pub observation_noise: f64,
    /// Multiplicative confidence loss, [0, 1].
    pub confidence_decay: f64,
    /// Minimum pairwise agreement for an active edge, [0, 1].
    pub agreement_bar: f64,
    /// Minimum endpoint confidence for an active edge, [0, 1].
    pub confidence_bar: f64,
    /// Normalized confirmation a node needs to count as confirming, [0, 1].
    pub confirming_fraction: f64,
    /// Ground-truth random-walk amplitude, [0, 0.5].
    pub truth_step: f64,
    /// Pull of the ground truth toward its target per tick, [0, 1].
    pub truth_pull: f64,
    /// Chance per tick of picking a new target, [0, 1].
    pub retarget_probability: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_count: 5,
            consensus_threshold: 0.6,
            update_threshold: 0.08,
            update_cost: 0.05,
            group_cost_fraction: 0.5,
            node_capacity: 1.0,
            energy_regen: 0.01,
            observation_noise: 0.03,
            confidence_decay: 0.1,
            agreement_bar: 0.85,
            confidence_bar: 0.5,
            confirming_fraction: 0.5,
            truth_step: 0.02,
            truth_pull: 0.05,
            retarget_probability: 0.02,
        }
    }
}

impl NetworkConfig {
    pub fn normalized(&self) -> Self {
        let d = Self::default();
        let node_capacity = clamp_finite(self.node_capacity, 0.001, 100.0, d.node_capacity);
        Self {
            node_count: clamp_usize(self.node_count, 2, 64),
            consensus_threshold: clamp_finite(
                self.consensus_threshold,
                0.05,
                1.0,
                d.consensus_threshold,
            ),
            update_threshold: clamp_finite(self.update_threshold, 0.0, 1.0, d.update_threshold),
            update_cost: clamp_finite(self.update_cost, 0.0, node_capacity, d.update_cost),
            group_cost_fraction: clamp_finite(
                self.group_cost_fraction,
                0.0,
                1.0,
                d.group_cost_fraction,
            ),
            node_capacity,
            energy_regen: clamp_finite(self.energy_regen, 0.0, 1.0, d.energy_regen),
            observation_noise: clamp_finite(self.observation_noise, 0.0, 0.5, d.observation_noise),
            confidence_decay: clamp_finite(self.confidence_decay, 0.0, 1.0, d.confidence_decay),
            agreement_bar: clamp_finite(self.agreement_bar, 0.0, 1.0, d.agreement_bar),
            confidence_bar: clamp_finite(self.confidence_bar, 0.0, 1.0, d.confidence_bar),
            confirming_fraction: clamp_finite(
                self.confirming_fraction,
                0.0,
                1.0,
                d.confirming_fraction,
            ),
            truth_step: clamp_finite(self.truth_step, 0.0, 0.5, d.truth_step),
            truth_pull: clamp_finite(self.truth_pull, 0.0, 1.0, d.truth_pull),
            retarget_probability: clamp_finite(
                self.retarget_probability,
                0.0,
                1.0,
                d.retarget_probability,
            ),
        }
    }
}

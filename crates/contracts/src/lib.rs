//! v1 cross-boundary contracts for the resync kernel and the presentation
//! code that renders it: configuration records, per-tick snapshots, and the
//! small enums both sides agree on.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod seed_serde;
pub mod snapshot;

pub use config::{
    ArenaConfig, EnergyConfig, MemoryConfig, NetworkConfig, RecalibrationConfig,
    SalienceWeights, SimulationConfig, SystemToggles, UtilityConfig, UtilityWeights,
};
pub use error::ConfigError;
pub use snapshot::{
    AgentSnapshot, ArenaSnapshot, EdgeSnapshot, LedgerSnapshot, NetworkSnapshot, NodeSnapshot,
    RecalibrationSnapshot, ScarSnapshot, SimulationSnapshot,
};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Replace NaN and infinities with `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Clamp into `[min, max]`, mapping non-finite input to `fallback`.
pub fn clamp_finite(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    finite_or(value, fallback).clamp(min, max)
}

/// Integer cell coordinate on the arena grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Empty,
    Resource,
    Hazard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    CoherenceGated,
    ValueLearning,
    EpsilonGreedy,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [
        PolicyKind::CoherenceGated,
        PolicyKind::ValueLearning,
        PolicyKind::EpsilonGreedy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoherenceGated => "coherence_gated",
            Self::ValueLearning => "value_learning",
            Self::EpsilonGreedy => "epsilon_greedy",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which utility formulation a caller runs. The two are not algebraically
/// equivalent and are kept side by side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UtilityStrategyKind {
    #[default]
    WeightedSum,
    SalienceProduct,
}

/// The input term that contributed most to a utility score. Explanation only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    PredictionError,
    Salience,
    Energy,
    RecursiveActivity,
}

impl Driver {
    pub fn label(self) -> &'static str {
        match self {
            Self::PredictionError => "prediction_error",
            Self::Salience => "salience",
            Self::Energy => "energy",
            Self::RecursiveActivity => "recursive_activity",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecayCurve {
    #[default]
    Linear,
    Exponential,
}

/// Location of a scar: a point on the unit sphere or an arena cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScarPosition {
    Sphere { x: f64, y: f64, z: f64 },
    Cell { x: i32, y: i32 },
}

impl ScarPosition {
    /// Project onto the unit sphere. A zero or non-finite vector maps to the
    /// north pole.
    pub fn sphere(x: f64, y: f64, z: f64) -> Self {
        let (x, y, z) = (finite_or(x, 0.0), finite_or(y, 0.0), finite_or(z, 0.0));
        let norm = (x * x + y * y + z * z).sqrt();
        if norm <= f64::EPSILON {
            return Self::Sphere {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            };
        }
        Self::Sphere {
            x: x / norm,
            y: y / norm,
            z: z / norm,
        }
    }

    pub fn cell(pos: GridPos) -> Self {
        Self::Cell { x: pos.x, y: pos.y }
    }

    /// Euclidean distance; positions of different kinds never merge.
    pub fn distance(&self, other: &Self) -> f64 {
        match (self, other) {
            (
                Self::Sphere { x, y, z },
                Self::Sphere {
                    x: ox,
                    y: oy,
                    z: oz,
                },
            ) => ((x - ox).powi(2) + (y - oy).powi(2) + (z - oz).powi(2)).sqrt(),
            (Self::Cell { x, y }, Self::Cell { x: ox, y: oy }) => {
                let dx = f64::from(*x) - f64::from(*ox);
                let dy = f64::from(*y) - f64::from(*oy);
                (dx * dx + dy * dy).sqrt()
            }
            _ => f64::INFINITY,
        }
    }
}

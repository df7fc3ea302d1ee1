//! Tick-driven update-signal gating: decides when an internal model must be
//! resynchronized with ground truth, and what that costs.

pub mod arena;
pub mod energy;
pub mod grid;
pub mod memory;
pub mod network;
pub mod policy;
pub mod recalibration;
pub mod rng;
pub mod simulation;
pub mod thresholds;
pub mod utility;

pub use arena::{AgentArena, ArenaAgent, ArenaStepMetrics};
pub use energy::EnergyLedger;
pub use grid::GridWorld;
pub use memory::{MemoryTouch, ScarMemory, SpatialMemoryStore};
pub use network::{ConfirmationNetwork, Edge, GroundTruth, ObserverNode};
pub use policy::AgentPolicy;
pub use recalibration::{RecalibrationReport, Recalibrator};
pub use simulation::Simulation;
pub use thresholds::{CoherenceMetrics, ThresholdAssessment, ThresholdProfile};
pub use utility::{
    SalienceProductUtility, UtilityEngine, UtilityInput, UtilityOutput, UtilityStrategy,
    WeightedSumUtility,
};

//! Render-ready state exported once per step. Presentation code reads these
//! and never touches the kernel's internal state.

use serde::{Deserialize, Serialize};

use crate::{CellState, Driver, GridPos, PolicyKind, ScarPosition, UtilityStrategyKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    pub capacity: f64,
    pub level: f64,
    pub accumulated_cost: f64,
    pub low: bool,
    pub depleted: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScarSnapshot {
    pub position: ScarPosition,
    pub intensity: f64,
    pub age: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecalibrationSnapshot {
    pub tick: u64,
    pub elapsed: f64,
    pub strategy: UtilityStrategyKind,
    pub observer: [f64; 3],
    pub physical: [f64; 3],
    pub prediction_error: f64,
    pub utility: f64,
    pub utility_delta: f64,
    pub dominant_driver: Driver,
    pub recalibrated: bool,
    pub recalibration_count: u64,
    pub ledger: LedgerSnapshot,
    pub scars: Vec<ScarSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub policy: PolicyKind,
    pub position: GridPos,
    pub energy: f64,
    pub frozen: bool,
    /// Gating signal for the coherence-gated policy, chosen score otherwise.
    pub last_utility: f64,
    pub held_last_tick: bool,
    pub moves: u64,
    pub resources_collected: u32,
    pub hazards_hit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArenaSnapshot {
    pub tick: u64,
    pub width: u16,
    pub height: u16,
    /// Row-major, `width * height` entries.
    pub cells: Vec<CellState>,
    pub resources_remaining: usize,
    pub agents: Vec<AgentSnapshot>,
    pub ledger: LedgerSnapshot,
    pub scars: Vec<ScarSnapshot>,
}

impl ArenaSnapshot {
    pub fn cell(&self, pos: GridPos) -> Option<CellState> {
        if pos.x < 0 || pos.y < 0 || pos.x >= i32::from(self.width) || pos.y >= i32::from(self.height)
        {
            return None;
        }
        let index = pos.y as usize * usize::from(self.width) + pos.x as usize;
        self.cells.get(index).copied()
    }

    pub fn agent(&self, policy: PolicyKind) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|agent| agent.policy == policy)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeSnapshot {
    pub node_id: usize,
    pub observed: f64,
    pub belief: f64,
    pub confidence: f64,
    pub energy: f64,
    pub confirming: bool,
    pub confirmation_level: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EdgeSnapshot {
    pub a: usize,
    pub b: usize,
    pub strength: f64,
    pub agreement: f64,
    pub active: bool,
    pub flow: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSnapshot {
    pub tick: u64,
    pub ground_truth: f64,
    pub truth_target: f64,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub confirming_fraction: f64,
    pub consensus_reached: bool,
    /// Mean belief of the confirming subset at the last rising edge.
    pub consensus_value: Option<f64>,
    pub consensus_events: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSnapshot {
    pub schema_version: String,
    pub run_id: String,
    pub tick: u64,
    pub elapsed: f64,
    pub recalibration: Option<RecalibrationSnapshot>,
    pub arena: Option<ArenaSnapshot>,
    pub network: Option<NetworkSnapshot>,
}

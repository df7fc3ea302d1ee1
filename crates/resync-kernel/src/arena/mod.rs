//! Shared grid world stepped in lockstep by three independently-policied
//! agents.
//!
//! A step runs in three phases: serial random draws, read-only move scoring
//! (optionally on a rayon pool), then a serial commit in agent order. Only
//! the commit phase touches the grid, so two agents heading for the same
//! resource resolve in agent order.

mod init;
mod snapshot;
mod step;

use contracts::{ArenaConfig, GridPos, PolicyKind};
use rand::rngs::StdRng;

use crate::energy::EnergyLedger;
use crate::grid::GridWorld;
use crate::memory::SpatialMemoryStore;
use crate::policy::{AgentPolicy, ExplorationDraw, MoveDecision, RewardTable};

#[derive(Debug, Clone)]
pub struct ArenaAgent {
    pub agent_id: String,
    pub policy: AgentPolicy,
    pub position: GridPos,
    pub energy: EnergyLedger,
    pub last_utility: f64,
    pub held_last_tick: bool,
    pub moves: u64,
    pub resources_collected: u32,
    pub hazards_hit: u32,
}

impl ArenaAgent {
    pub fn kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Frozen agents skip every phase but stay visible.
    pub fn is_frozen(&self) -> bool {
        self.energy.is_depleted()
    }
}

#[derive(Debug, Clone, Copy)]
struct AgentEvaluation {
    index: usize,
    decision: MoveDecision,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStepMetrics {
    pub active_agents: u32,
    pub moves: u32,
    pub holds: u32,
    pub resources_taken: u32,
    pub hazards_hit: u32,
    pub froze: u32,
}

pub struct AgentArena {
    config: ArenaConfig,
    seed: u64,
    rng: StdRng,
    rewards: RewardTable,
    initial_grid: GridWorld,
    initial_positions: [GridPos; 3],
    grid: GridWorld,
    agents: Vec<ArenaAgent>,
    ledger: EnergyLedger,
    scars: SpatialMemoryStore,
    tick: u64,
    scoring_worker_threads: usize,
    scoring_pool: Option<rayon::ThreadPool>,
    last_step_metrics: ArenaStepMetrics,
}

impl std::fmt::Debug for AgentArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentArena")
            .field("tick", &self.tick)
            .field("seed", &self.seed)
            .field("agents", &self.agents)
            .field("scoring_worker_threads", &self.scoring_worker_threads)
            .finish_non_exhaustive()
    }
}

impl AgentArena {
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &GridWorld {
        &self.grid
    }

    pub fn agents(&self) -> &[ArenaAgent] {
        &self.agents
    }

    pub fn agent(&self, kind: PolicyKind) -> Option<&ArenaAgent> {
        self.agents.iter().find(|agent| agent.kind() == kind)
    }

    pub fn ledger(&self) -> &EnergyLedger {
        &self.ledger
    }

    pub fn scars(&self) -> &SpatialMemoryStore {
        &self.scars
    }

    pub fn last_step_metrics(&self) -> ArenaStepMetrics {
        self.last_step_metrics
    }

    /// Fraction of agents still acting.
    pub fn active_fraction(&self) -> f64 {
        if self.agents.is_empty() {
            return 0.0;
        }
        let active = self.agents.iter().filter(|agent| !agent.is_frozen()).count();
        active as f64 / self.agents.len() as f64
    }
}

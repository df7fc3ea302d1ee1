use super::*;

use contracts::{AgentSnapshot, ArenaSnapshot, CellState};

impl ArenaAgent {
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: self.agent_id.clone(),
            policy: self.kind(),
            position: self.position,
            energy: self.energy.level(),
            frozen: self.is_frozen(),
            last_utility: self.last_utility,
            held_last_tick: self.held_last_tick,
            moves: self.moves,
            resources_collected: self.resources_collected,
            hazards_hit: self.hazards_hit,
        }
    }
}

impl AgentArena {
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            tick: self.tick,
            width: self.grid.width(),
            height: self.grid.height(),
            cells: self.grid.cells().to_vec(),
            resources_remaining: self.grid.count(CellState::Resource),
            agents: self.agents.iter().map(ArenaAgent::snapshot).collect(),
            ledger: self.ledger.snapshot(),
            scars: self.scars.snapshot(),
        }
    }
}

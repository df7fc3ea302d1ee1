use super::*;

use contracts::{ArenaSnapshot, CellState, ScarPosition};
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::policy::{Candidate, Observation};

const HAZARD_SCAR_STRENGTH: f64 = 1.0;
const RESOURCE_SCAR_STRENGTH: f64 = 0.5;

impl AgentArena {
    /// Advance every active agent by one tick.
    pub fn step(&mut self) -> ArenaSnapshot {
        self.tick = self.tick.saturating_add(1);
        let draws = self.draw_exploration();
        let evaluations = self.evaluate_agents(draws);

        let mut metrics = ArenaStepMetrics {
            active_agents: evaluations.len() as u32,
            ..ArenaStepMetrics::default()
        };
        for evaluation in evaluations {
            self.commit_evaluation(evaluation, &mut metrics);
        }
        self.scars.tick(1.0);
        self.last_step_metrics = metrics;

        debug!(
            tick = self.tick,
            active = metrics.active_agents,
            moves = metrics.moves,
            holds = metrics.holds,
            resources_remaining = self.grid.count(CellState::Resource),
            "arena step"
        );
        self.snapshot()
    }

    pub fn step_n(&mut self, n: u64) -> ArenaSnapshot {
        for _ in 0..n {
            self.step();
        }
        self.snapshot()
    }

    /// One draw per active agent that explores, in agent order, so the
    /// stream does not depend on how scoring is scheduled.
    fn draw_exploration(&mut self) -> Vec<Option<ExplorationDraw>> {
        let mut draws = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            if agent.is_frozen() || !agent.policy.needs_exploration_draw() {
                draws.push(None);
                continue;
            }
            draws.push(Some(ExplorationDraw {
                roll: self.rng.gen(),
                pick: self.rng.gen(),
            }));
        }
        draws
    }

    fn evaluate_agents(&self, draws: Vec<Option<ExplorationDraw>>) -> Vec<AgentEvaluation> {
        let workloads = draws
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !self.agents[*index].is_frozen())
            .collect::<Vec<_>>();

        let mut evaluations = if self.scoring_worker_threads <= 1 || workloads.len() <= 1 {
            workloads
                .into_iter()
                .map(|(index, draw)| self.evaluate_single_agent(index, draw))
                .collect::<Vec<_>>()
        } else if let Some(pool) = &self.scoring_pool {
            pool.install(|| {
                workloads
                    .into_par_iter()
                    .map(|(index, draw)| self.evaluate_single_agent(index, draw))
                    .collect::<Vec<_>>()
            })
        } else {
            workloads
                .into_iter()
                .map(|(index, draw)| self.evaluate_single_agent(index, draw))
                .collect::<Vec<_>>()
        };

        evaluations.sort_by_key(|evaluation| evaluation.index);
        evaluations
    }

    fn evaluate_single_agent(&self, index: usize, draw: Option<ExplorationDraw>) -> AgentEvaluation {
        let agent = &self.agents[index];
        let candidates = self
            .grid
            .neighbors(agent.position)
            .into_iter()
            .map(|(pos, cell)| Candidate { pos, cell })
            .collect::<Vec<_>>();
        let observation = Observation {
            position: agent.position,
            candidates: &candidates,
            energy_fraction: agent.energy.fraction(),
        };
        AgentEvaluation {
            index,
            decision: agent.policy.choose_move(&observation, draw),
        }
    }

    fn commit_evaluation(&mut self, evaluation: AgentEvaluation, metrics: &mut ArenaStepMetrics) {
        let decision = evaluation.decision;
        let Some(agent) = self.agents.get_mut(evaluation.index) else {
            return;
        };

        agent.energy.consume(self.config.base_drain);
        let cell = if decision.hold {
            CellState::Empty
        } else {
            self.grid.consume(decision.target)
        };
        let reward = self.rewards.observed(cell);
        match cell {
            CellState::Resource => {
                agent.energy.replenish(self.config.resource_gain);
                agent.resources_collected = agent.resources_collected.saturating_add(1);
                metrics.resources_taken += 1;
                self.scars
                    .add_or_reinforce(ScarPosition::cell(decision.target), RESOURCE_SCAR_STRENGTH);
                self.ledger.reward(agent.energy.fraction(), 1.0);
            }
            CellState::Hazard => {
                agent.energy.consume(self.config.hazard_penalty);
                agent.hazards_hit = agent.hazards_hit.saturating_add(1);
                metrics.hazards_hit += 1;
                self.scars
                    .add_or_reinforce(ScarPosition::cell(decision.target), HAZARD_SCAR_STRENGTH);
            }
            CellState::Empty => {
                agent.energy.replenish(self.config.empty_recovery);
            }
        }

        if decision.hold {
            metrics.holds += 1;
        } else {
            agent.position = decision.target;
            agent.moves = agent.moves.saturating_add(1);
            metrics.moves += 1;
            if agent.kind() == PolicyKind::CoherenceGated {
                self.ledger.consume(self.config.correction_cost);
            }
        }
        agent.policy.on_outcome(&decision, reward);
        agent.last_utility = decision.utility;
        agent.held_last_tick = decision.hold;

        trace!(
            tick = self.tick,
            agent_id = %agent.agent_id,
            target = %decision.target,
            hold = decision.hold,
            explored = decision.explored,
            score = decision.score,
            reward,
            "agent decision committed"
        );
        if agent.is_frozen() {
            metrics.froze += 1;
            debug!(
                tick = self.tick,
                agent_id = %agent.agent_id,
                position = %agent.position,
                "agent energy exhausted; frozen"
            );
        }
    }
}

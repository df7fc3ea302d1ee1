use super::*;

use contracts::NetworkSnapshot;
use rand::Rng;
use tracing::{debug, info};

use crate::rng::symmetric;

impl ConfirmationNetwork {
    pub fn step(&mut self) -> NetworkSnapshot {
        self.tick = self.tick.saturating_add(1);
        self.evolve_truth();
        self.observe();
        self.evaluate_agreement();
        self.resolve_consensus();
        debug!(
            tick = self.tick,
            truth = self.truth.value,
            confirming_fraction = self.confirming_fraction(),
            consensus = self.consensus_reached,
            "network step"
        );
        self.snapshot()
    }

    pub fn step_n(&mut self, n: u64) -> NetworkSnapshot {
        for _ in 0..n {
            self.step();
        }
        self.snapshot()
    }

    /// Bounded random walk pulled toward a target that occasionally moves.
    /// Draw count per tick is fixed.
    fn evolve_truth(&mut self) {
        let retarget_roll: f64 = self.rng.gen();
        let next_target: f64 = self.rng.gen();
        if retarget_roll < self.config.retarget_probability {
            self.truth.target = next_target;
        }
        let jitter = symmetric(&mut self.rng, self.config.truth_step);
        let pull = self.config.truth_pull * (self.truth.target - self.truth.value);
        self.truth.value = (self.truth.value + pull + jitter).clamp(0.0, 1.0);
    }

    fn observe(&mut self) {
        let config = self.config;
        let truth = self.truth.value;
        for node in &mut self.nodes {
            node.observed = (truth + symmetric(&mut self.rng, config.observation_noise)).clamp(0.0, 1.0);
            let error = (node.observed - node.belief).abs();
            if error > config.update_threshold {
                if node.energy >= config.update_cost {
                    node.belief = node.observed;
                    node.energy -= config.update_cost;
                    node.confidence = 1.0;
                } else {
                    node.confidence *= 1.0 - config.confidence_decay;
                }
            }
            node.energy = (node.energy + config.energy_regen).min(config.node_capacity);
        }
    }

    /// Recompute edge agreement and each node's normalized confirmation.
    pub(super) fn evaluate_agreement(&mut self) {
        let config = self.config;
        let node_count = self.nodes.len();
        let mut active_weight = vec![0.0_f64; node_count];
        let mut incident_weight = vec![0.0_f64; node_count];
        let mut has_active = vec![false; node_count];

        for edge in &mut self.edges {
            let (Some(a), Some(b)) = (self.nodes.get(edge.a), self.nodes.get(edge.b)) else {
                continue;
            };
            edge.agreement = (1.0 - (a.belief - b.belief).abs()).clamp(0.0, 1.0);
            edge.active = edge.agreement > config.agreement_bar
                && a.confidence > config.confidence_bar
                && b.confidence > config.confidence_bar;
            edge.flow = if edge.active {
                edge.strength * edge.agreement
            } else {
                0.0
            };
            incident_weight[edge.a] += edge.strength;
            incident_weight[edge.b] += edge.strength;
            if edge.active {
                active_weight[edge.a] += edge.flow;
                active_weight[edge.b] += edge.flow;
                has_active[edge.a] = true;
                has_active[edge.b] = true;
            }
        }

        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.confirmation_level = if incident_weight[index] > 0.0 {
                active_weight[index] / incident_weight[index]
            } else {
                0.0
            };
            node.confirming = node.confirmation_level > config.confirming_fraction;
            if !has_active[index] {
                node.confidence *= 1.0 - config.confidence_decay;
            }
        }
    }

    /// Apply the consensus rule to the current confirming flags. Beliefs
    /// snap to the confirming mean only on the transition into consensus.
    /// Returns whether this call was a rising edge.
    pub(super) fn resolve_consensus(&mut self) -> bool {
        let reached = self.confirming_fraction() >= self.config.consensus_threshold;
        let rising = reached && !self.consensus_reached;
        self.consensus_reached = reached;
        if !rising {
            return false;
        }

        let confirming = self
            .nodes
            .iter()
            .filter(|node| node.confirming)
            .map(|node| node.belief)
            .collect::<Vec<_>>();
        if confirming.is_empty() {
            return false;
        }
        let mean = confirming.iter().sum::<f64>() / confirming.len() as f64;
        let group_cost = self.config.update_cost * self.config.group_cost_fraction;
        for node in &mut self.nodes {
            node.belief = mean;
            node.energy = (node.energy - group_cost).max(0.0);
        }
        self.consensus_value = Some(mean);
        self.consensus_events = self.consensus_events.saturating_add(1);
        info!(
            tick = self.tick,
            consensus_value = mean,
            confirming = confirming.len(),
            events = self.consensus_events,
            "network reached consensus"
        );
        true
    }
}

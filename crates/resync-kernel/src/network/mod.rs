//! Simulated confirmation network: N observer nodes sensing one drifting
//! ground-truth scalar, with consensus derived from pairwise agreement.
//!
//! Each tick runs truth drift, observation, agreement and consensus in that
//! order. Consensus forces beliefs only on its rising edge.

mod init;
mod snapshot;
mod step;

use contracts::NetworkConfig;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruth {
    pub value: f64,
    pub target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverNode {
    pub node_id: usize,
    pub observed: f64,
    pub belief: f64,
    pub confidence: f64,
    pub energy: f64,
    pub confirming: bool,
    pub confirmation_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub strength: f64,
    pub agreement: f64,
    pub active: bool,
    pub flow: f64,
}

#[derive(Debug, Clone)]
pub struct ConfirmationNetwork {
    config: NetworkConfig,
    seed: u64,
    rng: StdRng,
    truth: GroundTruth,
    nodes: Vec<ObserverNode>,
    edges: Vec<Edge>,
    consensus_reached: bool,
    consensus_value: Option<f64>,
    consensus_events: u64,
    tick: u64,
}

impl ConfirmationNetwork {
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn truth(&self) -> GroundTruth {
        self.truth
    }

    pub fn nodes(&self) -> &[ObserverNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn consensus_reached(&self) -> bool {
        self.consensus_reached
    }

    pub fn consensus_value(&self) -> Option<f64> {
        self.consensus_value
    }

    pub fn consensus_events(&self) -> u64 {
        self.consensus_events
    }

    pub fn confirming_fraction(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let confirming = self.nodes.iter().filter(|node| node.confirming).count();
        confirming as f64 / self.nodes.len() as f64
    }

    /// Mean |belief − truth| across nodes.
    pub fn mean_belief_error(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let total = self
            .nodes
            .iter()
            .map(|node| (node.belief - self.truth.value).abs())
            .sum::<f64>();
        total / self.nodes.len() as f64
    }
}

#[cfg(test)]
mod tests;

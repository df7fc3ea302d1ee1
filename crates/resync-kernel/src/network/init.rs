use super::*;

use rand::Rng;

use crate::rng::{stream_rng, symmetric, STREAM_NETWORK};

/// Shortest hop count between two ring positions.
pub(super) fn ring_distance(a: usize, b: usize, node_count: usize) -> usize {
    let direct = a.abs_diff(b);
    direct.min(node_count.saturating_sub(direct))
}

impl ConfirmationNetwork {
    pub fn new(config: NetworkConfig, seed: u64) -> Self {
        let config = config.normalized();
        let mut rng = stream_rng(seed, STREAM_NETWORK);
        let (truth, nodes) = initial_state(&config, &mut rng);
        Self {
            edges: ring_edges(config.node_count),
            config,
            seed,
            rng,
            truth,
            nodes,
            consensus_reached: false,
            consensus_value: None,
            consensus_events: 0,
            tick: 0,
        }
    }

    pub fn reset(&mut self) {
        let mut rng = stream_rng(self.seed, STREAM_NETWORK);
        let (truth, nodes) = initial_state(&self.config, &mut rng);
        self.rng = rng;
        self.truth = truth;
        self.nodes = nodes;
        self.edges = ring_edges(self.config.node_count);
        self.consensus_reached = false;
        self.consensus_value = None;
        self.consensus_events = 0;
        self.tick = 0;
    }
}

fn initial_state(config: &NetworkConfig, rng: &mut StdRng) -> (GroundTruth, Vec<ObserverNode>) {
    let value: f64 = rng.gen_range(0.2..=0.8);
    let truth = GroundTruth {
        value,
        target: value,
    };
    let nodes = (0..config.node_count)
        .map(|node_id| {
            let observed = (value + symmetric(rng, config.observation_noise)).clamp(0.0, 1.0);
            ObserverNode {
                node_id,
                observed,
                belief: observed,
                confidence: 1.0,
                energy: config.node_capacity,
                confirming: false,
                confirmation_level: 0.0,
            }
        })
        .collect();
    (truth, nodes)
}

/// Every pair is an edge; strength falls off with ring distance.
fn ring_edges(node_count: usize) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(node_count * node_count.saturating_sub(1) / 2);
    for a in 0..node_count {
        for b in (a + 1)..node_count {
            let distance = ring_distance(a, b, node_count).max(1);
            edges.push(Edge {
                a,
                b,
                strength: 1.0 / distance as f64,
                agreement: 0.0,
                active: false,
                flow: 0.0,
            });
        }
    }
    edges
}

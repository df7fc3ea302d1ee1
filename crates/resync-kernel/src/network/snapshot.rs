use super::*;

use contracts::{EdgeSnapshot, NetworkSnapshot, NodeSnapshot};

impl ObserverNode {
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            node_id: self.node_id,
            observed: self.observed,
            belief: self.belief,
            confidence: self.confidence,
            energy: self.energy,
            confirming: self.confirming,
            confirmation_level: self.confirmation_level,
        }
    }
}

impl Edge {
    pub fn snapshot(&self) -> EdgeSnapshot {
        EdgeSnapshot {
            a: self.a,
            b: self.b,
            strength: self.strength,
            agreement: self.agreement,
            active: self.active,
            flow: self.flow,
        }
    }
}

impl ConfirmationNetwork {
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            tick: self.tick,
            ground_truth: self.truth.value,
            truth_target: self.truth.target,
            nodes: self.nodes.iter().map(ObserverNode::snapshot).collect(),
            edges: self.edges.iter().map(Edge::snapshot).collect(),
            confirming_fraction: self.confirming_fraction(),
            consensus_reached: self.consensus_reached,
            consensus_value: self.consensus_value,
            consensus_events: self.consensus_events,
        }
    }
}

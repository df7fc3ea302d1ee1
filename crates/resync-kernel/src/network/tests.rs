use super::*;

fn network_with(config: NetworkConfig) -> ConfirmationNetwork {
    ConfirmationNetwork::new(config, 42)
}

fn set_confirming(network: &mut ConfirmationNetwork, confirming: &[bool]) {
    for (node, flag) in network.nodes.iter_mut().zip(confirming) {
        node.confirming = *flag;
    }
}

fn set_beliefs(network: &mut ConfirmationNetwork, beliefs: &[f64], confidences: &[f64]) {
    for ((node, belief), confidence) in network.nodes.iter_mut().zip(beliefs).zip(confidences) {
        node.belief = *belief;
        node.confidence = *confidence;
    }
}

#[test]
fn ring_topology_weights_by_hop_distance() {
    let network = network_with(NetworkConfig::default());
    assert_eq!(network.edges().len(), 10);
    let strength = |a: usize, b: usize| {
        network
            .edges()
            .iter()
            .find(|edge| edge.a == a && edge.b == b)
            .map(|edge| edge.strength)
            .expect("edge exists")
    };
    assert_eq!(strength(0, 1), 1.0);
    assert_eq!(strength(0, 2), 0.5);
    assert_eq!(strength(0, 4), 1.0);
    assert_eq!(strength(1, 3), 0.5);
}

#[test]
fn three_of_five_confirming_reaches_consensus() {
    let mut network = network_with(NetworkConfig::default());
    set_confirming(&mut network, &[true, true, true, false, false]);
    assert!(network.resolve_consensus());
    assert!(network.consensus_reached());
    assert_eq!(network.consensus_events(), 1);
}

#[test]
fn two_of_five_confirming_is_not_consensus() {
    let mut network = network_with(NetworkConfig::default());
    set_confirming(&mut network, &[true, false, true, false, false]);
    assert!(!network.resolve_consensus());
    assert!(!network.consensus_reached());
    assert_eq!(network.consensus_value(), None);
}

#[test]
fn agreement_needs_close_beliefs_and_confident_endpoints() {
    let mut network = network_with(NetworkConfig {
        confirming_fraction: 0.4,
        ..NetworkConfig::default()
    });
    set_beliefs(
        &mut network,
        &[0.5, 0.52, 0.54, 0.9, 0.1],
        &[1.0, 1.0, 1.0, 0.1, 0.1],
    );
    network.evaluate_agreement();

    let confirming = network
        .nodes()
        .iter()
        .map(|node| node.confirming)
        .collect::<Vec<_>>();
    assert_eq!(confirming, vec![true, true, true, false, false]);
    assert!((network.nodes()[1].confirmation_level - 1.96 / 3.0).abs() < 1e-9);
    assert_eq!(network.nodes()[3].confirmation_level, 0.0);
    assert!((network.nodes()[3].confidence - 0.09).abs() < 1e-12);
    assert!(network.nodes()[0].confidence == 1.0);
    assert_eq!(network.edges().iter().filter(|edge| edge.active).count(), 3);
}

#[test]
fn consensus_snaps_beliefs_only_on_rising_edge() {
    let mut network = network_with(NetworkConfig {
        confirming_fraction: 0.4,
        ..NetworkConfig::default()
    });
    set_beliefs(
        &mut network,
        &[0.5, 0.52, 0.54, 0.9, 0.1],
        &[1.0, 1.0, 1.0, 0.1, 0.1],
    );
    network.evaluate_agreement();
    assert!(network.resolve_consensus());
    let mean = network.consensus_value().expect("consensus value set");
    assert!((mean - 0.52).abs() < 1e-9);
    for node in network.nodes() {
        assert_eq!(node.belief, mean);
        assert!((node.energy - 0.975).abs() < 1e-12);
    }

    network.nodes[0].belief = 0.53;
    network.evaluate_agreement();
    assert!(!network.resolve_consensus());
    assert!(network.consensus_reached());
    assert_eq!(network.nodes()[0].belief, 0.53);
    assert_eq!(network.consensus_events(), 1);
    assert!((network.nodes()[4].energy - 0.975).abs() < 1e-12);
}

#[test]
fn losing_and_regaining_consensus_counts_a_new_event() {
    let mut network = network_with(NetworkConfig::default());
    set_confirming(&mut network, &[true, true, true, true, false]);
    assert!(network.resolve_consensus());
    set_confirming(&mut network, &[false; 5]);
    assert!(!network.resolve_consensus());
    assert!(!network.consensus_reached());
    set_confirming(&mut network, &[true, true, true, false, false]);
    assert!(network.resolve_consensus());
    assert_eq!(network.consensus_events(), 2);
}

#[test]
fn quiet_network_agrees_on_first_tick() {
    let mut network = network_with(NetworkConfig::default());
    let snapshot = network.step();
    assert!(snapshot.consensus_reached);
    assert_eq!(snapshot.consensus_events, 1);
    let value = snapshot.consensus_value.expect("consensus value");
    assert!(snapshot.nodes.iter().all(|node| node.belief == value));
}

#[test]
fn long_runs_stay_bounded_and_reset_replays() {
    let config = NetworkConfig {
        node_count: 9,
        observation_noise: 0.3,
        truth_step: 0.2,
        retarget_probability: 0.3,
        ..NetworkConfig::default()
    };
    let mut network = network_with(config);
    let mut history = Vec::new();
    for _ in 0..300 {
        let snapshot = network.step();
        assert!((0.0..=1.0).contains(&snapshot.ground_truth));
        for node in &snapshot.nodes {
            assert!((0.0..=1.0).contains(&node.belief));
            assert!((0.0..=1.0).contains(&node.confidence));
            assert!(node.energy >= 0.0 && node.energy <= config.node_capacity);
            assert!((0.0..=1.0).contains(&node.confirmation_level));
        }
        history.push(snapshot);
    }

    network.reset();
    assert_eq!(network.tick(), 0);
    for expected in &history {
        assert_eq!(&network.step(), expected);
    }
}

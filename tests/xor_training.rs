//! XOR convergence on the simulated backend

mod common;

use common::{open_all_sim, open_sim, XOR_TABLE};
use fhe_brain::prelude::*;

/// Per-pattern distance of the prediction from its target
fn distances(
    backend: &SimulatedBackend,
    net: &mut Network<'_, SimulatedBackend>,
    patterns: &[Pattern<SimulatedBackend>],
) -> Vec<f64> {
    let predictions = net.test(patterns).unwrap();
    predictions
        .iter()
        .zip(XOR_TABLE.iter())
        .map(|(prediction, (_, target))| (open_sim(backend, &prediction.outputs[0]) - target).abs())
        .collect()
}

#[test]
fn test_xor_moves_towards_targets() {
    common::init_tracing();
    let backend = SimulatedBackend::new(SimulatedParams::default()).unwrap();
    let mut rng = common::rng(99);
    let (iw, ow) = common::xor_weights();
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let patterns = common::xor_patterns(net.coordinator(), &mut rng);
    let config = TrainingConfig {
        iterations: 10,
        ..TrainingConfig::default()
    };

    let mut checkpoints = vec![distances(&backend, &mut net, &patterns)];
    let mut losses = Vec::new();
    for _ in 0..4 {
        let epoch_losses = net.train(&patterns, &config).unwrap();
        assert_eq!(epoch_losses.len(), 10);
        losses.extend(open_all_sim(&backend, &epoch_losses));
        checkpoints.push(distances(&backend, &mut net, &patterns));
    }

    assert!((losses[0] - 0.28045134068632405).abs() < 1e-6, "first epoch loss {}", losses[0]);
    for pair in losses.windows(2) {
        assert!(pair[1] < pair[0], "epoch loss went up: {:?}", pair);
    }
    for pair in checkpoints.windows(2) {
        for (before, after) in pair[0].iter().zip(&pair[1]) {
            assert!(after < before, "distance grew from {} to {}", before, after);
        }
    }

    // Starting distances and the distances after 40 epochs
    let expected_start = [0.2161, 0.4212, 0.4361, 0.2418];
    let expected_end = [0.069, 0.0529, 0.0635, 0.0558];
    for p in 0..4 {
        assert!((checkpoints[0][p] - expected_start[p]).abs() < 1e-3);
        assert!((checkpoints[4][p] - expected_end[p]).abs() < 1e-3);
    }
}

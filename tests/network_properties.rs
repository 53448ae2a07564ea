//! Engine properties on the simulated backend

mod common;

use common::{open_all_sim, open_sim};
use fhe_brain::prelude::*;

fn backend(levels: usize) -> SimulatedBackend {
    common::init_tracing();
    SimulatedBackend::new(SimulatedParams::deep(levels)).unwrap()
}

fn small_weights(rows: usize, cols: usize, seed: f64) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|i| {
            (0..cols)
                .map(|j| 0.1 * seed * ((i * cols + j) as f64 + 1.0).sin())
                .collect()
        })
        .collect()
}

#[test]
fn test_init_shapes() {
    let backend = backend(64);
    let mut rng = common::rng(1);
    let net = Network::init(&backend, 3, 4, 2, &mut rng).unwrap();

    assert_eq!((net.n_inputs(), net.n_hiddens(), net.n_outputs()), (4, 5, 2));
    assert_eq!(net.input_weights().len(), 4);
    assert!(net.input_weights().iter().all(|row| row.len() == 5));
    assert_eq!(net.output_weights().len(), 5);
    assert!(net.output_weights().iter().all(|row| row.len() == 2));
    assert_eq!(net.input_changes().len(), 4);
    assert!(net.input_changes().iter().all(|row| row.len() == 5));
    assert_eq!(net.output_changes().len(), 5);
    assert!(net.output_changes().iter().all(|row| row.len() == 2));
    assert_eq!(net.input_activations().len(), 4);
    assert_eq!(net.hidden_activations().len(), 5);
    assert_eq!(net.output_activations().len(), 2);
    assert!(net.contexts().is_empty());

    for row in net.input_weights().iter().chain(net.output_weights()) {
        for w in open_all_sim(&backend, row) {
            assert!((-1.0..=1.0).contains(&w));
        }
    }
    for row in net.input_changes().iter().chain(net.output_changes()) {
        assert!(open_all_sim(&backend, row).iter().all(|&c| c == 0.0));
    }
    assert!(open_all_sim(&backend, net.hidden_activations()).iter().all(|&a| a == 1.0));
}

#[test]
fn test_bias_units_stay_at_one() {
    let backend = backend(512);
    let mut rng = common::rng(2);
    let (iw, ow) = common::xor_weights();
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let patterns = common::xor_patterns(net.coordinator(), &mut rng);

    for pattern in patterns.iter().cycle().take(12) {
        net.update(&pattern.inputs).unwrap();
        net.back_propagate(&pattern.targets, 0.6, 0.4).unwrap();
        let bias_in = net.input_activations().last().unwrap();
        let bias_hidden = net.hidden_activations().last().unwrap();
        assert_eq!(open_sim(&backend, bias_in), 1.0);
        assert_eq!(open_sim(&backend, bias_hidden), 1.0);
    }
}

#[test]
fn test_update_is_repeatable() {
    let backend = backend(64);
    let mut rng = common::rng(3);
    let mut net = Network::init(&backend, 2, 3, 2, &mut rng).unwrap();
    let inputs = net.coordinator().encrypt_values(&[0.3, -0.7], &mut rng).unwrap();

    let first = open_all_sim(&backend, net.update(&inputs).unwrap());
    let second = open_all_sim(&backend, net.update(&inputs).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_context_rotation() {
    let backend = backend(256);
    let mut rng = common::rng(4);
    let iw = small_weights(3, 4, 1.0);
    let ow = small_weights(4, 1, -1.0);
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    net.set_contexts(3, None, &mut rng).unwrap();
    assert_eq!(net.contexts().len(), 3);

    let inputs = net.coordinator().encrypt_values(&[0.5, 0.25], &mut rng).unwrap();
    let mut history = Vec::new();
    for call in 1..=4 {
        net.update(&inputs).unwrap();
        history.push(open_all_sim(&backend, net.hidden_activations()));

        let contexts: Vec<Vec<f64>> = net.contexts().iter().map(|c| open_all_sim(&backend, c)).collect();
        assert_eq!(contexts.len(), 3);
        for (k, context) in contexts.iter().enumerate() {
            if k < call {
                assert_eq!(context, &history[call - 1 - k]);
            } else {
                assert_eq!(context, &vec![0.5; 4]);
            }
        }
    }
    // Contexts feed back, so the same input does not give the same hidden state twice
    assert_ne!(history[0], history[1]);
}

#[test]
fn test_supplied_contexts_are_used() {
    let backend = backend(64);
    let mut rng = common::rng(5);
    let iw = small_weights(3, 3, 1.0);
    let ow = small_weights(3, 1, 1.0);

    let mut plain = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let mut recurrent = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let context = recurrent.coordinator().encrypt_values(&[0.2, -0.1, 7.0], &mut rng).unwrap();
    recurrent.set_contexts(0, Some(vec![context]), &mut rng).unwrap();
    assert_eq!(recurrent.contexts().len(), 1);

    let inputs = plain.coordinator().encrypt_values(&[1.0, 0.5], &mut rng).unwrap();
    plain.update(&inputs).unwrap();
    recurrent.update(&inputs).unwrap();

    // Context units add to every hidden pre-activation, the bias slot excluded
    let iw_sum = |col: usize| iw[0][col] + 0.5 * iw[1][col] + iw[2][col];
    let plain_hidden = open_all_sim(&backend, plain.hidden_activations());
    let recurrent_hidden = open_all_sim(&backend, recurrent.hidden_activations());
    for i in 0..2 {
        assert!((plain_hidden[i] - iw_sum(i).powi(2)).abs() < 1e-9);
        assert!((recurrent_hidden[i] - (iw_sum(i) + 0.1).powi(2)).abs() < 1e-9);
    }
}

#[test]
fn test_momentum_update_law() {
    let backend = backend(512);
    let mut rng = common::rng(6);
    let (iw, ow) = common::xor_weights();
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let patterns = common::xor_patterns(net.coordinator(), &mut rng);
    let (lr, momentum) = (0.6, 0.4);

    let mut previous = vec![0.0; 3];
    for pattern in &patterns[1..3] {
        net.update(&pattern.inputs).unwrap();
        let y = open_sim(&backend, &net.output_activations()[0]);
        let t = open_sim(&backend, &pattern.targets[0]);
        let hidden = open_all_sim(&backend, net.hidden_activations());
        let weights_before: Vec<f64> = net.output_weights().iter().map(|r| open_sim(&backend, &r[0])).collect();

        net.back_propagate(&pattern.targets, lr, momentum).unwrap();

        let delta = (1.0 - y) * y * (t - y);
        for i in 0..3 {
            let change = delta * hidden[i];
            let stored = open_sim(&backend, &net.output_changes()[i][0]);
            assert!((stored - change).abs() < 1e-9, "change {} vs {}", stored, change);

            let weight = open_sim(&backend, &net.output_weights()[i][0]);
            let expected = weights_before[i] + change * lr + previous[i] * momentum;
            assert!((weight - expected).abs() < 1e-9);
            previous[i] = change;
        }
    }
}

#[test]
fn test_shape_errors() {
    let backend = backend(64);
    let mut rng = common::rng(7);
    let mut net = Network::init(&backend, 2, 2, 1, &mut rng).unwrap();
    let three = net.coordinator().encrypt_values(&[1.0, 0.0, 1.0], &mut rng).unwrap();

    assert_eq!(
        net.update(&three).unwrap_err(),
        Error::Shape {
            what: "inputs",
            expected: 2,
            actual: 3
        }
    );
    assert_eq!(
        net.back_propagate(&three, 0.6, 0.4).unwrap_err(),
        Error::Shape {
            what: "targets",
            expected: 1,
            actual: 3
        }
    );

    let short = net.coordinator().encrypt_values(&[0.5, 0.5], &mut rng).unwrap();
    let full = net.coordinator().encrypt_values(&[0.5, 0.5, 1.0], &mut rng).unwrap();
    assert_eq!(
        net.set_contexts(2, Some(vec![full.clone(), short]), &mut rng).unwrap_err(),
        Error::ContextShape {
            index: 1,
            expected: 3,
            actual: 2
        }
    );
    net.set_contexts(1, Some(vec![full]), &mut rng).unwrap();
    assert_eq!(
        net.set_contexts(2, None, &mut rng).unwrap_err(),
        Error::ContextsAlreadySet { count: 1 }
    );

    assert!(matches!(
        Network::init(&backend, 2, 2, 0, &mut rng),
        Err(Error::InvalidShape(_))
    ));
    let (iw, mut ow) = common::xor_weights();
    ow.pop();
    assert!(matches!(
        Network::from_weights(&backend, &iw, &ow, &mut rng),
        Err(Error::Shape {
            what: "output weights",
            expected: 3,
            actual: 2
        })
    ));
    let ragged = vec![vec![0.1, 0.2, 0.3], vec![0.1, 0.2], vec![0.1, 0.2, 0.3]];
    assert!(matches!(
        Network::from_weights(&backend, &ragged, &common::xor_weights().1, &mut rng),
        Err(Error::Shape {
            what: "input weights",
            ..
        })
    ));
}

#[test]
fn test_depth_exhaustion_surfaces() {
    let backend = backend(8);
    let mut rng = common::rng(8);
    let (iw, ow) = common::xor_weights();
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let patterns = common::xor_patterns(net.coordinator(), &mut rng);

    let outputs = net.update(&patterns[0].inputs).unwrap();
    assert_eq!(outputs[0].level(), Level(4));
    assert!(matches!(
        net.back_propagate(&patterns[0].targets, 0.6, 0.4),
        Err(Error::DepthExhausted { .. })
    ));
}

#[test]
fn test_train_without_patterns_and_test_labels() {
    let backend = backend(256);
    let mut rng = common::rng(9);
    let (iw, ow) = common::xor_weights();
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();

    let config = TrainingConfig {
        iterations: 3,
        ..TrainingConfig::default()
    };
    let losses = net.train(&[], &config).unwrap();
    assert_eq!(losses.len(), 3);
    assert!(open_all_sim(&backend, &losses).iter().all(|&l| l == 0.0));

    let patterns = common::xor_patterns(net.coordinator(), &mut rng);
    let predictions = net.test(&patterns).unwrap();
    let labels: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, ["0 xor 0", "0 xor 1", "1 xor 0", "1 xor 1"]);
    assert!(predictions.iter().all(|p| p.outputs.len() == 1));
}

#[test]
fn test_training_config_defaults() {
    let config = TrainingConfig::default();
    assert_eq!(config.iterations, 1000);
    assert_eq!(config.learning_rate, 0.6);
    assert_eq!(config.momentum, 0.4);
}

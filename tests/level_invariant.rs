//! Operands of every binary backend operation sit at the same level

mod common;

use common::InstrumentedBackend;
use fhe_brain::prelude::*;

fn assert_no_violations<B: HomomorphicBackend>(backend: &InstrumentedBackend<B>) {
    assert!(backend.checked.get() > 0);
    let violations = backend.violations.borrow();
    assert!(violations.is_empty(), "mismatched operand levels: {:?}", *violations);
}

#[test]
fn test_training_keeps_operand_levels_equal() {
    common::init_tracing();
    let backend = InstrumentedBackend::new(SimulatedBackend::new(SimulatedParams::deep(1024)).unwrap());
    let mut rng = common::rng(10);
    let (iw, ow) = common::xor_weights();
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let patterns = common::xor_patterns(net.coordinator(), &mut rng);

    let config = TrainingConfig {
        iterations: 3,
        ..TrainingConfig::default()
    };
    net.train(&patterns, &config).unwrap();
    net.test(&patterns).unwrap();
    assert_no_violations(&backend);
}

#[test]
fn test_recurrent_network_keeps_operand_levels_equal() {
    common::init_tracing();
    let backend = InstrumentedBackend::new(SimulatedBackend::new(SimulatedParams::deep(1024)).unwrap());
    let mut rng = common::rng(11);
    let mut net = Network::init(&backend, 2, 3, 2, &mut rng).unwrap();
    net.set_contexts(2, None, &mut rng).unwrap();
    let inputs = net.coordinator().encrypt_values(&[0.1, 0.2], &mut rng).unwrap();
    let targets = net.coordinator().encrypt_values(&[0.0, 1.0], &mut rng).unwrap();

    for _ in 0..2 {
        net.update(&inputs).unwrap();
        net.back_propagate(&targets, 0.3, 0.1).unwrap();
    }
    assert_no_violations(&backend);
}

#[test]
fn test_ckks_step_keeps_operand_levels_equal() {
    common::init_tracing();
    let mut rng = common::rng(12);
    let (ckks, decryptor) = CkksBackend::generate(CkksParams::new_test_depth_16(), &mut rng).unwrap();
    let backend = InstrumentedBackend::new(ckks);
    let (iw, ow) = common::xor_weights();
    let mut net = Network::from_weights(&backend, &iw, &ow, &mut rng).unwrap();
    let patterns = common::xor_patterns(net.coordinator(), &mut rng);

    net.update(&patterns[3].inputs).unwrap();
    let loss = net.back_propagate(&patterns[3].targets, 0.6, 0.4).unwrap();
    assert_no_violations(&backend);

    let loss = decryptor.decrypt_value(backend.inner(), loss.inner()).unwrap();
    assert!(loss > 0.0 && loss < 0.5);
}

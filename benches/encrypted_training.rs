use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fhe_brain::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const XOR_INPUT_WEIGHTS: [[f64; 3]; 3] = [[-0.45, 0.46, -0.1], [-0.9, 0.9, -0.2], [0.78, -0.53, -0.09]];
const XOR_OUTPUT_WEIGHTS: [[f64; 1]; 3] = [[-0.44], [-0.24], [0.8]];

fn xor_weights() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    (
        XOR_INPUT_WEIGHTS.iter().map(|r| r.to_vec()).collect(),
        XOR_OUTPUT_WEIGHTS.iter().map(|r| r.to_vec()).collect(),
    )
}

/// Benchmark the CKKS primitives behind one encrypted multiplication.
fn bench_ckks_multiply(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let (backend, _) = CkksBackend::generate(CkksParams::new_test_depth_16(), &mut rng).unwrap();
    let coordinator = LevelCoordinator::new(&backend);
    let a = coordinator.encrypt_value(0.75, &mut rng).unwrap();
    let b = coordinator.encrypt_value(-1.25, &mut rng).unwrap();
    let product = backend.multiply(a.inner(), b.inner()).unwrap();

    c.bench_function("ckks tensor N=64 L=16", |bencher| {
        bencher.iter(|| black_box(backend.multiply(black_box(a.inner()), black_box(b.inner())).unwrap()))
    });
    c.bench_function("ckks relinearize N=64 L=16", |bencher| {
        bencher.iter(|| black_box(backend.relinearize(black_box(&product)).unwrap()))
    });
    c.bench_function("ckks multiply+relin+rescale N=64 L=16", |bencher| {
        bencher.iter(|| black_box(coordinator.multiply(black_box(&a), black_box(&b)).unwrap()))
    });
}

/// Benchmark one forward + backward pass on XOR, encrypted and simulated.
fn bench_training_step(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    let (iw, ow) = xor_weights();

    let (ckks, _) = CkksBackend::generate(CkksParams::new_test_depth_16(), &mut rng).unwrap();
    c.bench_function("training step ckks N=64", |bencher| {
        bencher.iter(|| {
            let mut net = Network::from_weights(&ckks, &iw, &ow, &mut rng).unwrap();
            let pattern = Pattern::encrypt(net.coordinator(), "1 xor 0", &[1.0, 0.0], &[1.0], &mut rng).unwrap();
            net.update(&pattern.inputs).unwrap();
            black_box(net.back_propagate(&pattern.targets, 0.6, 0.4).unwrap())
        })
    });

    let simulated = SimulatedBackend::new(SimulatedParams::deep(64)).unwrap();
    c.bench_function("training step simulated", |bencher| {
        bencher.iter(|| {
            let mut net = Network::from_weights(&simulated, &iw, &ow, &mut rng).unwrap();
            let pattern = Pattern::encrypt(net.coordinator(), "1 xor 0", &[1.0, 0.0], &[1.0], &mut rng).unwrap();
            net.update(&pattern.inputs).unwrap();
            black_box(net.back_propagate(&pattern.targets, 0.6, 0.4).unwrap())
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_ckks_multiply, bench_training_step
}
criterion_main!(benches);

//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use fhe_brain::levels_equal;
use fhe_brain::prelude::*;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

/// Initial weights for XOR (bias row and bias column included) under which
/// training with lr 0.6 and momentum 0.4 converges steadily
pub fn xor_weights() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    (
        vec![
            vec![-0.45, 0.46, -0.1],
            vec![-0.9, 0.9, -0.2],
            vec![0.78, -0.53, -0.09],
        ],
        vec![vec![-0.44], vec![-0.24], vec![0.8]],
    )
}

pub const XOR_TABLE: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

pub fn xor_patterns<B: HomomorphicBackend, R: RngCore + CryptoRng>(
    coordinator: &LevelCoordinator<'_, B>,
    rng: &mut R,
) -> Vec<Pattern<B>> {
    XOR_TABLE
        .iter()
        .map(|(inputs, target)| {
            let label = format!("{} xor {}", inputs[0], inputs[1]);
            Pattern::encrypt(coordinator, label, inputs, &[*target], rng).unwrap()
        })
        .collect()
}

pub fn open_sim(backend: &SimulatedBackend, x: &EncryptedScalar<SimulatedBackend>) -> f64 {
    x.decrypt(backend, &SimulatedDecryptor).unwrap()
}

pub fn open_all_sim(backend: &SimulatedBackend, xs: &[EncryptedScalar<SimulatedBackend>]) -> Vec<f64> {
    xs.iter().map(|x| open_sim(backend, x)).collect()
}

/// Backend wrapper that inspects operand levels before every binary operation
pub struct InstrumentedBackend<B> {
    inner: B,
    pub checked: Cell<usize>,
    pub violations: RefCell<Vec<(&'static str, Level, Level)>>,
}

impl<B: HomomorphicBackend> InstrumentedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            checked: Cell::new(0),
            violations: RefCell::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn check(&self, op: &'static str, a: &B::Ciphertext, b: &B::Ciphertext) {
        let (la, lb) = (self.inner.level(a), self.inner.level(b));
        self.checked.set(self.checked.get() + 1);
        if !levels_equal(la, lb) {
            self.violations.borrow_mut().push((op, la, lb));
        }
    }
}

impl<B: HomomorphicBackend> HomomorphicBackend for InstrumentedBackend<B> {
    type Plaintext = B::Plaintext;
    type Ciphertext = B::Ciphertext;

    fn max_level(&self) -> Level {
        self.inner.max_level()
    }

    fn default_scale(&self) -> f64 {
        self.inner.default_scale()
    }

    fn rescale_divisor(&self, level: Level) -> Result<f64> {
        self.inner.rescale_divisor(level)
    }

    fn encode(&self, value: f64, level: Level, scale: f64) -> Result<Self::Plaintext> {
        self.inner.encode(value, level, scale)
    }

    fn decode(&self, pt: &Self::Plaintext) -> f64 {
        self.inner.decode(pt)
    }

    fn encrypt<R: RngCore + CryptoRng>(&self, pt: &Self::Plaintext, rng: &mut R) -> Result<Self::Ciphertext> {
        self.inner.encrypt(pt, rng)
    }

    fn level(&self, ct: &Self::Ciphertext) -> Level {
        self.inner.level(ct)
    }

    fn scale(&self, ct: &Self::Ciphertext) -> f64 {
        self.inner.scale(ct)
    }

    fn size(&self, ct: &Self::Ciphertext) -> usize {
        self.inner.size(ct)
    }

    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.check("add", a, b);
        self.inner.add(a, b)
    }

    fn sub(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.check("sub", a, b);
        self.inner.sub(a, b)
    }

    fn multiply(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.check("multiply", a, b);
        self.inner.multiply(a, b)
    }

    fn multiply_plain(&self, a: &Self::Ciphertext, pt: &Self::Plaintext) -> Result<Self::Ciphertext> {
        self.inner.multiply_plain(a, pt)
    }

    fn square(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.inner.square(a)
    }

    fn relinearize(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.inner.relinearize(a)
    }

    fn rescale_to_next(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.inner.rescale_to_next(a)
    }

    fn mod_switch_to(&self, a: &Self::Ciphertext, level: Level) -> Result<Self::Ciphertext> {
        self.inner.mod_switch_to(a, level)
    }
}

//! Encrypted training engine
//!
//! A single-hidden-layer network (optionally Elman-recurrent) whose inputs,
//! weights, activations and errors are all [`EncryptedScalar`]s. The engine
//! holds no secret key: it encodes cleartext hyper-parameters, encrypts fresh
//! constants and evaluates, nothing else.
//!
//! Layout follows the usual bias convention: the last input unit and the last
//! hidden unit are constant encryptions of 1.0 that inputs never overwrite.
//!
//! ```text
//! inputs (n_inputs, bias last) --input_weights--> hidden (n_hiddens, bias last)
//!                                    contexts ---^     |
//!                                                      +--output_weights--> outputs
//! ```

use std::collections::VecDeque;

use rand::{CryptoRng, Rng};

use crate::core::{HomomorphicBackend, Result};
use crate::level::{EncryptedScalar, LevelCoordinator};

pub mod activation;
mod backward;
mod forward;
mod state;
mod train;

pub use activation::{activation, activation_derivative};

/// One layer's activations
pub type EncryptedVector<B> = Vec<EncryptedScalar<B>>;

/// `matrix[row][column]`, rows indexed by the source layer
pub type EncryptedMatrix<B> = Vec<Vec<EncryptedScalar<B>>>;

/// Hyper-parameters of [`Network::train`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Number of epochs
    pub iterations: usize,
    pub learning_rate: f64,
    pub momentum: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            learning_rate: 0.6,
            momentum: 0.4,
        }
    }
}

/// Encrypted training example with a cleartext label for reporting
pub struct Pattern<B: HomomorphicBackend> {
    pub label: String,
    pub inputs: EncryptedVector<B>,
    pub targets: EncryptedVector<B>,
}

impl<B: HomomorphicBackend> Pattern<B> {
    /// Encrypt cleartext inputs and targets
    pub fn encrypt<R: Rng + CryptoRng>(
        coordinator: &LevelCoordinator<'_, B>,
        label: impl Into<String>,
        inputs: &[f64],
        targets: &[f64],
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self {
            label: label.into(),
            inputs: coordinator.encrypt_values(inputs, rng)?,
            targets: coordinator.encrypt_values(targets, rng)?,
        })
    }
}

/// Output of [`Network::test`] for one pattern
pub struct Prediction<B: HomomorphicBackend> {
    pub label: String,
    pub outputs: EncryptedVector<B>,
}

/// Encrypted network state
///
/// Borrows the backend for its whole lifetime, so no ciphertext it holds can
/// outlive the keys and parameters it was created under.
pub struct Network<'a, B: HomomorphicBackend> {
    coordinator: LevelCoordinator<'a, B>,

    n_inputs: usize,
    n_hiddens: usize,
    n_outputs: usize,

    input_activations: EncryptedVector<B>,
    hidden_activations: EncryptedVector<B>,
    output_activations: EncryptedVector<B>,

    input_weights: EncryptedMatrix<B>,
    output_weights: EncryptedMatrix<B>,
    input_changes: EncryptedMatrix<B>,
    output_changes: EncryptedMatrix<B>,

    /// Most recent first
    contexts: VecDeque<EncryptedVector<B>>,
    contexts_configured: bool,

    one: EncryptedScalar<B>,
    zero: EncryptedScalar<B>,
}

impl<'a, B: HomomorphicBackend> Network<'a, B> {
    pub fn coordinator(&self) -> &LevelCoordinator<'a, B> {
        &self.coordinator
    }

    /// Input units including bias
    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    /// Hidden units including bias
    pub fn n_hiddens(&self) -> usize {
        self.n_hiddens
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn input_activations(&self) -> &[EncryptedScalar<B>] {
        &self.input_activations
    }

    pub fn hidden_activations(&self) -> &[EncryptedScalar<B>] {
        &self.hidden_activations
    }

    pub fn output_activations(&self) -> &[EncryptedScalar<B>] {
        &self.output_activations
    }

    pub fn input_weights(&self) -> &EncryptedMatrix<B> {
        &self.input_weights
    }

    pub fn output_weights(&self) -> &EncryptedMatrix<B> {
        &self.output_weights
    }

    pub fn input_changes(&self) -> &EncryptedMatrix<B> {
        &self.input_changes
    }

    pub fn output_changes(&self) -> &EncryptedMatrix<B> {
        &self.output_changes
    }

    pub fn contexts(&self) -> &VecDeque<EncryptedVector<B>> {
        &self.contexts
    }

    /// `Σ_j activations[j] · weights[j]`, accumulated at size 3 and normalized
    /// once by whoever consumes the sum
    fn weighted_sum<'w>(
        &self,
        activations: &[EncryptedScalar<B>],
        weights: impl IntoIterator<Item = &'w EncryptedScalar<B>>,
    ) -> Result<EncryptedScalar<B>>
    where
        B: 'w,
    {
        let mut terms = activations
            .iter()
            .zip(weights)
            .map(|(x, w)| self.coordinator.multiply_lazy(x, w));
        let first = match terms.next() {
            Some(term) => term?,
            None => return Ok(self.zero.clone()),
        };
        terms.try_fold(first, |acc, term| self.coordinator.add(&acc, &term?))
    }
}

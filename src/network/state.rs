//! Construction of the encrypted network state

use std::collections::VecDeque;

use rand::{CryptoRng, Rng};
use tracing::{debug, instrument};

use super::{EncryptedMatrix, EncryptedVector, Network};
use crate::core::{Error, HomomorphicBackend, Result};
use crate::level::LevelCoordinator;

/// Initial value of every context unit when no vectors are supplied
const CONTEXT_FILL: f64 = 0.5;

fn check_rows(
    what: &'static str,
    rows: &[Vec<f64>],
    expected_rows: usize,
    expected_cols: usize,
) -> Result<()> {
    if rows.len() != expected_rows {
        return Err(Error::Shape {
            what,
            expected: expected_rows,
            actual: rows.len(),
        });
    }
    match rows.iter().find(|row| row.len() != expected_cols) {
        Some(row) => Err(Error::Shape {
            what,
            expected: expected_cols,
            actual: row.len(),
        }),
        None => Ok(()),
    }
}

impl<'a, B: HomomorphicBackend> Network<'a, B> {
    /// Network with `inputs` and `hiddens` units (bias added to both) and
    /// `outputs` output units, weights drawn uniformly from `[-1, 1]`
    #[instrument(skip_all, fields(inputs = inputs, hiddens = hiddens, outputs = outputs))]
    pub fn init<R: Rng + CryptoRng>(
        backend: &'a B,
        inputs: usize,
        hiddens: usize,
        outputs: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if outputs == 0 {
            return Err(Error::InvalidShape("a network needs at least one output".into()));
        }
        let (n_inputs, n_hiddens) = (inputs + 1, hiddens + 1);
        let mut uniform = |rows: usize, cols: usize| -> Vec<Vec<f64>> {
            (0..rows)
                .map(|_| (0..cols).map(|_| rng.gen_range(-1.0..=1.0)).collect())
                .collect()
        };
        let input_weights = uniform(n_inputs, n_hiddens);
        let output_weights = uniform(n_hiddens, outputs);

        Self::build(backend, &input_weights, &output_weights, rng)
    }

    /// Network with caller-provided cleartext weights.
    ///
    /// `input_weights` is `n_inputs × n_hiddens` and `output_weights` is
    /// `n_hiddens × n_outputs`, bias rows and the bias column included.
    #[instrument(skip_all)]
    pub fn from_weights<R: Rng + CryptoRng>(
        backend: &'a B,
        input_weights: &[Vec<f64>],
        output_weights: &[Vec<f64>],
        rng: &mut R,
    ) -> Result<Self> {
        let n_inputs = input_weights.len();
        if n_inputs == 0 {
            return Err(Error::InvalidShape("input weights have no rows".into()));
        }
        let n_hiddens = input_weights[0].len();
        if n_hiddens == 0 {
            return Err(Error::InvalidShape("input weights have no columns".into()));
        }
        let n_outputs = output_weights.first().map_or(0, Vec::len);
        if n_outputs == 0 {
            return Err(Error::InvalidShape("a network needs at least one output".into()));
        }
        check_rows("input weights", input_weights, n_inputs, n_hiddens)?;
        check_rows("output weights", output_weights, n_hiddens, n_outputs)?;

        Self::build(backend, input_weights, output_weights, rng)
    }

    fn build<R: Rng + CryptoRng>(
        backend: &'a B,
        input_weights: &[Vec<f64>],
        output_weights: &[Vec<f64>],
        rng: &mut R,
    ) -> Result<Self> {
        let coordinator = LevelCoordinator::new(backend);
        let n_inputs = input_weights.len();
        let n_hiddens = output_weights.len();
        let n_outputs = output_weights.first().map_or(0, Vec::len);

        let one = coordinator.encrypt_value(1.0, rng)?;
        let zero = coordinator.encrypt_value(0.0, rng)?;

        let mut encrypt_matrix = |rows: &[Vec<f64>]| -> Result<EncryptedMatrix<B>> {
            rows.iter()
                .map(|row| coordinator.encrypt_values(row, rng))
                .collect()
        };
        let input_weights = encrypt_matrix(input_weights)?;
        let output_weights = encrypt_matrix(output_weights)?;
        let input_changes = encrypt_matrix(vec![vec![0.0; n_hiddens]; n_inputs].as_slice())?;
        let output_changes = encrypt_matrix(vec![vec![0.0; n_outputs]; n_hiddens].as_slice())?;

        debug!(
            n_inputs,
            n_hiddens,
            n_outputs,
            level = %one.level(),
            "network state encrypted"
        );

        Ok(Self {
            coordinator,
            n_inputs,
            n_hiddens,
            n_outputs,
            input_activations: vec![one.clone(); n_inputs],
            hidden_activations: vec![one.clone(); n_hiddens],
            output_activations: vec![one.clone(); n_outputs],
            input_weights,
            output_weights,
            input_changes,
            output_changes,
            contexts: VecDeque::new(),
            contexts_configured: false,
            one,
            zero,
        })
    }

    /// Switch to recurrent mode.
    ///
    /// With `initial == None`, `count` vectors of encrypted 0.5 are created.
    /// Supplied vectors replace `count` and must each hold `n_hiddens` units.
    /// Contexts can be configured once.
    pub fn set_contexts<R: Rng + CryptoRng>(
        &mut self,
        count: usize,
        initial: Option<Vec<EncryptedVector<B>>>,
        rng: &mut R,
    ) -> Result<()> {
        if self.contexts_configured {
            return Err(Error::ContextsAlreadySet {
                count: self.contexts.len(),
            });
        }
        let contexts = match initial {
            Some(vectors) => {
                if let Some((index, vector)) = vectors
                    .iter()
                    .enumerate()
                    .find(|(_, v)| v.len() != self.n_hiddens)
                {
                    return Err(Error::ContextShape {
                        index,
                        expected: self.n_hiddens,
                        actual: vector.len(),
                    });
                }
                vectors
            }
            None => {
                let fill = vec![CONTEXT_FILL; self.n_hiddens];
                (0..count)
                    .map(|_| self.coordinator.encrypt_values(&fill, rng))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        debug!(count = contexts.len(), "recurrent contexts configured");
        self.contexts = contexts.into();
        self.contexts_configured = true;
        Ok(())
    }
}

//! Forward pass

use tracing::{debug, instrument};

use super::activation::activation;
use super::{EncryptedVector, Network};
use crate::core::{Error, HomomorphicBackend, Result};
use crate::level::EncryptedScalar;

impl<'a, B: HomomorphicBackend> Network<'a, B> {
    /// Propagate encrypted `inputs` (bias excluded) to the output layer.
    ///
    /// Each stored context adds its non-bias units, unweighted, to every hidden
    /// pre-activation. Once the hidden layer is computed it becomes the most
    /// recent context and the oldest one is dropped.
    #[instrument(skip_all, fields(inputs = inputs.len()))]
    pub fn update(&mut self, inputs: &[EncryptedScalar<B>]) -> Result<&[EncryptedScalar<B>]> {
        let expected = self.n_inputs - 1;
        if inputs.len() != expected {
            return Err(Error::Shape {
                what: "inputs",
                expected,
                actual: inputs.len(),
            });
        }
        self.input_activations[..expected].clone_from_slice(inputs);

        let coordinator = self.coordinator;
        let bias = self.n_hiddens - 1;
        let mut hidden: EncryptedVector<B> = Vec::with_capacity(self.n_hiddens);
        for i in 0..bias {
            let column = self.input_weights.iter().map(|row| &row[i]);
            let mut sum = self.weighted_sum(&self.input_activations, column)?;
            for context in &self.contexts {
                for unit in &context[..bias] {
                    coordinator.add_assign(&mut sum, unit)?;
                }
            }
            hidden.push(activation(&coordinator, &sum)?);
        }
        hidden.push(self.hidden_activations[bias].clone());

        if !self.contexts.is_empty() {
            self.contexts.pop_back();
            self.contexts.push_front(hidden.clone());
        }
        self.hidden_activations = hidden;

        let outputs = (0..self.n_outputs)
            .map(|i| {
                let column = self.output_weights.iter().map(|row| &row[i]);
                let sum = self.weighted_sum(&self.hidden_activations, column)?;
                activation(&coordinator, &sum)
            })
            .collect::<Result<EncryptedVector<B>>>()?;
        self.output_activations = outputs;

        debug!(
            hidden_level = ?self.hidden_activations.first().map(|h| h.level().index()),
            output_level = ?self.output_activations.first().map(|o| o.level().index()),
            "forward pass complete"
        );
        Ok(&self.output_activations)
    }
}

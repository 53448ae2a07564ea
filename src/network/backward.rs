//! Backward pass and momentum update

use tracing::{debug, instrument};

use super::activation::activation_derivative;
use super::{EncryptedMatrix, EncryptedVector, Network};
use crate::core::{Error, HomomorphicBackend, Result};
use crate::level::{EncryptedScalar, LevelCoordinator};

/// `weights[i][j] += change · learning_rate + changes[i][j] · momentum`, then
/// `changes[i][j] = change`, with `change = deltas[j] · activations[i]`
fn apply_updates<B: HomomorphicBackend>(
    coordinator: &LevelCoordinator<'_, B>,
    weights: &mut EncryptedMatrix<B>,
    changes: &mut EncryptedMatrix<B>,
    activations: &[EncryptedScalar<B>],
    deltas: &[EncryptedScalar<B>],
    learning_rate: f64,
    momentum: f64,
) -> Result<()> {
    let rows = weights.iter_mut().zip(changes.iter_mut()).zip(activations);
    for ((row, change_row), activation) in rows {
        let cells = row.iter_mut().zip(change_row.iter_mut()).zip(deltas);
        for ((weight, previous), delta) in cells {
            let change = coordinator.multiply(delta, activation)?;
            let step = coordinator.multiply_plain(&change, learning_rate)?;
            let inertia = coordinator.multiply_plain(previous, momentum)?;
            let update = coordinator.add(&step, &inertia)?;
            coordinator.add_assign(weight, &update)?;
            *previous = change;
        }
    }
    Ok(())
}

impl<'a, B: HomomorphicBackend> Network<'a, B> {
    /// Back-propagate the error against encrypted `targets` and update the weights.
    ///
    /// `learning_rate` and `momentum` are encoded, never encrypted. Returns the
    /// encrypted loss `Σ 0.5 · (target - output)²` of the last forward pass.
    #[instrument(skip_all, fields(learning_rate = learning_rate, momentum = momentum))]
    pub fn back_propagate(
        &mut self,
        targets: &[EncryptedScalar<B>],
        learning_rate: f64,
        momentum: f64,
    ) -> Result<EncryptedScalar<B>> {
        if targets.len() != self.n_outputs {
            return Err(Error::Shape {
                what: "targets",
                expected: self.n_outputs,
                actual: targets.len(),
            });
        }
        let coordinator = self.coordinator;

        let errors = targets
            .iter()
            .zip(&self.output_activations)
            .map(|(t, y)| coordinator.sub(t, y))
            .collect::<Result<EncryptedVector<B>>>()?;

        let output_deltas = self
            .output_activations
            .iter()
            .zip(&errors)
            .map(|(y, e)| {
                let slope = activation_derivative(&coordinator, &self.one, y)?;
                coordinator.multiply(&slope, e)
            })
            .collect::<Result<EncryptedVector<B>>>()?;

        // Uses the output weights from before this update, bias unit included
        let hidden_deltas = (0..self.n_hiddens)
            .map(|i| {
                let error = self.weighted_sum(&output_deltas, &self.output_weights[i])?;
                let hidden = &self.hidden_activations[i];
                let slope = activation_derivative(&coordinator, &self.one, hidden)?;
                coordinator.multiply(&slope, &error)
            })
            .collect::<Result<EncryptedVector<B>>>()?;

        apply_updates(
            &coordinator,
            &mut self.output_weights,
            &mut self.output_changes,
            &self.hidden_activations,
            &output_deltas,
            learning_rate,
            momentum,
        )?;
        apply_updates(
            &coordinator,
            &mut self.input_weights,
            &mut self.input_changes,
            &self.input_activations,
            &hidden_deltas,
            learning_rate,
            momentum,
        )?;

        let mut loss: Option<EncryptedScalar<B>> = None;
        for error in &errors {
            let term = coordinator.multiply_plain(&coordinator.square(error)?, 0.5)?;
            loss = Some(match loss {
                Some(acc) => coordinator.add(&acc, &term)?,
                None => term,
            });
        }
        let loss = loss.unwrap_or_else(|| self.zero.clone());

        let weight_level = self.input_weights.first().and_then(|row| row.first()).map(|w| w.level().index());
        debug!(loss_level = %loss.level(), ?weight_level, "backward pass complete");
        Ok(loss)
    }
}

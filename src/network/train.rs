//! Training loop and prediction

use tracing::{debug, info, instrument};

use super::{Network, Pattern, Prediction, TrainingConfig};
use crate::core::{HomomorphicBackend, Result};
use crate::level::EncryptedScalar;

impl<'a, B: HomomorphicBackend> Network<'a, B> {
    /// Run `config.iterations` epochs of update + back-propagation over `patterns`.
    ///
    /// Returns one encrypted loss per epoch, the homomorphic sum of the
    /// per-pattern losses. Nothing is decrypted here, so there is no early
    /// stopping: whoever holds the key inspects the losses afterwards.
    #[instrument(skip_all, fields(patterns = patterns.len(), epochs = config.iterations))]
    pub fn train(
        &mut self,
        patterns: &[Pattern<B>],
        config: &TrainingConfig,
    ) -> Result<Vec<EncryptedScalar<B>>> {
        let mut losses = Vec::with_capacity(config.iterations);
        for epoch in 0..config.iterations {
            let mut epoch_loss = self.zero.clone();
            for pattern in patterns {
                self.update(&pattern.inputs)?;
                let loss = self.back_propagate(
                    &pattern.targets,
                    config.learning_rate,
                    config.momentum,
                )?;
                self.coordinator.add_assign(&mut epoch_loss, &loss)?;
            }
            debug!(epoch, level = %epoch_loss.level(), "epoch complete");
            losses.push(epoch_loss);
        }
        info!(epochs = losses.len(), "training complete");
        Ok(losses)
    }

    /// Forward every pattern and pair the encrypted outputs with its label
    #[instrument(skip_all, fields(patterns = patterns.len()))]
    pub fn test(&mut self, patterns: &[Pattern<B>]) -> Result<Vec<Prediction<B>>> {
        patterns
            .iter()
            .map(|pattern| {
                let outputs = self.update(&pattern.inputs)?.to_vec();
                Ok(Prediction {
                    label: pattern.label.clone(),
                    outputs,
                })
            })
            .collect()
    }
}

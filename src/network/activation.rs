//! Polynomial activation surrogate
//!
//! Sigmoid is out of reach for a scheme that only adds and multiplies, so
//! hidden and output units apply `x²` to the normalized pre-activation.
//!
//! The derivative used in back-propagation keeps the sigmoid form `y(1 - y)`
//! evaluated on the surrogate's output, not `2x`. It is an approximation that
//! shapes the training dynamics; replacing it changes what the network learns.

use crate::core::{HomomorphicBackend, Result};
use crate::level::{EncryptedScalar, LevelCoordinator};

/// `normalize(x)²`
pub fn activation<B: HomomorphicBackend>(
    coordinator: &LevelCoordinator<'_, B>,
    x: &EncryptedScalar<B>,
) -> Result<EncryptedScalar<B>> {
    let x = coordinator.normalize(x)?;
    coordinator.square(&x)
}

/// `(1 - y) · y`, with `one` an encryption of 1.0
pub fn activation_derivative<B: HomomorphicBackend>(
    coordinator: &LevelCoordinator<'_, B>,
    one: &EncryptedScalar<B>,
    y: &EncryptedScalar<B>,
) -> Result<EncryptedScalar<B>> {
    let complement = coordinator.sub(one, y)?;
    coordinator.multiply(&complement, y)
}

// src/prelude.rs
//! The "everything" import for fhe_brain.
//!
//! Brings you the backends, the coordinator and the network with one glob:
//! ```rust
//! use fhe_brain::prelude::*;
//! ```

// backend contract
pub use crate::core::{Decryptor, Error, HomomorphicBackend, Level, Result};

// backends and their parameters
pub use crate::backends::{CkksBackend, CkksDecryptor, SimulatedBackend, SimulatedDecryptor};
pub use crate::params::{CkksParams, SimulatedParams};

// engine
pub use crate::level::{EncryptedScalar, LevelCoordinator};
pub use crate::network::{Network, Pattern, Prediction, TrainingConfig};

//! # fhe_brain quickstart
//!
//! ```rust
//! use fhe_brain::prelude::*;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(7);
//! let backend = SimulatedBackend::new(SimulatedParams::deep(64)).unwrap();
//!
//! let mut net = Network::init(&backend, 2, 2, 1, &mut rng).unwrap();
//! let pattern = Pattern::encrypt(net.coordinator(), "1 xor 0", &[1.0, 0.0], &[1.0], &mut rng).unwrap();
//!
//! net.update(&pattern.inputs).unwrap();
//! let loss = net.back_propagate(&pattern.targets, 0.6, 0.4).unwrap();
//!
//! // Only the key holder can look at the loss
//! let value = loss.decrypt(&backend, &SimulatedDecryptor).unwrap();
//! assert!(value >= 0.0);
//! ```
//!
#![doc = include_str!("../README.md")]

pub mod backends;
pub mod core;
pub mod level;
pub mod network;
pub mod params;
pub mod prelude;

// --- Public API exports ---

pub use crate::core::{levels_equal, Decryptor, Error, HomomorphicBackend, Level, Result, SecurityLevel};
pub use backends::{CkksBackend, CkksDecryptor, SimulatedBackend, SimulatedDecryptor};
pub use level::{EncryptedScalar, LevelCoordinator};
pub use network::{Network, Pattern, Prediction, TrainingConfig};
pub use params::{CkksParams, SimulatedParams};

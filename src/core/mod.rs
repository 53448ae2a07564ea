//! Backend-agnostic abstractions
//!
//! The engine talks to any homomorphic scheme through these traits, so the CKKS
//! backend and the simulated backend are interchangeable.

pub mod traits;
pub mod types;

pub use traits::{Decryptor, HomomorphicBackend};
pub use types::{levels_equal, Error, Level, Result, SecurityLevel};

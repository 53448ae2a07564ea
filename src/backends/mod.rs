//! Implementations of [`HomomorphicBackend`](crate::core::HomomorphicBackend)
//!
//! - [`cpu_optimized`]: RNS-CKKS with NTT multiplication and gadget relinearization
//! - [`simulated`]: cleartext values with exact CKKS level/scale bookkeeping

pub mod cpu_optimized;
pub mod simulated;

pub use cpu_optimized::{CkksBackend, CkksDecryptor};
pub use simulated::{SimulatedBackend, SimulatedDecryptor};

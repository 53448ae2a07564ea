//! Common types shared by the backends, the level coordinator and the network

use std::fmt;

use thiserror::Error;

/// Security level of a parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Toy parameters: fast, no security whatsoever
    Insecure,
    /// ~128 bits classical security (HE standard table for the chosen N and log Q)
    Secure128,
}

/// Position of a ciphertext in the modulus chain.
///
/// Level `L` means the moduli `q_0..=q_L` are active. A fresh ciphertext sits at
/// the top of the chain and every rescale moves it one level down; level 0 has no
/// prime left to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub usize);

impl Level {
    /// Level reached after one rescale, or `None` at the bottom of the chain
    pub fn next_down(self) -> Option<Level> {
        self.0.checked_sub(1).map(Level)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Whether two operands may enter a binary homomorphic operation as they are
pub fn levels_equal(a: Level, b: Level) -> bool {
    a == b
}

/// Relative difference below which two scales count as equal.
///
/// Rescaling divides by primes that are close to, not equal to, the scale, so
/// scales drift apart by a few parts per billion per level.
pub const SCALE_RELATIVE_TOLERANCE: f64 = 1e-3;

pub fn scales_compatible(a: f64, b: f64) -> bool {
    (a - b).abs() <= SCALE_RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

/// Errors raised by the backends and the training engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Invalid parameter configuration
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Network dimensions that cannot describe a network
    #[error("invalid network shape: {0}")]
    InvalidShape(String),

    /// Input, target or weight dimensions disagree with the network
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A context vector whose length is not the hidden layer size
    #[error("context vector {index} has length {actual}, expected {expected}")]
    ContextShape {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Contexts are fixed once configured
    #[error("recurrent contexts are already configured ({count} vectors)")]
    ContextsAlreadySet { count: usize },

    /// Operands of a binary operation sit at different levels
    #[error("level mismatch: expected {expected}, got {actual}")]
    LevelMismatch { expected: Level, actual: Level },

    /// Operands of an addition carry incompatible scales
    #[error("scale mismatch: {left:.6e} vs {right:.6e}")]
    ScaleMismatch { left: f64, right: f64 },

    /// Tracked bookkeeping disagrees with what the backend reports
    #[error("level tracking out of sync: tracked {tracked}, backend reports {reported}")]
    LevelTracking { tracked: Level, reported: Level },

    /// Operation requires a ciphertext of a different size
    #[error("ciphertext size {actual} not supported here (expected {expected})")]
    CiphertextSize { expected: usize, actual: usize },

    /// The modulus chain is used up; the parameters cannot support the requested depth
    #[error("multiplicative depth exhausted at {level}: {context}")]
    DepthExhausted { level: Level, context: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

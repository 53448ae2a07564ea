//! Level-accurate CKKS simulator
//!
//! Holds each value in the clear next to the bookkeeping a CKKS ciphertext would
//! carry (level, scale, size) and enforces the same rules as the real backend:
//! binary operations need equal levels and compatible scales, a tensor product
//! needs size-2 operands, every rescale consumes one level and rounds the value to
//! the new scale. Use it to test circuits deeper than any bootstrapping-free
//! parameter set allows. It provides no confidentiality.

use rand::{CryptoRng, RngCore};

use crate::core::types::scales_compatible;
use crate::core::{Decryptor, Error, HomomorphicBackend, Level, Result};
use crate::params::SimulatedParams;

#[derive(Clone, Debug, PartialEq)]
pub struct SimPlaintext {
    pub value: f64,
    pub level: Level,
    pub scale: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimCiphertext {
    pub value: f64,
    pub level: Level,
    pub scale: f64,
    pub size: usize,
}

#[derive(Clone, Debug)]
pub struct SimulatedBackend {
    params: SimulatedParams,
}

/// Opens simulated ciphertexts
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedDecryptor;

impl SimulatedBackend {
    pub fn new(params: SimulatedParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SimulatedParams {
        &self.params
    }

    fn check_binary(&self, a: &SimCiphertext, b: &SimCiphertext) -> Result<()> {
        if a.level != b.level {
            return Err(Error::LevelMismatch {
                expected: a.level,
                actual: b.level,
            });
        }
        Ok(())
    }

    fn check_scales(a: &SimCiphertext, b: &SimCiphertext) -> Result<()> {
        if scales_compatible(a.scale, b.scale) {
            Ok(())
        } else {
            Err(Error::ScaleMismatch {
                left: a.scale,
                right: b.scale,
            })
        }
    }
}

fn quantize(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}

impl HomomorphicBackend for SimulatedBackend {
    type Plaintext = SimPlaintext;
    type Ciphertext = SimCiphertext;

    fn max_level(&self) -> Level {
        self.params.max_level()
    }

    fn default_scale(&self) -> f64 {
        self.params.scale
    }

    fn rescale_divisor(&self, level: Level) -> Result<f64> {
        if level == Level(0) {
            return Err(Error::DepthExhausted {
                level,
                context: "no prime left to rescale by",
            });
        }
        self.params
            .divisors
            .get(level.index())
            .copied()
            .ok_or_else(|| Error::InvalidParams(format!("{} exceeds the simulated chain", level)))
    }

    fn encode(&self, value: f64, level: Level, scale: f64) -> Result<SimPlaintext> {
        if !value.is_finite() {
            return Err(Error::InvalidParams(format!(
                "cannot encode non-finite value {}",
                value
            )));
        }
        if level > self.max_level() {
            return Err(Error::InvalidParams(format!(
                "cannot encode at {} (top is {})",
                level,
                self.max_level()
            )));
        }
        Ok(SimPlaintext {
            value: quantize(value, scale),
            level,
            scale,
        })
    }

    fn decode(&self, pt: &SimPlaintext) -> f64 {
        pt.value
    }

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        pt: &SimPlaintext,
        _rng: &mut R,
    ) -> Result<SimCiphertext> {
        Ok(SimCiphertext {
            value: pt.value,
            level: pt.level,
            scale: pt.scale,
            size: 2,
        })
    }

    fn level(&self, ct: &SimCiphertext) -> Level {
        ct.level
    }

    fn scale(&self, ct: &SimCiphertext) -> f64 {
        ct.scale
    }

    fn size(&self, ct: &SimCiphertext) -> usize {
        ct.size
    }

    fn add(&self, a: &SimCiphertext, b: &SimCiphertext) -> Result<SimCiphertext> {
        self.check_binary(a, b)?;
        Self::check_scales(a, b)?;
        Ok(SimCiphertext {
            value: a.value + b.value,
            size: a.size.max(b.size),
            ..a.clone()
        })
    }

    fn sub(&self, a: &SimCiphertext, b: &SimCiphertext) -> Result<SimCiphertext> {
        self.check_binary(a, b)?;
        Self::check_scales(a, b)?;
        Ok(SimCiphertext {
            value: a.value - b.value,
            size: a.size.max(b.size),
            ..a.clone()
        })
    }

    fn multiply(&self, a: &SimCiphertext, b: &SimCiphertext) -> Result<SimCiphertext> {
        self.check_binary(a, b)?;
        if let Some(ct) = [a, b].into_iter().find(|ct| ct.size != 2) {
            return Err(Error::CiphertextSize {
                expected: 2,
                actual: ct.size,
            });
        }
        Ok(SimCiphertext {
            value: a.value * b.value,
            level: a.level,
            scale: a.scale * b.scale,
            size: 3,
        })
    }

    fn multiply_plain(&self, a: &SimCiphertext, pt: &SimPlaintext) -> Result<SimCiphertext> {
        if a.level != pt.level {
            return Err(Error::LevelMismatch {
                expected: a.level,
                actual: pt.level,
            });
        }
        Ok(SimCiphertext {
            value: a.value * pt.value,
            scale: a.scale * pt.scale,
            ..a.clone()
        })
    }

    fn relinearize(&self, a: &SimCiphertext) -> Result<SimCiphertext> {
        Ok(SimCiphertext {
            size: 2,
            ..a.clone()
        })
    }

    fn rescale_to_next(&self, a: &SimCiphertext) -> Result<SimCiphertext> {
        let divisor = self.rescale_divisor(a.level)?;
        let level = a.level.next_down().ok_or(Error::DepthExhausted {
            level: a.level,
            context: "rescale",
        })?;
        let scale = a.scale / divisor;
        Ok(SimCiphertext {
            value: quantize(a.value, scale),
            level,
            scale,
            size: a.size,
        })
    }

    fn mod_switch_to(&self, a: &SimCiphertext, level: Level) -> Result<SimCiphertext> {
        if level > a.level {
            return Err(Error::LevelMismatch {
                expected: a.level,
                actual: level,
            });
        }
        Ok(SimCiphertext {
            level,
            ..a.clone()
        })
    }
}

impl Decryptor<SimulatedBackend> for SimulatedDecryptor {
    fn decrypt(&self, ct: &SimCiphertext) -> Result<SimPlaintext> {
        Ok(SimPlaintext {
            value: ct.value,
            level: ct.level,
            scale: ct.scale,
        })
    }
}

//! CKKS encoding, encryption and decryption
//!
//! One real number per ciphertext: the value is scaled and rounded into the
//! constant coefficient of the plaintext polynomial. Decoding reconstructs that
//! coefficient over every active prime, so plaintexts at any scale (including
//! products awaiting a rescale) decode correctly as long as |value·scale| < Q/2.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use rand::{CryptoRng, RngCore};

use super::keys::{sample_error, sample_ternary, PublicKey, SecretKey};
use super::ntt::{multiply_rns_polynomials, NttContext};
use super::rns::{RnsBasis, RnsRepresentation};
use crate::core::types::scales_compatible;
use crate::core::{Error, Level, Result};
use crate::params::CkksParams;

/// Plaintext polynomial in RNS form
#[derive(Clone, Debug)]
pub struct Plaintext {
    pub coeffs: Vec<RnsRepresentation>,
    pub scale: f64,
    pub n: usize,
    pub level: Level,
}

/// Ciphertext (c0, c1) or, right after a tensor product, (c0, c1, c2).
///
/// Decrypts as c0 + c1·s (+ c2·s²).
#[derive(Clone, Debug)]
pub struct Ciphertext {
    pub c0: Vec<RnsRepresentation>,
    pub c1: Vec<RnsRepresentation>,
    pub c2: Option<Vec<RnsRepresentation>>,
    pub level: Level,
    pub scale: f64,
    pub n: usize,
}

impl Ciphertext {
    pub fn new(
        c0: Vec<RnsRepresentation>,
        c1: Vec<RnsRepresentation>,
        level: Level,
        scale: f64,
    ) -> Self {
        let n = c0.len();
        Self {
            c0,
            c1,
            c2: None,
            level,
            scale,
            n,
        }
    }

    /// Number of polynomial components
    pub fn size(&self) -> usize {
        if self.c2.is_some() {
            3
        } else {
            2
        }
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.level != other.level {
            return Err(Error::LevelMismatch {
                expected: self.level,
                actual: other.level,
            });
        }
        if !scales_compatible(self.scale, other.scale) {
            return Err(Error::ScaleMismatch {
                left: self.scale,
                right: other.scale,
            });
        }
        Ok(())
    }

    /// Component-wise combination; a missing c2 counts as zero
    fn combine(
        &self,
        other: &Self,
        op: impl Fn(&RnsRepresentation, &RnsRepresentation) -> RnsRepresentation,
    ) -> Result<Self> {
        self.check_compatible(other)?;
        let zip = |a: &[RnsRepresentation], b: &[RnsRepresentation]| -> Vec<RnsRepresentation> {
            a.iter().zip(b).map(|(x, y)| op(x, y)).collect()
        };

        let c2 = match (&self.c2, &other.c2) {
            (None, None) => None,
            (Some(a), Some(b)) => Some(zip(a, b)),
            (Some(a), None) => {
                let zero = vec![RnsRepresentation::zero(&a[0].moduli); a.len()];
                Some(zip(a, &zero))
            }
            (None, Some(b)) => {
                let zero = vec![RnsRepresentation::zero(&b[0].moduli); b.len()];
                Some(zip(&zero, b))
            }
        };

        Ok(Self {
            c0: zip(&self.c0, &other.c0),
            c1: zip(&self.c1, &other.c1),
            c2,
            level: self.level,
            scale: self.scale,
            n: self.n,
        })
    }

    /// Homomorphic addition (scale of the left operand is kept)
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.combine(other, |a, b| a.add(b))
    }

    /// Homomorphic subtraction (scale of the left operand is kept)
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.combine(other, |a, b| a.sub(b))
    }

    /// Drop primes above `level`; the encrypted value and scale are unchanged
    pub fn mod_switch_to_level(&self, level: Level) -> Result<Self> {
        if level > self.level {
            return Err(Error::LevelMismatch {
                expected: self.level,
                actual: level,
            });
        }
        let keep = level.index() + 1;
        let truncate = |poly: &[RnsRepresentation]| -> Vec<RnsRepresentation> {
            poly.iter().map(|c| c.truncate(keep)).collect()
        };

        Ok(Self {
            c0: truncate(&self.c0),
            c1: truncate(&self.c1),
            c2: self.c2.as_deref().map(truncate),
            level,
            scale: self.scale,
            n: self.n,
        })
    }
}

/// Precomputed NTT and CRT data for a parameter set
#[derive(Debug)]
pub struct CkksContext {
    pub params: CkksParams,

    /// One NTT context per prime of the chain
    pub ntt_contexts: Vec<NttContext>,

    /// `bases[l]` reconstructs integers modulo q_0·…·q_l
    bases: Vec<RnsBasis>,
}

impl CkksContext {
    pub fn new(params: CkksParams) -> Result<Self> {
        params.validate()?;

        let ntt_contexts = params
            .moduli
            .iter()
            .map(|&q| NttContext::new(params.n, q))
            .collect::<Result<Vec<_>>>()?;

        let bases = (1..=params.moduli.len())
            .map(|count| RnsBasis::new(&params.moduli[..count]))
            .collect();

        Ok(Self {
            params,
            ntt_contexts,
            bases,
        })
    }

    /// CRT basis for the first `count` primes
    pub fn basis_at_primes(&self, count: usize) -> Result<&RnsBasis> {
        count
            .checked_sub(1)
            .and_then(|i| self.bases.get(i))
            .ok_or_else(|| Error::InvalidParams(format!("no basis for {} primes", count)))
    }

    pub fn basis_at(&self, level: Level) -> Result<&RnsBasis> {
        self.basis_at_primes(level.index() + 1)
    }

    /// Encode `value` as round(value·scale) in the constant coefficient
    pub fn encode(&self, value: f64, level: Level, scale: f64) -> Result<Plaintext> {
        if level > self.params.max_level() {
            return Err(Error::InvalidParams(format!(
                "cannot encode at {} (top is {})",
                level,
                self.params.max_level()
            )));
        }
        let scaled = BigInt::from_f64((value * scale).round()).ok_or_else(|| {
            Error::InvalidParams(format!("cannot encode non-finite value {}", value))
        })?;

        let moduli = self.params.moduli_at(level);
        let mut coeffs = vec![RnsRepresentation::zero(moduli); self.params.n];
        coeffs[0] = RnsRepresentation::from_bigint(&scaled, moduli);

        Ok(Plaintext {
            coeffs,
            scale,
            n: self.params.n,
            level,
        })
    }

    /// Decode the constant coefficient by CRT reconstruction
    pub fn decode(&self, pt: &Plaintext) -> f64 {
        let Ok(basis) = self.basis_at(pt.level) else {
            return f64::NAN;
        };
        let centered = basis.reconstruct_centered(&pt.coeffs[0].values);
        centered.to_f64().unwrap_or(f64::NAN) / pt.scale
    }

    /// Public-key encryption: (b·u + e0 + m, a·u + e1)
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        pt: &Plaintext,
        pk: &PublicKey,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let n = self.params.n;
        let count = pt.level.index() + 1;
        let moduli = self.params.moduli_at(pt.level);

        let a: Vec<RnsRepresentation> = pk.a.iter().map(|c| c.truncate(count)).collect();
        let b: Vec<RnsRepresentation> = pk.b.iter().map(|c| c.truncate(count)).collect();

        let u = sample_ternary(n, moduli, rng);
        let e0 = sample_error(n, moduli, self.params.error_std, rng)?;
        let e1 = sample_error(n, moduli, self.params.error_std, rng)?;

        let b_u = multiply_rns_polynomials(&self.ntt_contexts, &b, &u);
        let a_u = multiply_rns_polynomials(&self.ntt_contexts, &a, &u);

        let c0 = b_u
            .iter()
            .zip(&e0)
            .zip(&pt.coeffs)
            .map(|((x, e), m)| x.add(e).add(m))
            .collect();
        let c1 = a_u.iter().zip(&e1).map(|(x, e)| x.add(e)).collect();

        Ok(Ciphertext::new(c0, c1, pt.level, pt.scale))
    }

    /// m = c0 + c1·s (+ c2·s²)
    pub fn decrypt(&self, ct: &Ciphertext, sk: &SecretKey) -> Plaintext {
        let s = sk.at_primes(ct.level.index() + 1);

        let c1_s = multiply_rns_polynomials(&self.ntt_contexts, &ct.c1, &s);
        let mut m: Vec<RnsRepresentation> =
            ct.c0.iter().zip(&c1_s).map(|(x, y)| x.add(y)).collect();

        if let Some(c2) = &ct.c2 {
            let s2 = multiply_rns_polynomials(&self.ntt_contexts, &s, &s);
            let c2_s2 = multiply_rns_polynomials(&self.ntt_contexts, c2, &s2);
            m = m.iter().zip(&c2_s2).map(|(x, y)| x.add(y)).collect();
        }

        Plaintext {
            coeffs: m,
            scale: ct.scale,
            n: ct.n,
            level: ct.level,
        }
    }
}

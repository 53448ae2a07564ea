//! RNS (Residue Number System) arithmetic
//!
//! A coefficient modulo Q = q₀·q₁·…·q_L is held as its residues modulo each prime.
//! Additions and multiplications act residue-wise; [`RnsBasis`] performs the CRT
//! reconstruction needed by decoding and by the relinearization gadget.

use num_bigint::{BigInt, Sign};
use num_traits::Zero;

/// RNS representation of one polynomial coefficient.
///
/// Represents integer x as (x mod q₀, x mod q₁, ..., x mod q_L).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RnsRepresentation {
    /// Residues: values[i] = x mod moduli[i]
    pub values: Vec<u64>,
    /// Active moduli
    pub moduli: Vec<u64>,
}

impl RnsRepresentation {
    pub fn new(values: Vec<u64>, moduli: Vec<u64>) -> Self {
        debug_assert_eq!(
            values.len(),
            moduli.len(),
            "Number of values must match number of moduli"
        );
        Self { values, moduli }
    }

    pub fn zero(moduli: &[u64]) -> Self {
        Self {
            values: vec![0; moduli.len()],
            moduli: moduli.to_vec(),
        }
    }

    /// Computes x mod qᵢ for each modulus qᵢ
    pub fn from_u64(x: u64, moduli: &[u64]) -> Self {
        let values = moduli.iter().map(|&q| x % q).collect();
        Self {
            values,
            moduli: moduli.to_vec(),
        }
    }

    /// Signed variant: negative values map to q - (|x| mod q)
    pub fn from_i64(x: i64, moduli: &[u64]) -> Self {
        let magnitude = x.unsigned_abs();
        let values = moduli
            .iter()
            .map(|&q| {
                let r = magnitude % q;
                if x < 0 && r != 0 {
                    q - r
                } else {
                    r
                }
            })
            .collect();
        Self {
            values,
            moduli: moduli.to_vec(),
        }
    }

    /// Residues of an arbitrary-precision integer
    pub fn from_bigint(x: &BigInt, moduli: &[u64]) -> Self {
        let values = moduli.iter().map(|&q| bigint_mod_u64(x, q)).collect();
        Self {
            values,
            moduli: moduli.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.moduli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moduli.is_empty()
    }

    /// Keep the first `count` residues (modulus switching)
    pub fn truncate(&self, count: usize) -> Self {
        Self {
            values: self.values[..count].to_vec(),
            moduli: self.moduli[..count].to_vec(),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.moduli, other.moduli, "Moduli must match");

        let values = self
            .values
            .iter()
            .zip(&other.values)
            .zip(&self.moduli)
            .map(|((&a, &b), &q)| add_mod(a, b, q))
            .collect();

        Self {
            values,
            moduli: self.moduli.clone(),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        debug_assert_eq!(self.moduli, other.moduli, "Moduli must match");

        let values = self
            .values
            .iter()
            .zip(&other.values)
            .zip(&self.moduli)
            .map(|((&a, &b), &q)| sub_mod(a, b, q))
            .collect();

        Self {
            values,
            moduli: self.moduli.clone(),
        }
    }

    pub fn negate(&self) -> Self {
        let values = self
            .values
            .iter()
            .zip(&self.moduli)
            .map(|(&val, &q)| if val == 0 { 0 } else { q - val })
            .collect();

        Self {
            values,
            moduli: self.moduli.clone(),
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        debug_assert_eq!(self.moduli, other.moduli, "Moduli must match");

        let values = self
            .values
            .iter()
            .zip(&other.values)
            .zip(&self.moduli)
            .map(|((&a, &b), &q)| mul_mod(a, b, q))
            .collect();

        Self {
            values,
            moduli: self.moduli.clone(),
        }
    }

    /// Multiply by a scalar given by its residues (one per modulus)
    pub fn mul_residues(&self, scalar: &[u64]) -> Self {
        let values = self
            .values
            .iter()
            .zip(scalar)
            .zip(&self.moduli)
            .map(|((&a, &s), &q)| mul_mod(a, s, q))
            .collect();

        Self {
            values,
            moduli: self.moduli.clone(),
        }
    }
}

/// CRT reconstruction data for one prefix q₀..q_L of the modulus chain
#[derive(Clone, Debug)]
pub struct RnsBasis {
    pub moduli: Vec<u64>,
    /// Q = Π qᵢ
    pub modulus: BigInt,
    half_modulus: BigInt,
    /// (Q/qᵢ) · [(Q/qᵢ)^(-1) mod qᵢ], so x = Σ rᵢ·basisᵢ mod Q
    basis: Vec<BigInt>,
}

impl RnsBasis {
    pub fn new(moduli: &[u64]) -> Self {
        let modulus: BigInt = moduli.iter().map(|&q| BigInt::from(q)).product();
        let half_modulus = &modulus / 2;

        let basis = moduli
            .iter()
            .enumerate()
            .map(|(i, &qi)| {
                // (Q/qi) mod qi as a product of the other primes
                let q_hat_mod_qi = moduli
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .fold(1u64, |acc, (_, &qj)| mul_mod(acc, qj % qi, qi));
                let q_hat_inv = mod_pow(q_hat_mod_qi, qi - 2, qi);
                (&modulus / BigInt::from(qi)) * BigInt::from(q_hat_inv)
            })
            .collect();

        Self {
            moduli: moduli.to_vec(),
            modulus,
            half_modulus,
            basis,
        }
    }

    /// Bit length of Q
    pub fn bits(&self) -> u64 {
        self.modulus.bits()
    }

    /// x ∈ [0, Q)
    pub fn reconstruct(&self, residues: &[u64]) -> BigInt {
        let sum = residues
            .iter()
            .zip(&self.basis)
            .fold(BigInt::zero(), |acc, (&r, b)| acc + b * r);
        sum % &self.modulus
    }

    /// x ∈ (-Q/2, Q/2]
    pub fn reconstruct_centered(&self, residues: &[u64]) -> BigInt {
        let x = self.reconstruct(residues);
        if x > self.half_modulus {
            x - &self.modulus
        } else {
            x
        }
    }
}

/// x mod q in [0, q) for a signed big integer
pub fn bigint_mod_u64(x: &BigInt, q: u64) -> u64 {
    let (sign, digits) = (x % q).to_u64_digits();
    let r = digits.first().copied().unwrap_or(0);
    match sign {
        Sign::Minus if r != 0 => q - r,
        _ => r,
    }
}

#[inline(always)]
pub fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    let sum = a + b;
    if sum >= q {
        sum - q
    } else {
        sum
    }
}

#[inline(always)]
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        q - (b - a)
    }
}

#[inline(always)]
pub fn mul_mod(a: u64, b: u64, q: u64) -> u64 {
    ((a as u128 * b as u128) % q as u128) as u64
}

/// base^exp mod m
pub fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1u64;
    base %= m;

    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }

    result
}

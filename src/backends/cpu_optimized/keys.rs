//! Key generation
//!
//! Ternary secret, RLWE public key and a gadget relinearization key. All
//! randomness comes from the caller's RNG.

use rand::{CryptoRng, Rng, RngCore};
use rand_distr::{Distribution, Normal};
use tracing::{debug, instrument};

use super::ckks::CkksContext;
use super::ntt::multiply_rns_polynomials;
use super::rns::{mod_pow, RnsRepresentation};
use crate::core::{Error, Result};

/// Secret key: ternary polynomial over the full chain
#[derive(Clone, Debug)]
pub struct SecretKey {
    pub coeffs: Vec<RnsRepresentation>,
    pub n: usize,
}

impl SecretKey {
    /// Residues restricted to the first `count` primes
    pub fn at_primes(&self, count: usize) -> Vec<RnsRepresentation> {
        self.coeffs.iter().map(|c| c.truncate(count)).collect()
    }
}

/// Public key (a, b = -a·s - e)
#[derive(Clone, Debug)]
pub struct PublicKey {
    pub a: Vec<RnsRepresentation>,
    pub b: Vec<RnsRepresentation>,
    pub n: usize,
}

/// Relinearization key.
///
/// `evk0[t] + evk1[t]·s = B^t·s² - e_t` for gadget base `B = 2^base_w`. Generated
/// over the full chain and truncated to the active primes when used.
#[derive(Clone, Debug)]
pub struct EvaluationKey {
    pub base_w: u32,
    pub evk0: Vec<Vec<RnsRepresentation>>,
    pub evk1: Vec<Vec<RnsRepresentation>>,
    pub n: usize,
}

impl EvaluationKey {
    pub fn num_digits(&self) -> usize {
        self.evk0.len()
    }
}

/// Generates keys against a CKKS context
pub struct KeyContext<'a> {
    ctx: &'a CkksContext,
}

impl<'a> KeyContext<'a> {
    pub fn new(ctx: &'a CkksContext) -> Self {
        Self { ctx }
    }

    /// Generate (public key, secret key, relinearization key)
    #[instrument(skip_all, fields(n = self.ctx.params.n, primes = self.ctx.params.moduli.len()))]
    pub fn keygen<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(PublicKey, SecretKey, EvaluationKey)> {
        let params = &self.ctx.params;
        let n = params.n;
        let moduli = params.moduli.as_slice();

        let sk = SecretKey {
            coeffs: sample_ternary(n, moduli, rng),
            n,
        };

        // b = -a*s - e
        let a = sample_uniform(n, moduli, rng);
        let e = sample_error(n, moduli, params.error_std, rng)?;
        let a_s = multiply_rns_polynomials(&self.ctx.ntt_contexts, &a, &sk.coeffs);
        let b = a_s.iter().zip(&e).map(|(x, y)| x.negate().sub(y)).collect();
        let pk = PublicKey { a, b, n };

        let evk = self.generate_evaluation_key(&sk, rng)?;
        debug!(digits = evk.num_digits(), "keys generated");

        Ok((pk, sk, evk))
    }

    fn generate_evaluation_key<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        rng: &mut R,
    ) -> Result<EvaluationKey> {
        let params = &self.ctx.params;
        let n = params.n;
        let moduli = params.moduli.as_slice();
        let base_w = params.gadget_base_bits;

        let s_squared = multiply_rns_polynomials(&self.ctx.ntt_contexts, &sk.coeffs, &sk.coeffs);

        let q_bits = self.ctx.basis_at_primes(moduli.len())?.bits() as u32;
        let num_digits = q_bits.div_ceil(base_w) as usize;

        let mut evk0 = Vec::with_capacity(num_digits);
        let mut evk1 = Vec::with_capacity(num_digits);

        for t in 0..num_digits {
            // B^t mod q_i; B^t exceeds 64 bits for large t
            let base_power: Vec<u64> = moduli
                .iter()
                .map(|&q| mod_pow(mod_pow(2, base_w as u64, q), t as u64, q))
                .collect();

            let a_t = sample_uniform(n, moduli, rng);
            let e_t = sample_error(n, moduli, params.error_std, rng)?;
            let a_t_s = multiply_rns_polynomials(&self.ctx.ntt_contexts, &a_t, &sk.coeffs);

            // b_t = -a_t*s - e_t + B^t*s^2
            let b_t = a_t_s
                .iter()
                .zip(&e_t)
                .zip(&s_squared)
                .map(|((as_i, e_i), s2_i)| {
                    as_i.negate().sub(e_i).add(&s2_i.mul_residues(&base_power))
                })
                .collect();

            evk0.push(b_t);
            evk1.push(a_t);
        }

        Ok(EvaluationKey {
            base_w,
            evk0,
            evk1,
            n,
        })
    }
}

/// Coefficients uniform in {-1, 0, 1}
pub(crate) fn sample_ternary<R: Rng + ?Sized>(
    n: usize,
    moduli: &[u64],
    rng: &mut R,
) -> Vec<RnsRepresentation> {
    (0..n)
        .map(|_| RnsRepresentation::from_i64(rng.gen_range(-1i64..=1), moduli))
        .collect()
}

/// Coefficients uniform modulo each prime
pub(crate) fn sample_uniform<R: Rng + ?Sized>(
    n: usize,
    moduli: &[u64],
    rng: &mut R,
) -> Vec<RnsRepresentation> {
    (0..n)
        .map(|_| {
            let values = moduli.iter().map(|&q| rng.gen_range(0..q)).collect();
            RnsRepresentation::new(values, moduli.to_vec())
        })
        .collect()
}

/// Rounded Gaussian coefficients
pub(crate) fn sample_error<R: Rng + ?Sized>(
    n: usize,
    moduli: &[u64],
    error_std: f64,
    rng: &mut R,
) -> Result<Vec<RnsRepresentation>> {
    let normal = Normal::new(0.0, error_std)
        .map_err(|e| Error::InvalidParams(format!("error distribution: {}", e)))?;

    Ok((0..n)
        .map(|_| RnsRepresentation::from_i64(normal.sample(rng).round() as i64, moduli))
        .collect())
}

//! Ciphertext multiplication, relinearization and rescaling
//!
//! **Algorithm:**
//! 1. Tensor product: (c0, c1) ⊗ (c0', c1') → (d0, d1, d2)
//! 2. Relinearization: (d0, d1, d2) → (c0'', c1'') using the evaluation key
//! 3. Rescaling: divide by the last prime to bring the scale back near Δ
//!
//! The steps are exposed separately so the caller decides when to pay for
//! relinearization and rescaling.

use num_bigint::BigInt;
use num_traits::{One, Signed};
use rayon::prelude::*;

use super::ckks::{CkksContext, Ciphertext, Plaintext};
use super::keys::EvaluationKey;
use super::ntt::multiply_rns_polynomials;
use super::rns::{mod_pow, RnsBasis, RnsRepresentation};
use crate::core::{Error, Result};

/// Multiply, relinearize and rescale in one go
pub fn multiply_ciphertexts(
    ct1: &Ciphertext,
    ct2: &Ciphertext,
    evk: &EvaluationKey,
    ctx: &CkksContext,
) -> Result<Ciphertext> {
    let product = tensor(ct1, ct2, ctx)?;
    let relinearized = relinearize(&product, evk, ctx)?;
    rescale(&relinearized, ctx)
}

/// (c0, c1) ⊗ (c0', c1') = (c0·c0', c0·c1' + c1·c0', c1·c1')
pub fn tensor(ct1: &Ciphertext, ct2: &Ciphertext, ctx: &CkksContext) -> Result<Ciphertext> {
    if ct1.level != ct2.level {
        return Err(Error::LevelMismatch {
            expected: ct1.level,
            actual: ct2.level,
        });
    }
    for ct in [ct1, ct2] {
        if ct.size() != 2 {
            return Err(Error::CiphertextSize {
                expected: 2,
                actual: ct.size(),
            });
        }
    }

    let mul = |a: &[RnsRepresentation], b: &[RnsRepresentation]| {
        multiply_rns_polynomials(&ctx.ntt_contexts, a, b)
    };

    let d0 = mul(&ct1.c0, &ct2.c0);
    let d1: Vec<RnsRepresentation> = mul(&ct1.c0, &ct2.c1)
        .iter()
        .zip(&mul(&ct1.c1, &ct2.c0))
        .map(|(a, b)| a.add(b))
        .collect();
    let d2 = mul(&ct1.c1, &ct2.c1);

    Ok(Ciphertext {
        c0: d0,
        c1: d1,
        c2: Some(d2),
        level: ct1.level,
        scale: ct1.scale * ct2.scale,
        n: ct1.n,
    })
}

/// Multiply every component by a plaintext polynomial
pub fn multiply_plain(ct: &Ciphertext, pt: &Plaintext, ctx: &CkksContext) -> Result<Ciphertext> {
    if ct.level != pt.level {
        return Err(Error::LevelMismatch {
            expected: ct.level,
            actual: pt.level,
        });
    }
    let mul = |a: &[RnsRepresentation]| multiply_rns_polynomials(&ctx.ntt_contexts, a, &pt.coeffs);

    Ok(Ciphertext {
        c0: mul(&ct.c0),
        c1: mul(&ct.c1),
        c2: ct.c2.as_deref().map(mul),
        level: ct.level,
        scale: ct.scale * pt.scale,
        n: ct.n,
    })
}

/// (d0, d1, d2) → (d0 + Σ dₜ·evk0[t], d1 + Σ dₜ·evk1[t]) where d2 = Σ dₜ·Bᵗ
///
/// A size-2 ciphertext is returned unchanged.
pub fn relinearize(ct: &Ciphertext, evk: &EvaluationKey, ctx: &CkksContext) -> Result<Ciphertext> {
    let Some(d2) = &ct.c2 else {
        return Ok(ct.clone());
    };

    let count = ct.level.index() + 1;
    let basis = ctx.basis_at_primes(count)?;
    let digits = gadget_decompose(d2, evk.base_w, basis);
    if digits.len() > evk.num_digits() {
        return Err(Error::InvalidParams(format!(
            "relinearization needs {} digits, key has {}",
            digits.len(),
            evk.num_digits()
        )));
    }

    let terms: Vec<(Vec<RnsRepresentation>, Vec<RnsRepresentation>)> = digits
        .par_iter()
        .enumerate()
        .map(|(t, digit)| {
            let evk0: Vec<RnsRepresentation> = evk.evk0[t].iter().map(|c| c.truncate(count)).collect();
            let evk1: Vec<RnsRepresentation> = evk.evk1[t].iter().map(|c| c.truncate(count)).collect();
            (
                multiply_rns_polynomials(&ctx.ntt_contexts, digit, &evk0),
                multiply_rns_polynomials(&ctx.ntt_contexts, digit, &evk1),
            )
        })
        .collect();

    let mut c0 = ct.c0.clone();
    let mut c1 = ct.c1.clone();
    for (term0, term1) in &terms {
        for i in 0..c0.len() {
            c0[i] = c0[i].add(&term0[i]);
            c1[i] = c1[i].add(&term1[i]);
        }
    }

    Ok(Ciphertext::new(c0, c1, ct.level, ct.scale))
}

/// Divide by the last active prime with rounding and drop one level
pub fn rescale(ct: &Ciphertext, ctx: &CkksContext) -> Result<Ciphertext> {
    let new_level = ct.level.next_down().ok_or(Error::DepthExhausted {
        level: ct.level,
        context: "rescale",
    })?;
    let moduli = ctx.params.moduli_at(ct.level);
    let q_last = moduli[moduli.len() - 1];
    let new_moduli = &moduli[..moduli.len() - 1];

    // q_last^(-1) mod q_i
    let q_last_inv: Vec<u64> = new_moduli
        .iter()
        .map(|&qi| mod_pow(q_last % qi, qi - 2, qi))
        .collect();

    let rescale_poly = |poly: &[RnsRepresentation]| {
        rescale_polynomial(poly, q_last, new_moduli, &q_last_inv)
    };

    Ok(Ciphertext {
        c0: rescale_poly(&ct.c0),
        c1: rescale_poly(&ct.c1),
        c2: ct.c2.as_deref().map(rescale_poly),
        level: new_level,
        scale: ct.scale / q_last as f64,
        n: ct.n,
    })
}

/// (x - [x]_{q_last}) · q_last^(-1) mod q_i, with [x]_{q_last} centered
fn rescale_polynomial(
    poly: &[RnsRepresentation],
    q_last: u64,
    new_moduli: &[u64],
    q_last_inv: &[u64],
) -> Vec<RnsRepresentation> {
    poly.iter()
        .map(|coeff| {
            let val_mod_qlast = coeff.values[new_moduli.len()];
            let val_centered = if val_mod_qlast > q_last / 2 {
                val_mod_qlast as i64 - q_last as i64
            } else {
                val_mod_qlast as i64
            };
            let correction = RnsRepresentation::from_i64(val_centered, new_moduli);

            coeff
                .truncate(new_moduli.len())
                .sub(&correction)
                .mul_residues(q_last_inv)
        })
        .collect()
}

/// Gadget decomposition with base 2^base_w.
///
/// Each coefficient is CRT-reconstructed and center-lifted to (-Q/2, Q/2], then
/// split into balanced digits dₜ ∈ (-B/2, B/2]. The same integer digit is mapped
/// into every prime, so Σ dₜ·Bᵗ ≡ x modulo each qᵢ.
pub fn gadget_decompose(
    poly: &[RnsRepresentation],
    base_w: u32,
    basis: &RnsBasis,
) -> Vec<Vec<RnsRepresentation>> {
    let moduli = &basis.moduli;
    let n = poly.len();
    let num_digits = (basis.bits() as u32).div_ceil(base_w) as usize;

    let base = BigInt::one() << base_w;
    let half_base = &base / 2;

    let mut digits = vec![vec![RnsRepresentation::zero(moduli); n]; num_digits];

    for (i, coeff) in poly.iter().enumerate() {
        let mut remainder = basis.reconstruct_centered(&coeff.values);

        for digit in digits.iter_mut() {
            // Truncated remainder keeps the sign of `remainder`
            let mut dt = &remainder % &base;
            if dt > half_base {
                dt -= &base;
            } else if dt.is_negative() && -&dt >= half_base {
                dt += &base;
            }

            digit[i] = RnsRepresentation::from_bigint(&dt, moduli);
            remainder = (remainder - &dt) / &base;
        }
    }

    digits
}

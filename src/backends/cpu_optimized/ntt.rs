//! Negacyclic Number Theoretic Transform
//!
//! Polynomial multiplication in Z_q[X]/(X^N + 1) in O(N log N): twist by powers of
//! a primitive 2N-th root ψ, run a cyclic Cooley-Tukey NTT with ω = ψ², multiply
//! pointwise, transform back and untwist.

use rayon::prelude::*;

use super::rns::{add_mod, mod_pow, mul_mod, sub_mod, RnsRepresentation};
use crate::core::{Error, Result};

/// Precomputed data for NTTs modulo one prime
#[derive(Clone, Debug)]
pub struct NttContext {
    /// Polynomial degree (power of 2)
    pub n: usize,

    /// Modulus q ≡ 1 mod 2n
    pub q: u64,

    /// Primitive 2n-th root of unity
    pub psi: u64,

    /// n-th root of unity ω = ψ²
    pub omega: u64,

    /// ψ^i for i in 0..n (twist)
    psi_powers: Vec<u64>,

    /// ψ^(-i)·n^(-1) for i in 0..n (untwist fused with INTT scaling)
    psi_inv_powers_scaled: Vec<u64>,

    /// ω^(n/2^(s+1)) for each butterfly stage s
    stage_roots: Vec<u64>,

    /// ω^(-n/2^(s+1)) for each butterfly stage s
    stage_roots_inv: Vec<u64>,

    pub log_n: usize,
}

impl NttContext {
    /// Create a new NTT context for a prime `q ≡ 1 mod 2n`
    pub fn new(n: usize, q: u64) -> Result<Self> {
        if !n.is_power_of_two() || n < 2 {
            return Err(Error::InvalidParams(format!(
                "polynomial degree {} must be a power of 2",
                n
            )));
        }
        if q < 3 || (q - 1) % (2 * n as u64) != 0 {
            return Err(Error::InvalidParams(format!(
                "modulus {} does not satisfy q ≡ 1 mod {}",
                q,
                2 * n
            )));
        }

        let log_n = n.trailing_zeros() as usize;
        let psi = find_primitive_root(n, q)?;
        let psi_inv = mod_pow(psi, q - 2, q);
        let omega = mul_mod(psi, psi, q);
        let omega_inv = mod_pow(omega, q - 2, q);
        let n_inv = mod_pow(n as u64, q - 2, q);

        let psi_powers = powers(psi, n, q);
        let psi_inv_powers_scaled = powers(psi_inv, n, q)
            .into_iter()
            .map(|p| mul_mod(p, n_inv, q))
            .collect();

        let stage_roots = (0..log_n)
            .map(|s| mod_pow(omega, (n >> (s + 1)) as u64, q))
            .collect();
        let stage_roots_inv = (0..log_n)
            .map(|s| mod_pow(omega_inv, (n >> (s + 1)) as u64, q))
            .collect();

        Ok(Self {
            n,
            q,
            psi,
            omega,
            psi_powers,
            psi_inv_powers_scaled,
            stage_roots,
            stage_roots_inv,
            log_n,
        })
    }

    /// Cyclic forward NTT in place (coefficients → evaluations)
    pub fn forward_ntt(&self, coeffs: &mut [u64]) {
        self.transform(coeffs, &self.stage_roots);
    }

    /// Cyclic inverse NTT in place, without the n^(-1) scaling
    fn inverse_ntt_unscaled(&self, evals: &mut [u64]) {
        self.transform(evals, &self.stage_roots_inv);
    }

    /// Cooley-Tukey decimation-in-time
    fn transform(&self, a: &mut [u64], roots: &[u64]) {
        debug_assert_eq!(a.len(), self.n, "Input must have length n");
        let n = self.n;
        let q = self.q;

        for i in 0..n {
            let j = bit_reverse(i, self.log_n);
            if j > i {
                a.swap(i, j);
            }
        }

        let mut m = 1;
        for &w_m in roots {
            let m2 = m << 1;
            let mut k = 0;
            while k < n {
                let mut w = 1u64;
                for j in 0..m {
                    let t = mul_mod(w, a[k + j + m], q);
                    let u = a[k + j];
                    a[k + j] = add_mod(u, t, q);
                    a[k + j + m] = sub_mod(u, t, q);
                    w = mul_mod(w, w_m, q);
                }
                k += m2;
            }
            m = m2;
        }
    }

    /// Product of two polynomials mod (X^n + 1, q)
    pub fn multiply_polynomials(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        debug_assert_eq!(a.len(), self.n);
        debug_assert_eq!(b.len(), self.n);
        let q = self.q;

        let mut a_ntt: Vec<u64> = a
            .iter()
            .zip(&self.psi_powers)
            .map(|(&x, &p)| mul_mod(x, p, q))
            .collect();
        let mut b_ntt: Vec<u64> = b
            .iter()
            .zip(&self.psi_powers)
            .map(|(&x, &p)| mul_mod(x, p, q))
            .collect();

        self.forward_ntt(&mut a_ntt);
        self.forward_ntt(&mut b_ntt);

        for (x, &y) in a_ntt.iter_mut().zip(&b_ntt) {
            *x = mul_mod(*x, y, q);
        }

        self.inverse_ntt_unscaled(&mut a_ntt);

        for (x, &p) in a_ntt.iter_mut().zip(&self.psi_inv_powers_scaled) {
            *x = mul_mod(*x, p, q);
        }

        a_ntt
    }
}

/// Multiply two RNS polynomials prime by prime.
///
/// The number of active primes is taken from the operands; `ntt_contexts` must
/// cover at least that many.
pub fn multiply_rns_polynomials(
    ntt_contexts: &[NttContext],
    a: &[RnsRepresentation],
    b: &[RnsRepresentation],
) -> Vec<RnsRepresentation> {
    debug_assert_eq!(a.len(), b.len());
    let moduli = match a.first() {
        Some(coeff) => coeff.moduli.clone(),
        None => return Vec::new(),
    };

    let per_prime: Vec<Vec<u64>> = (0..moduli.len())
        .into_par_iter()
        .map(|j| {
            let a_mod_q: Vec<u64> = a.iter().map(|rns| rns.values[j]).collect();
            let b_mod_q: Vec<u64> = b.iter().map(|rns| rns.values[j]).collect();
            ntt_contexts[j].multiply_polynomials(&a_mod_q, &b_mod_q)
        })
        .collect();

    (0..a.len())
        .map(|i| {
            let values = per_prime.iter().map(|column| column[i]).collect();
            RnsRepresentation::new(values, moduli.clone())
        })
        .collect()
}

/// Primitive 2n-th root of unity modulo q.
///
/// For a quadratic non-residue g, ψ = g^((q-1)/2n) satisfies ψ^n = -1.
fn find_primitive_root(n: usize, q: u64) -> Result<u64> {
    let exponent = (q - 1) / (2 * n as u64);
    (2..q.min(1 << 20))
        .find(|&g| mod_pow(g, (q - 1) / 2, q) == q - 1)
        .map(|g| mod_pow(g, exponent, q))
        .filter(|&psi| mod_pow(psi, n as u64, q) == q - 1)
        .ok_or_else(|| {
            Error::InvalidParams(format!("no primitive {}-th root of unity mod {}", 2 * n, q))
        })
}

/// root^i mod q for i in 0..n
fn powers(root: u64, n: usize, q: u64) -> Vec<u64> {
    let mut out = Vec::with_capacity(n);
    let mut acc = 1u64;
    for _ in 0..n {
        out.push(acc);
        acc = mul_mod(acc, root, q);
    }
    out
}

fn bit_reverse(mut x: usize, log_n: usize) -> usize {
    let mut result = 0;
    for _ in 0..log_n {
        result = (result << 1) | (x & 1);
        x >>= 1;
    }
    result
}

//! Parameter sets for the CKKS backend and the simulated backend
//!
//! All CKKS primes are NTT-friendly (q ≡ 1 mod 2N). The chain is laid out as
//! `[q_0, q_1, ..., q_L]`: `q_0` is a 60-bit base prime that is never dropped and
//! holds the decoded value, `q_1..q_L` are ~40-bit scaling primes consumed one per
//! rescale. Scaling primes alternate above and below 2^40 so the scale drift of
//! successive rescales partially cancels.
//!
//! One encrypted training step (forward pass plus back-propagation) consumes ten
//! levels and a forward pass four, so the parameter set bounds how many steps can
//! run before weights must be re-encrypted by the key holder.

use crate::core::{Error, Level, Result, SecurityLevel};

/// CKKS parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CkksParams {
    /// Ring dimension (power of two)
    pub n: usize,

    /// Modulus chain, base prime first
    pub moduli: Vec<u64>,

    /// Scaling factor for fresh encodings
    pub scale: f64,

    /// Standard deviation of the RLWE error distribution
    pub error_std: f64,

    /// Digit width of the relinearization gadget (base B = 2^w)
    pub gadget_base_bits: u32,

    pub security: SecurityLevel,
}

impl CkksParams {
    /// Toy parameters with 16 scaling primes (N=64, insecure)
    ///
    /// Deep enough for one full training step plus a verifying forward pass while
    /// keeping relinearization cheap. Tests only.
    pub fn new_test_depth_16() -> Self {
        Self {
            n: 64,
            moduli: std::iter::once(ntt_primes::Q0_60BIT)
                .chain(ntt_primes::N1024_40BIT.iter().copied())
                .collect(),
            scale: 2f64.powi(40),
            error_std: 3.2,
            gadget_base_bits: 20,
            security: SecurityLevel::Insecure,
        }
    }

    /// Test parameters for NTT development (N=1024, depth 2, insecure)
    pub fn new_test_ntt_1024() -> Self {
        Self {
            n: 1024,
            moduli: vec![
                ntt_primes::Q0_60BIT,
                1099511678977, // (q-1) = 2048 * 536870351
                1099511592961,
            ],
            scale: 2f64.powi(40),
            error_std: 3.2,
            gadget_base_bits: 20,
            security: SecurityLevel::Insecure,
        }
    }

    /// 128-bit parameters (N=16384, log Q = 420, depth 9)
    ///
    /// Covers encrypted inference and the output-layer half of back-propagation;
    /// a full step needs [`CkksParams::new_128bit_deep`].
    pub fn new_128bit() -> Self {
        Self {
            n: 16384,
            moduli: std::iter::once(ntt_primes::Q0_60BIT)
                .chain(ntt_primes::N16384_40BIT.iter().copied())
                .collect(),
            scale: 2f64.powi(40),
            error_std: 3.2,
            gadget_base_bits: 20,
            security: SecurityLevel::Secure128,
        }
    }

    /// 128-bit parameters (N=32768, log Q = 860, depth 20): two training steps
    pub fn new_128bit_deep() -> Self {
        Self {
            n: 32768,
            moduli: std::iter::once(ntt_primes::Q0_60BIT)
                .chain(ntt_primes::N32768_40BIT.iter().copied())
                .collect(),
            scale: 2f64.powi(40),
            error_std: 3.2,
            gadget_base_bits: 20,
            security: SecurityLevel::Secure128,
        }
    }

    /// Prime dropped by a rescale issued at `level`
    pub fn modulus_at_level(&self, level: Level) -> Result<u64> {
        self.moduli
            .get(level.index())
            .copied()
            .ok_or_else(|| Error::InvalidParams(format!("{} exceeds the modulus chain", level)))
    }

    /// Level of a fresh ciphertext
    pub fn max_level(&self) -> Level {
        Level(self.moduli.len().saturating_sub(1))
    }

    /// Active moduli at `level`
    pub fn moduli_at(&self, level: Level) -> &[u64] {
        &self.moduli[..=level.index().min(self.moduli.len() - 1)]
    }

    /// Bit length of the full modulus Q
    pub fn total_modulus_bits(&self) -> u32 {
        self.moduli.iter().map(|&q| 64 - q.leading_zeros()).sum()
    }

    /// Verify all primes are NTT-friendly (q ≡ 1 mod 2N)
    pub fn verify_ntt_friendly(&self) -> bool {
        let two_n = (2 * self.n) as u64;
        self.moduli.iter().all(|&q| q > 1 && (q - 1) % two_n == 0)
    }

    /// Check the parameter set before building a context from it
    pub fn validate(&self) -> Result<()> {
        if !self.n.is_power_of_two() || self.n < 2 || self.n > 32768 {
            return Err(Error::InvalidParams(format!(
                "ring dimension {} must be a power of two in [2, 32768]",
                self.n
            )));
        }
        if self.moduli.len() < 2 {
            return Err(Error::InvalidParams(
                "modulus chain needs a base prime and at least one scaling prime".into(),
            ));
        }
        if let Some(&q) = self.moduli.iter().find(|&&q| q >= 1 << 62) {
            return Err(Error::InvalidParams(format!("modulus {} exceeds 62 bits", q)));
        }
        if !self.verify_ntt_friendly() {
            return Err(Error::InvalidParams(format!(
                "every modulus must satisfy q ≡ 1 mod {}",
                2 * self.n
            )));
        }
        if let Some(&q) = self.moduli.iter().find(|&&q| !is_prime(q)) {
            return Err(Error::InvalidParams(format!("modulus {} is not prime", q)));
        }
        for (i, a) in self.moduli.iter().enumerate() {
            if self.moduli[i + 1..].contains(a) {
                return Err(Error::InvalidParams(format!("modulus {} appears twice", a)));
            }
        }
        if !(self.scale > 1.0) {
            return Err(Error::InvalidParams(format!("scale {} must exceed 1", self.scale)));
        }
        if !(self.error_std > 0.0) {
            return Err(Error::InvalidParams("error_std must be positive".into()));
        }
        if self.gadget_base_bits == 0 || self.gadget_base_bits > 30 {
            return Err(Error::InvalidParams(format!(
                "gadget base bits {} outside [1, 30]",
                self.gadget_base_bits
            )));
        }
        Ok(())
    }
}

impl Default for CkksParams {
    fn default() -> Self {
        Self::new_test_depth_16()
    }
}

/// Chain description for the simulated backend
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedParams {
    /// Scale of fresh encodings
    pub scale: f64,

    /// `divisors[l]` is what a rescale at level `l` divides by (`divisors[0]` unused)
    pub divisors: Vec<f64>,
}

impl SimulatedParams {
    /// Chain of `levels` rescales, each dividing by exactly the scale
    pub fn deep(levels: usize) -> Self {
        let scale = 2f64.powi(40);
        Self {
            scale,
            divisors: vec![scale; levels + 1],
        }
    }

    /// Same chain shape as a CKKS parameter set
    pub fn mirror(params: &CkksParams) -> Self {
        Self {
            scale: params.scale,
            divisors: params.moduli.iter().map(|&q| q as f64).collect(),
        }
    }

    pub fn max_level(&self) -> Level {
        Level(self.divisors.len().saturating_sub(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.divisors.len() < 2 {
            return Err(Error::InvalidParams("simulated chain needs at least one level".into()));
        }
        if !(self.scale > 1.0) || self.divisors.iter().any(|&d| !(d > 1.0)) {
            return Err(Error::InvalidParams("scale and divisors must exceed 1".into()));
        }
        Ok(())
    }
}

impl Default for SimulatedParams {
    fn default() -> Self {
        Self::deep(4096)
    }
}

/// Deterministic Miller-Rabin for 64-bit integers
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    let mul = |a: u64, b: u64| ((a as u128 * b as u128) % n as u128) as u64;
    let pow = |mut base: u64, mut exp: u64| {
        let mut acc = 1u64;
        while exp > 0 {
            if exp & 1 == 1 {
                acc = mul(acc, base);
            }
            base = mul(base, base);
            exp >>= 1;
        }
        acc
    };

    'witness: for &a in &WITNESSES {
        let mut x = pow(a, d);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul(x, x);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Precomputed NTT-friendly primes
pub mod ntt_primes {
    /// 60-bit base prime, ≡ 1 mod 65536 (valid for every N up to 32768)
    pub const Q0_60BIT: u64 = 1152921504606584833;

    /// ~40-bit scaling primes ≡ 1 mod 2048 (N ≤ 1024), alternating around 2^40
    pub const N1024_40BIT: [u64; 16] = [
        1099511678977,
        1099511592961,
        1099511683073,
        1099511590913,
        1099511795713,
        1099511560193,
        1099511799809,
        1099511556097,
        1099511836673,
        1099511549953,
        1099511912449,
        1099511525377,
        1099511922689,
        1099511492609,
        1099511990273,
        1099511480321,
    ];

    /// ~40-bit scaling primes ≡ 1 mod 32768 (N ≤ 16384)
    pub const N16384_40BIT: [u64; 9] = [
        1099511922689,
        1099510054913,
        1099512938497,
        1099508121601,
        1099514314753,
        1099507695617,
        1099514478593,
        1099506515969,
        1099515691009,
    ];

    /// ~40-bit scaling primes ≡ 1 mod 65536 (N ≤ 32768)
    pub const N32768_40BIT: [u64; 20] = [
        1099512938497,
        1099510054913,
        1099514314753,
        1099507695617,
        1099515691009,
        1099506515969,
        1099516280833,
        1099504549889,
        1099516542977,
        1099503894529,
        1099516870657,
        1099503370241,
        1099518246913,
        1099502714881,
        1099520606209,
        1099502518273,
        1099521458177,
        1099501731841,
        1099522375681,
        1099500814337,
    ];
}

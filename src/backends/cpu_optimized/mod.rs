//! RNS-CKKS backend on the CPU
//!
//! **Pieces:**
//! - Negacyclic NTT polynomial multiplication per prime
//! - RNS arithmetic with BigInt CRT reconstruction
//! - Public-key encryption, gadget relinearization key
//! - Tensor product, relinearization and rescale as separate steps
//!
//! [`CkksBackend`] holds the public and relinearization keys and implements
//! [`HomomorphicBackend`]; the secret key stays in [`CkksDecryptor`].

use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use tracing::instrument;

use crate::core::{Decryptor, Error, HomomorphicBackend, Level, Result};
use crate::params::CkksParams;

/// Negacyclic NTT - O(n log n) polynomial multiplication
pub mod ntt;

/// RNS arithmetic and CRT reconstruction
pub mod rns;

/// Encoding, encryption and decryption
pub mod ckks;

/// Key generation
pub mod keys;

/// Tensor product, relinearization, rescale
pub mod multiplication;

pub use ckks::{Ciphertext, CkksContext, Plaintext};
pub use keys::{EvaluationKey, KeyContext, PublicKey, SecretKey};

/// Evaluation side of the CKKS scheme: public key and relinearization key only
#[derive(Clone, Debug)]
pub struct CkksBackend {
    ctx: Arc<CkksContext>,
    pk: PublicKey,
    evk: EvaluationKey,
}

/// Secret-key holder for [`CkksBackend`] ciphertexts
#[derive(Clone, Debug)]
pub struct CkksDecryptor {
    ctx: Arc<CkksContext>,
    sk: SecretKey,
}

impl CkksBackend {
    pub fn new(ctx: Arc<CkksContext>, pk: PublicKey, evk: EvaluationKey) -> Self {
        Self { ctx, pk, evk }
    }

    /// Build a context, generate keys and split them between evaluator and decryptor
    #[instrument(skip_all, fields(n = params.n, primes = params.moduli.len()))]
    pub fn generate<R: RngCore + CryptoRng>(
        params: CkksParams,
        rng: &mut R,
    ) -> Result<(CkksBackend, CkksDecryptor)> {
        let ctx = Arc::new(CkksContext::new(params)?);
        let (pk, sk, evk) = KeyContext::new(&ctx).keygen(rng)?;

        Ok((
            CkksBackend::new(Arc::clone(&ctx), pk, evk),
            CkksDecryptor { ctx, sk },
        ))
    }

    pub fn context(&self) -> &CkksContext {
        &self.ctx
    }

    pub fn params(&self) -> &CkksParams {
        &self.ctx.params
    }
}

impl HomomorphicBackend for CkksBackend {
    type Plaintext = Plaintext;
    type Ciphertext = Ciphertext;

    fn max_level(&self) -> Level {
        self.ctx.params.max_level()
    }

    fn default_scale(&self) -> f64 {
        self.ctx.params.scale
    }

    fn rescale_divisor(&self, level: Level) -> Result<f64> {
        if level == Level(0) {
            return Err(Error::DepthExhausted {
                level,
                context: "no prime left to rescale by",
            });
        }
        Ok(self.ctx.params.modulus_at_level(level)? as f64)
    }

    fn encode(&self, value: f64, level: Level, scale: f64) -> Result<Plaintext> {
        self.ctx.encode(value, level, scale)
    }

    fn decode(&self, pt: &Plaintext) -> f64 {
        self.ctx.decode(pt)
    }

    fn encrypt<R: RngCore + CryptoRng>(&self, pt: &Plaintext, rng: &mut R) -> Result<Ciphertext> {
        self.ctx.encrypt(pt, &self.pk, rng)
    }

    fn level(&self, ct: &Ciphertext) -> Level {
        ct.level
    }

    fn scale(&self, ct: &Ciphertext) -> f64 {
        ct.scale
    }

    fn size(&self, ct: &Ciphertext) -> usize {
        ct.size()
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        a.add(b)
    }

    fn sub(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        a.sub(b)
    }

    fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        multiplication::tensor(a, b, &self.ctx)
    }

    fn multiply_plain(&self, a: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        multiplication::multiply_plain(a, pt, &self.ctx)
    }

    fn relinearize(&self, a: &Ciphertext) -> Result<Ciphertext> {
        multiplication::relinearize(a, &self.evk, &self.ctx)
    }

    fn rescale_to_next(&self, a: &Ciphertext) -> Result<Ciphertext> {
        multiplication::rescale(a, &self.ctx)
    }

    fn mod_switch_to(&self, a: &Ciphertext, level: Level) -> Result<Ciphertext> {
        a.mod_switch_to_level(level)
    }
}

impl Decryptor<CkksBackend> for CkksDecryptor {
    fn decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        Ok(self.ctx.decrypt(ct, &self.sk))
    }
}

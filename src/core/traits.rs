//! Core traits for the homomorphic backends
//!
//! The training engine is generic over [`HomomorphicBackend`]: it only ever encodes,
//! encrypts and evaluates. Decryption lives behind the separate [`Decryptor`] trait,
//! implemented by whoever holds the secret key (tests, the verifying party).
//!
//! Backends are strict: binary operations on operands at different
//! levels fail with [`Error::LevelMismatch`](super::types::Error::LevelMismatch)
//! instead of realigning silently. Realignment is the job of the
//! [`LevelCoordinator`](crate::level::LevelCoordinator).

use std::fmt::Debug;

use rand::{CryptoRng, RngCore};

use super::types::{Level, Result};

/// Single-slot approximate-arithmetic homomorphic scheme
pub trait HomomorphicBackend {
    /// Encoded (unencrypted) value
    type Plaintext: Clone + Debug;

    /// Encrypted value
    type Ciphertext: Clone + Debug;

    // === Chain description ===

    /// Level of a freshly encrypted ciphertext
    fn max_level(&self) -> Level;

    /// Scale used for fresh encodings
    fn default_scale(&self) -> f64;

    /// Divisor applied by `rescale_to_next` on a ciphertext at `level`
    fn rescale_divisor(&self, level: Level) -> Result<f64>;

    // === Encoding / encryption ===

    /// Encode a real number at the given level and scale
    fn encode(&self, value: f64, level: Level, scale: f64) -> Result<Self::Plaintext>;

    /// Decode a plaintext back to a real number
    fn decode(&self, pt: &Self::Plaintext) -> f64;

    /// Encrypt under the public key, drawing fresh randomness from `rng`
    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        pt: &Self::Plaintext,
        rng: &mut R,
    ) -> Result<Self::Ciphertext>;

    // === Inspection ===

    fn level(&self, ct: &Self::Ciphertext) -> Level;

    fn scale(&self, ct: &Self::Ciphertext) -> f64;

    /// Number of polynomial components: 2 when canonical, 3 after a tensor product
    fn size(&self, ct: &Self::Ciphertext) -> usize;

    // === Arithmetic ===

    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    fn sub(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Tensor product; the result has size 3 and scale `a.scale * b.scale`
    fn multiply(&self, a: &Self::Ciphertext, b: &Self::Ciphertext)
        -> Result<Self::Ciphertext>;

    /// Product with an encoded constant; the result scale is the product of scales
    fn multiply_plain(
        &self,
        a: &Self::Ciphertext,
        pt: &Self::Plaintext,
    ) -> Result<Self::Ciphertext>;

    fn square(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.multiply(a, a)
    }

    /// Bring a size-3 ciphertext back to size 2 with the relinearization key
    fn relinearize(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Divide by the last active prime and drop one level
    fn rescale_to_next(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Drop primes down to `level` without touching the scale
    fn mod_switch_to(&self, a: &Self::Ciphertext, level: Level) -> Result<Self::Ciphertext>;

    // === In-place variants ===

    fn add_inplace(&self, a: &mut Self::Ciphertext, b: &Self::Ciphertext) -> Result<()> {
        *a = self.add(a, b)?;
        Ok(())
    }

    fn sub_inplace(&self, a: &mut Self::Ciphertext, b: &Self::Ciphertext) -> Result<()> {
        *a = self.sub(a, b)?;
        Ok(())
    }

    fn multiply_inplace(&self, a: &mut Self::Ciphertext, b: &Self::Ciphertext) -> Result<()> {
        *a = self.multiply(a, b)?;
        Ok(())
    }
}

/// Secret-key holder able to open ciphertexts of backend `B`
pub trait Decryptor<B: HomomorphicBackend> {
    fn decrypt(&self, ct: &B::Ciphertext) -> Result<B::Plaintext>;

    /// Decrypt and decode in one step
    fn decrypt_value(&self, backend: &B, ct: &B::Ciphertext) -> Result<f64> {
        Ok(backend.decode(&self.decrypt(ct)?))
    }
}

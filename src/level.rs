//! Level/scale coordinator
//!
//! Every ciphertext the engine touches is an [`EncryptedScalar`], which carries its
//! level, scale and size next to the backend ciphertext. The
//! [`LevelCoordinator`] is the only code that issues backend arithmetic: it
//! brings operands to a common level and scale before each binary operation,
//! relinearizes and rescales after products, and checks after every call that
//! the level it tracked is the one the backend reports.
//!
//! Products come in two flavours. [`LevelCoordinator::multiply`] returns a
//! canonical ciphertext one level down. [`LevelCoordinator::multiply_lazy`]
//! leaves the tensor product at size 3 and squared scale, so a dot product pays
//! for a single relinearize/rescale once the sum is complete.

use std::borrow::Cow;
use std::fmt;

use rand::{CryptoRng, RngCore};
use tracing::trace;

use crate::core::types::scales_compatible;
use crate::core::{Decryptor, Error, HomomorphicBackend, Level, Result};

/// A backend ciphertext with first-class level, scale and size
pub struct EncryptedScalar<B: HomomorphicBackend> {
    inner: B::Ciphertext,
    level: Level,
    scale: f64,
    size: usize,
}

impl<B: HomomorphicBackend> EncryptedScalar<B> {
    pub fn inner(&self) -> &B::Ciphertext {
        &self.inner
    }

    pub fn into_inner(self) -> B::Ciphertext {
        self.inner
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Open the value; only the holder of the secret key can do this
    pub fn decrypt<D: Decryptor<B>>(&self, backend: &B, decryptor: &D) -> Result<f64> {
        decryptor.decrypt_value(backend, &self.inner)
    }
}

impl<B: HomomorphicBackend> Clone for EncryptedScalar<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            level: self.level,
            scale: self.scale,
            size: self.size,
        }
    }
}

impl<B: HomomorphicBackend> fmt::Debug for EncryptedScalar<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedScalar")
            .field("level", &self.level)
            .field("scale", &self.scale)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Issues backend operations on [`EncryptedScalar`]s with level and scale management
pub struct LevelCoordinator<'a, B: HomomorphicBackend> {
    backend: &'a B,
}

impl<'a, B: HomomorphicBackend> Clone for LevelCoordinator<'a, B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend,
        }
    }
}

impl<'a, B: HomomorphicBackend> Copy for LevelCoordinator<'a, B> {}

impl<'a, B: HomomorphicBackend> LevelCoordinator<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Wrap a backend result, checking the tracked level against the backend's
    fn track(
        &self,
        inner: B::Ciphertext,
        level: Level,
        scale: f64,
        size: usize,
    ) -> Result<EncryptedScalar<B>> {
        let reported = self.backend.level(&inner);
        if reported != level {
            return Err(Error::LevelTracking {
                tracked: level,
                reported,
            });
        }
        Ok(EncryptedScalar {
            inner,
            level,
            scale,
            size,
        })
    }

    /// Adopt a ciphertext produced outside the coordinator
    pub fn wrap(&self, inner: B::Ciphertext) -> EncryptedScalar<B> {
        EncryptedScalar {
            level: self.backend.level(&inner),
            scale: self.backend.scale(&inner),
            size: self.backend.size(&inner),
            inner,
        }
    }

    /// Encrypt a fresh value at the top of the chain and the default scale
    pub fn encrypt_value<R: RngCore + CryptoRng>(
        &self,
        value: f64,
        rng: &mut R,
    ) -> Result<EncryptedScalar<B>> {
        let level = self.backend.max_level();
        let scale = self.backend.default_scale();
        let pt = self.backend.encode(value, level, scale)?;
        let ct = self.backend.encrypt(&pt, rng)?;
        self.track(ct, level, scale, 2)
    }

    pub fn encrypt_values<R: RngCore + CryptoRng>(
        &self,
        values: &[f64],
        rng: &mut R,
    ) -> Result<Vec<EncryptedScalar<B>>> {
        values
            .iter()
            .map(|&v| self.encrypt_value(v, rng))
            .collect()
    }

    /// Distance of a scale from the default scale, in bits
    fn scale_distance(&self, scale: f64) -> f64 {
        (scale / self.backend.default_scale()).log2().abs()
    }

    /// A rescale is pending when dividing by the next prime moves the scale
    /// closer to the default scale
    fn rescale_pending(&self, x: &EncryptedScalar<B>) -> Result<bool> {
        if scales_compatible(x.scale, self.backend.default_scale()) {
            return Ok(false);
        }
        let divisor = self.backend.rescale_divisor(x.level)?;
        Ok(self.scale_distance(x.scale / divisor) < self.scale_distance(x.scale))
    }

    /// Drop `x` to `level` by discarding primes; the scale is unchanged
    pub fn mod_switch(&self, x: &EncryptedScalar<B>, level: Level) -> Result<EncryptedScalar<B>> {
        trace!(from = %x.level, to = %level, "mod-switching operand");
        let ct = self.backend.mod_switch_to(&x.inner, level)?;
        self.track(ct, level, x.scale, x.size)
    }

    /// Bring two operands to the lower of their levels
    pub fn align<'x>(
        &self,
        a: &'x EncryptedScalar<B>,
        b: &'x EncryptedScalar<B>,
    ) -> Result<(Cow<'x, EncryptedScalar<B>>, Cow<'x, EncryptedScalar<B>>)> {
        let top = self.backend.max_level();
        if let Some(x) = [a, b].into_iter().find(|x| x.level > top) {
            return Err(Error::DepthExhausted {
                level: x.level,
                context: "operand sits above the top of the modulus chain",
            });
        }
        Ok(match a.level.cmp(&b.level) {
            std::cmp::Ordering::Equal => (Cow::Borrowed(a), Cow::Borrowed(b)),
            std::cmp::Ordering::Greater => (Cow::Owned(self.mod_switch(a, b.level)?), Cow::Borrowed(b)),
            std::cmp::Ordering::Less => (Cow::Borrowed(a), Cow::Owned(self.mod_switch(b, a.level)?)),
        })
    }

    fn relinearize(&self, x: &EncryptedScalar<B>) -> Result<EncryptedScalar<B>> {
        let ct = self.backend.relinearize(&x.inner)?;
        self.track(ct, x.level, x.scale, 2)
    }

    fn rescale(&self, x: &EncryptedScalar<B>) -> Result<EncryptedScalar<B>> {
        let next = x.level.next_down().ok_or(Error::DepthExhausted {
            level: x.level,
            context: "rescale",
        })?;
        let divisor = self.backend.rescale_divisor(x.level)?;
        let ct = self.backend.rescale_to_next(&x.inner)?;
        self.track(ct, next, x.scale / divisor, x.size)
    }

    fn normalized<'x>(&self, x: &'x EncryptedScalar<B>) -> Result<Cow<'x, EncryptedScalar<B>>> {
        let mut out = Cow::Borrowed(x);
        if out.size == 3 {
            out = Cow::Owned(self.relinearize(&out)?);
        }
        if self.rescale_pending(&out)? {
            out = Cow::Owned(self.rescale(&out)?);
        }
        Ok(out)
    }

    /// Relinearize a size-3 ciphertext and apply a pending rescale
    pub fn normalize(&self, x: &EncryptedScalar<B>) -> Result<EncryptedScalar<B>> {
        self.normalized(x).map(Cow::into_owned)
    }

    /// Normalize whichever operand is further from the default scale, if the
    /// scales disagree
    fn match_scales<'x>(
        &self,
        a: &'x EncryptedScalar<B>,
        b: &'x EncryptedScalar<B>,
    ) -> Result<(Cow<'x, EncryptedScalar<B>>, Cow<'x, EncryptedScalar<B>>)> {
        if scales_compatible(a.scale, b.scale) {
            return Ok((Cow::Borrowed(a), Cow::Borrowed(b)));
        }
        if self.scale_distance(a.scale) >= self.scale_distance(b.scale) {
            Ok((self.normalized(a)?, Cow::Borrowed(b)))
        } else {
            Ok((Cow::Borrowed(a), self.normalized(b)?))
        }
    }

    fn combine<F>(
        &self,
        a: &EncryptedScalar<B>,
        b: &EncryptedScalar<B>,
        op: F,
    ) -> Result<EncryptedScalar<B>>
    where
        F: Fn(&B, &B::Ciphertext, &B::Ciphertext) -> Result<B::Ciphertext>,
    {
        let (a, b) = self.match_scales(a, b)?;
        let (a, b) = self.align(&a, &b)?;
        if !scales_compatible(a.scale, b.scale) {
            return Err(Error::ScaleMismatch {
                left: a.scale,
                right: b.scale,
            });
        }
        let ct = op(self.backend, &a.inner, &b.inner)?;
        self.track(ct, a.level, a.scale, a.size.max(b.size))
    }

    /// `a + b`; the result keeps the scale of `a`
    pub fn add(&self, a: &EncryptedScalar<B>, b: &EncryptedScalar<B>) -> Result<EncryptedScalar<B>> {
        self.combine(a, b, |backend, x, y| backend.add(x, y))
    }

    /// `a - b`; the result keeps the scale of `a`
    pub fn sub(&self, a: &EncryptedScalar<B>, b: &EncryptedScalar<B>) -> Result<EncryptedScalar<B>> {
        self.combine(a, b, |backend, x, y| backend.sub(x, y))
    }

    pub fn add_assign(&self, acc: &mut EncryptedScalar<B>, x: &EncryptedScalar<B>) -> Result<()> {
        *acc = self.add(acc, x)?;
        Ok(())
    }

    /// Tensor product of normalized, aligned operands, left at size 3
    pub fn multiply_lazy(
        &self,
        a: &EncryptedScalar<B>,
        b: &EncryptedScalar<B>,
    ) -> Result<EncryptedScalar<B>> {
        let a = self.normalized(a)?;
        let b = self.normalized(b)?;
        let (a, b) = self.align(&a, &b)?;
        let ct = self.backend.multiply(&a.inner, &b.inner)?;
        self.track(ct, a.level, a.scale * b.scale, 3)
    }

    /// `a · b`, relinearized and rescaled one level down
    pub fn multiply(&self, a: &EncryptedScalar<B>, b: &EncryptedScalar<B>) -> Result<EncryptedScalar<B>> {
        let product = self.multiply_lazy(a, b)?;
        self.rescale(&self.relinearize(&product)?)
    }

    pub fn square(&self, x: &EncryptedScalar<B>) -> Result<EncryptedScalar<B>> {
        let x = self.normalized(x)?;
        let ct = self.backend.square(&x.inner)?;
        let product = self.track(ct, x.level, x.scale * x.scale, 3)?;
        self.rescale(&self.relinearize(&product)?)
    }

    /// `x · constant` for a cleartext constant.
    ///
    /// The constant is encoded at the scale of the prime the following rescale
    /// divides by, so the result comes back at the scale of `x`, one level down.
    pub fn multiply_plain(&self, x: &EncryptedScalar<B>, constant: f64) -> Result<EncryptedScalar<B>> {
        let x = self.normalized(x)?;
        let divisor = self.backend.rescale_divisor(x.level)?;
        let pt = self.backend.encode(constant, x.level, divisor)?;
        let ct = self.backend.multiply_plain(&x.inner, &pt)?;
        let scaled = self.track(ct, x.level, x.scale * divisor, x.size)?;
        self.rescale(&scaled)
    }
}

//! AEAD encryption and key derivation for the encrypted filesystem.
//!
//! Every byte the filesystem persists passes through [`encrypt`]/[`decrypt`].
//! The on-wire envelope is `nonce(12) || ciphertext || tag(16)`, a plain
//! concatenation with no extra header, so that implementations in other
//! languages can interoperate with the same bytes on disk.

use std::num::NonZeroU32;

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length in bytes of the random nonce prefixed to every ciphertext.
pub const NONCE_LEN: usize = 12;
/// Length in bytes of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;
/// Length in bytes of a master key.
pub const KEY_LEN: usize = 32;

/// Default iteration count used by [`derive_key`] when the caller does not
/// pick one explicitly. The spec requires at least 10,000.
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("iteration count must be >= 10_000, got {0}")]
    IterationsTooLow(u32),
}

/// A 256-bit master key held only in memory, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Wraps raw key bytes. Callers are responsible for sourcing them from a
    /// secure place (a KMS, `generate_key`, or `derive_key`).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MasterKey").field(&"..").finish()
    }
}

/// Generates a fresh random 256-bit key using the OS RNG.
#[must_use]
pub fn generate_key() -> MasterKey {
    let key = Aes256Gcm::generate_key(&mut OsRng);
    MasterKey(key.into())
}

/// Derives a 256-bit key from a password and salt via PBKDF2-HMAC-SHA256.
///
/// `iterations` must be at least 10,000; lower values are rejected rather
/// than silently weakened.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: NonZeroU32) -> Result<MasterKey, Error> {
    if iterations.get() < 10_000 {
        return Err(Error::IterationsTooLow(iterations.get()));
    }
    let mut out = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, iterations.get(), &mut out);
    Ok(MasterKey(out))
}

/// Encrypts `plain` under `key`, returning `nonce || ciphertext || tag`.
///
/// A fresh random nonce is drawn for every call, so encrypting the same
/// plaintext twice yields different ciphertexts.
#[must_use]
pub fn encrypt(key: &MasterKey, plain: &[u8]) -> Vec<u8> {
    let cipher = key.cipher();
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    // encryption with a fresh random 96-bit nonce cannot fail.
    let ciphertext = cipher.encrypt(&nonce, plain).expect("AEAD encryption failed");
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypts an envelope produced by [`encrypt`].
///
/// Returns `None` (never an error) if the envelope is malformed or
/// authentication fails — the caller treats that uniformly as "key
/// mismatch or tampering" (spec §4.A, §7 `Corruption`).
#[must_use]
pub fn decrypt(key: &MasterKey, cipher: &[u8]) -> Option<Vec<u8>> {
    if cipher.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    let (nonce_bytes, rest) = cipher.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    key.cipher().decrypt(nonce, rest).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_zero_key() {
        let key = MasterKey::from_bytes([0u8; KEY_LEN]);
        let plain = b"very important secret";

        let c1 = encrypt(&key, plain);
        let c2 = encrypt(&key, plain);
        assert_ne!(c1, c2, "nonces must differ between calls");

        assert_eq!(decrypt(&key, &c1).as_deref(), Some(plain.as_slice()));
        assert_eq!(decrypt(&key, &c2).as_deref(), Some(plain.as_slice()));
    }

    #[test]
    fn bit_flip_breaks_authentication() {
        let key = MasterKey::from_bytes([0u8; KEY_LEN]);
        let mut cipher = encrypt(&key, b"hello world");
        let last = cipher.len() - 1;
        cipher[last] ^= 0x01;
        assert!(decrypt(&key, &cipher).is_none());
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let key_a = MasterKey::from_bytes([0u8; KEY_LEN]);
        let mut key_b_bytes = [0u8; KEY_LEN];
        key_b_bytes[0] = 1;
        let key_b = MasterKey::from_bytes(key_b_bytes);

        let cipher = encrypt(&key_a, b"payload");
        assert!(decrypt(&key_b, &cipher).is_none());
        assert_eq!(decrypt(&key_a, &cipher).as_deref(), Some(b"payload".as_slice()));
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        let key = MasterKey::from_bytes([0u8; KEY_LEN]);
        assert!(decrypt(&key, &[0u8; 4]).is_none());
    }

    #[test]
    fn derive_key_rejects_low_iteration_counts() {
        let err = derive_key(b"pw", b"salt", NonZeroU32::new(100).unwrap()).unwrap_err();
        assert!(matches!(err, Error::IterationsTooLow(100)));
    }

    #[test]
    fn derive_key_is_deterministic() {
        let iters = NonZeroU32::new(10_000).unwrap();
        let k1 = derive_key(b"hunter2", b"salt", iters).unwrap();
        let k2 = derive_key(b"hunter2", b"salt", iters).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }
}

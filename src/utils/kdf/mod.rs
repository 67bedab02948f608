use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

/// Fixed PBKDF2 round count. Changing it invalidates every key ever
/// derived from a deployment's global parameters.
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Derived key length in bytes, sized for AES-256.
pub const KEY_LENGTH: usize = 32;

/// Derives a 256 bit symmetric key from `secret` and `salt` using
/// PBKDF2-HMAC-SHA256 with [`PBKDF2_ROUNDS`] rounds.
///
/// The derivation is deterministic: the same `(secret, salt)` pair always
/// yields the same key, which is what allows attribute keys to be
/// re-derived on demand without any persisted per-attribute randomness.
pub fn derive_key(secret: &[u8], salt: &[u8]) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(secret, salt, PBKDF2_ROUNDS, &mut key);
    key
}

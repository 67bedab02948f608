use aes_gcm::{Aes256Gcm, Key, Nonce};
use aes_gcm::aead::{Aead, KeyInit};
use serde::{Serialize, Deserialize};
use crate::error::HabeError;
use crate::utils::tools::random_bytes;

/// AES-GCM nonce length in bytes.
pub const IV_LENGTH: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;
/// AES-256 key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// An AES-256-GCM sealed payload.
///
/// Nonce, ciphertext and tag are kept as separate fields because that is
/// the record shape the surrounding platform persists and exchanges; all
/// three are base64 strings at the serialization boundary.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct AesGcmCiphertext {
    #[serde(with = "crate::utils::tools::b64")]
    pub iv: Vec<u8>,
    #[serde(with = "crate::utils::tools::b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "crate::utils::tools::b64")]
    pub tag: Vec<u8>,
}

/// Symmetric Encryption Function.
///
/// Seals `plaintext` under the 256 bit `key` with a fresh random 12 byte
/// nonce. A key must never be combined with a caller-chosen nonce; nonce
/// generation stays inside this function.
pub fn encrypt_symmetric(key: &[u8], plaintext: &[u8]) -> Result<AesGcmCiphertext, HabeError> {
    if key.len() != KEY_LENGTH {
        return Err(HabeError::CiphertextIntegrity(
            format!("expected a {} byte key, got {} bytes", KEY_LENGTH, key.len())
        ));
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let iv = random_bytes(IV_LENGTH);
    match cipher.encrypt(Nonce::from_slice(&iv), plaintext) {
        Ok(mut sealed) => {
            let tag = sealed.split_off(sealed.len() - TAG_LENGTH);
            Ok(AesGcmCiphertext { iv, ciphertext: sealed, tag })
        },
        Err(e) => Err(e.into())
    }
}

/// Symmetric Decryption Function.
///
/// Opens a sealed payload, failing with [`HabeError::Authentication`] if
/// the tag does not verify. Nothing is returned on failure; decryption is
/// all-or-nothing.
pub fn decrypt_symmetric(key: &[u8], ct: &AesGcmCiphertext) -> Result<Vec<u8>, HabeError> {
    if key.len() != KEY_LENGTH {
        return Err(HabeError::CiphertextIntegrity(
            format!("expected a {} byte key, got {} bytes", KEY_LENGTH, key.len())
        ));
    }
    if ct.iv.len() != IV_LENGTH || ct.tag.len() != TAG_LENGTH {
        return Err(HabeError::CiphertextIntegrity(
            format!("expected a {} byte iv and a {} byte tag", IV_LENGTH, TAG_LENGTH)
        ));
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut sealed = ct.ciphertext.clone();
    sealed.extend_from_slice(&ct.tag);
    match cipher.decrypt(Nonce::from_slice(&ct.iv), sealed.as_slice()) {
        Ok(plaintext) => Ok(plaintext),
        Err(e) => Err(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt() {
        let key = random_bytes(KEY_LENGTH);
        let ct = encrypt_symmetric(&key, b"our plaintext!").unwrap();
        assert_eq!(decrypt_symmetric(&key, &ct).unwrap(), b"our plaintext!");
    }

    #[test]
    fn fresh_nonce_per_call() {
        let key = random_bytes(KEY_LENGTH);
        let ct1 = encrypt_symmetric(&key, b"same message").unwrap();
        let ct2 = encrypt_symmetric(&key, b"same message").unwrap();
        assert_ne!(ct1.iv, ct2.iv);
        assert_ne!(ct1.ciphertext, ct2.ciphertext);
    }

    #[test]
    fn wrong_key() {
        let ct = encrypt_symmetric(&random_bytes(KEY_LENGTH), b"secret").unwrap();
        let wrong = random_bytes(KEY_LENGTH);
        assert_eq!(decrypt_symmetric(&wrong, &ct), Err(HabeError::Authentication));
    }

    #[test]
    fn tampered_ciphertext() {
        let key = random_bytes(KEY_LENGTH);
        let mut ct = encrypt_symmetric(&key, b"secret").unwrap();
        ct.ciphertext[0] ^= 0x01;
        assert_eq!(decrypt_symmetric(&key, &ct), Err(HabeError::Authentication));
    }

    #[test]
    fn tampered_tag() {
        let key = random_bytes(KEY_LENGTH);
        let mut ct = encrypt_symmetric(&key, b"secret").unwrap();
        ct.tag[TAG_LENGTH - 1] ^= 0x80;
        assert_eq!(decrypt_symmetric(&key, &ct), Err(HabeError::Authentication));
    }

    #[test]
    fn short_key_rejected() {
        assert!(matches!(
            encrypt_symmetric(&random_bytes(16), b"secret"),
            Err(HabeError::CiphertextIntegrity(_))
        ));
    }

    #[test]
    fn b64_roundtrip() {
        let key = random_bytes(KEY_LENGTH);
        let ct = encrypt_symmetric(&key, b"boundary format").unwrap();
        let json = serde_json::to_string(&ct).unwrap();
        let parsed: AesGcmCiphertext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ct);
        assert_eq!(decrypt_symmetric(&key, &parsed).unwrap(), b"boundary format");
    }
}

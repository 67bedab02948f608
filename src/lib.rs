//! Hybrid policy-gated attribute based encryption.
//!
//! `habe` implements a multi-authority ABE construction without pairings:
//! a fresh AES-256-GCM data key is generated per ciphertext and wrapped
//! under attribute keys derived with PBKDF2-HMAC-SHA256 from a
//! deployment-wide master salt. Independent authorities issue
//! per-(user, attribute) keys wrapped under their own secrets, and a
//! boolean policy over `name@authority` leaves gates decryption.
//!
//! * [`schemes::hybrid`] holds the scheme itself: setup, authority and
//!   user key generation, encrypt and decrypt.
//! * [`registry`] holds the locked, process-wide store of authority
//!   secrets and implements the secret lookup used during decryption.
//! * [`utils`] holds the AEAD wrapper, the key derivation function, the
//!   policy parser and evaluator, and JSON file helpers.
//!
//! # Examples
//!
//! ```
//! use habe::registry::AuthorityRegistry;
//! use habe::schemes::hybrid::*;
//! let gk = setup();
//! let registry = AuthorityRegistry::new();
//! registry.setup(&String::from("Hospital")).unwrap();
//! let gid = String::from("alice");
//! let mut sk = HybridAbeUserKey::new(gid.clone());
//! sk.insert(registry.keygen(&gk, &String::from("Hospital"), &gid, &String::from("Doctor@Hospital")).unwrap());
//! let plaintext = String::from("our plaintext!").into_bytes();
//! let policy = String::from("Doctor@Hospital OR Nurse@Hospital");
//! let ct = encrypt(&gk, &registry.public_keys().unwrap(), &policy, &plaintext, KeyWrapMode::default()).unwrap();
//! assert_eq!(decrypt(&gk, &sk, &registry, &ct).unwrap(), plaintext);
//! ```
pub mod error;
pub mod registry;
pub mod schemes;
pub mod utils;

pub use crate::error::HabeError;

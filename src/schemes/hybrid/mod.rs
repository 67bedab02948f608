//! `Hybrid` policy-gated ABE scheme.
//!
//! * Two-layer construction: a fresh AES-256-GCM data key per ciphertext,
//!   wrapped under deterministically derived attribute keys
//! * Type: encryption (ciphertext-policy attribute-based)
//! * Setting: symmetric, no pairings; PBKDF2-HMAC-SHA256 key derivation
//!   chained through per-authority secrets
//! * Authors: Georg Bramm
//! * Date: 07/2021
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//! use habe::schemes::hybrid::*;
//! let gk = setup();
//! let (pk, ask) = authgen(&String::from("Hospital"));
//! let gid = String::from("alice");
//! let mut sk = HybridAbeUserKey::new(gid.clone());
//! sk.insert(keygen(&gk, &ask, &gid, &String::from("Doctor@Hospital")).unwrap());
//! let mut store = BTreeMap::new();
//! store.insert(ask.name.clone(), ask);
//! let plaintext = String::from("our plaintext!").into_bytes();
//! let policy = String::from("Doctor@Hospital OR Admin@Hospital");
//! let ct: HybridAbeCiphertext = encrypt(&gk, &vec![pk], &policy, &plaintext, KeyWrapMode::PerAttribute).unwrap();
//! assert_eq!(decrypt(&gk, &sk, &store, &ct).unwrap(), plaintext);
//! ```
use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use tracing::debug;
use crate::error::HabeError;
use crate::utils::{
    aes::{encrypt_symmetric, decrypt_symmetric, AesGcmCiphertext, KEY_LENGTH},
    kdf::derive_key,
    policy::{leaves, parse_attribute, satisfying_attributes, dnf::DnfPolicy, pest::parse},
    tools::random_bytes
};

/// Global parameter salt length in bytes.
pub const SALT_LENGTH: usize = 16;
/// Authority discovery id length in bytes.
pub const AUTHORITY_ID_LENGTH: usize = 16;

/// The Global Key (GK): a deployment-wide master salt shared by all
/// authorities and all attribute key derivations. Generated exactly once;
/// regenerating it invalidates every key derived from the old salt.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct HybridAbeGlobalKey {
    #[serde(with = "crate::utils::tools::b64")]
    pub master_salt: Vec<u8>,
}

/// An Authority Public Key (PKa). The id is random and serves discovery
/// and bookkeeping only; no cryptographic material is consumed from it.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct HybridAbeAuthorityPublicKey {
    pub name: String,
    #[serde(with = "crate::utils::tools::b64")]
    pub id: Vec<u8>,
}

/// An Authority Secret Key (SKa)
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct HybridAbeAuthoritySecretKey {
    pub name: String,
    #[serde(with = "crate::utils::tools::b64")]
    pub key: Vec<u8>,
}

/// A User Attribute Key (SKu,a): the per-(salt, attribute, user) derived
/// key, wrapped under the issuing authority's secret key.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct HybridAbeAttributeKey {
    pub attribute: String,
    pub authority: String,
    pub encrypted_key: AesGcmCiphertext,
}

/// A User Key (SKu): the user's global identifier and their issued
/// attribute keys, indexed by attribute string.
///
/// Authority secrets are deliberately not part of this bundle; decryption
/// resolves them through an [`AuthorityKeyStore`].
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct HybridAbeUserKey {
    #[serde(rename = "GID")]
    pub gid: String,
    pub keys: BTreeMap<String, HybridAbeAttributeKey>,
}

impl HybridAbeUserKey {
    pub fn new(gid: String) -> HybridAbeUserKey {
        HybridAbeUserKey { gid, keys: BTreeMap::new() }
    }

    /// Adds an issued attribute key, replacing any prior key for the same
    /// attribute.
    pub fn insert(&mut self, key: HybridAbeAttributeKey) {
        self.keys.insert(key.attribute.clone(), key);
    }

    /// Merges a batch of issued attribute keys into the bundle.
    pub fn extend(&mut self, keys: BTreeMap<String, HybridAbeAttributeKey>) {
        self.keys.extend(keys);
    }

    /// The attribute strings this user holds keys for.
    pub fn attributes(&self) -> BTreeSet<String> {
        self.keys.keys().cloned().collect()
    }
}

/// Selects how the data key of a ciphertext is bound to its policy.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
pub enum KeyWrapMode {
    /// One wrap per leaf attribute. This matches the legacy deployment
    /// format, and it means any single attribute occurring in an AND
    /// clause suffices to unwrap the data key at the wrap layer; the
    /// policy check in [`decrypt`] is then advisory rather than
    /// cryptographic.
    PerAttribute,
    /// One wrap per minimal DNF term of the policy. Every attribute of an
    /// AND term is needed to recover the data key, at the cost of a
    /// ciphertext format legacy deployments cannot read.
    PerConjunction,
}

impl Default for KeyWrapMode {
    fn default() -> Self {
        KeyWrapMode::PerAttribute
    }
}

/// A Hybrid ABE Ciphertext (CT).
///
/// `encrypted_keys` maps attribute strings ([`KeyWrapMode::PerAttribute`])
/// or canonical conjunction labels ([`KeyWrapMode::PerConjunction`]) to
/// wrapped copies of the data key. Bundles serialized before the `mode`
/// field existed deserialize as [`KeyWrapMode::PerAttribute`].
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct HybridAbeCiphertext {
    pub policy: String,
    #[serde(default)]
    pub mode: KeyWrapMode,
    pub encrypted_message: AesGcmCiphertext,
    pub encrypted_keys: BTreeMap<String, AesGcmCiphertext>,
}

/// Scoped lookup of authority secret keys during decryption.
///
/// Keeping the lookup behind this trait is what keeps raw authority
/// secrets out of user key bundles: a decryptor holds a capability to ask
/// for a secret, not the secret itself. Implemented by
/// [`crate::registry::AuthorityRegistry`] and, for transient
/// caller-supplied secrets, by plain maps.
pub trait AuthorityKeyStore {
    fn authority_secret(&self, authority: &str) -> Result<HybridAbeAuthoritySecretKey, HabeError>;
}

impl AuthorityKeyStore for BTreeMap<String, HybridAbeAuthoritySecretKey> {
    fn authority_secret(&self, authority: &str) -> Result<HybridAbeAuthoritySecretKey, HabeError> {
        match self.get(authority) {
            Some(secret) => Ok(secret.clone()),
            None => Err(HabeError::AuthoritySetup(
                format!("no secret key available for authority {}", authority)
            ))
        }
    }
}

/// The setup algorithm. Generates fresh global parameters.
///
/// Must run exactly once per deployment: every authority and every
/// derived attribute key is chained to this salt.
pub fn setup() -> HybridAbeGlobalKey {
    debug!("generating global parameters");
    HybridAbeGlobalKey {
        master_salt: random_bytes(SALT_LENGTH),
    }
}

/// Sets up a new authority with a given `name`, generating its public
/// descriptor and secret key.
///
/// Persistence and uniqueness of the name are the registry's concern;
/// calling this twice for the same name yields unrelated secrets.
pub fn authgen(name: &String) -> (HybridAbeAuthorityPublicKey, HybridAbeAuthoritySecretKey) {
    (
        HybridAbeAuthorityPublicKey {
            name: name.clone(),
            id: random_bytes(AUTHORITY_ID_LENGTH),
        },
        HybridAbeAuthoritySecretKey {
            name: name.clone(),
            key: random_bytes(KEY_LENGTH),
        }
    )
}

/// Issues a user attribute key.
///
/// The per-(salt, attribute, user) key is derived deterministically and
/// wrapped under the authority's current secret; rotating the authority
/// secret therefore invalidates the issued key.
///
/// # Arguments
///
///	* `gk` - The Global Key, generated by the function setup()
///	* `ask` - The Authority Secret Key of the issuing authority
///	* `gid` - The global identifier of the user
///	* `attribute` - The attribute as `name@authority` String
///
pub fn keygen(
    gk: &HybridAbeGlobalKey,
    ask: &HybridAbeAuthoritySecretKey,
    gid: &String,
    attribute: &String,
) -> Result<HybridAbeAttributeKey, HabeError> {
    let (_, authority) = parse_attribute(attribute)?;
    if authority != ask.name {
        return Err(HabeError::AuthoritySetup(
            format!("attribute {} is not managed by authority {}", attribute, ask.name)
        ));
    }
    let user_attribute_key = derive_user_attribute_key(gk, gid, attribute);
    match encrypt_symmetric(&ask.key, &user_attribute_key) {
        Ok(encrypted_key) => Ok(HybridAbeAttributeKey {
            attribute: attribute.clone(),
            authority: ask.name.clone(),
            encrypted_key,
        }),
        Err(e) => Err(e)
    }
}

/// Applies [`keygen`] over a list of attributes, returning the issued
/// keys indexed by attribute string.
pub fn keygen_multiple(
    gk: &HybridAbeGlobalKey,
    ask: &HybridAbeAuthoritySecretKey,
    gid: &String,
    attributes: &Vec<String>,
) -> Result<BTreeMap<String, HybridAbeAttributeKey>, HabeError> {
    let mut keys = BTreeMap::new();
    for attribute in attributes {
        keys.insert(attribute.clone(), keygen(gk, ask, gid, attribute)?);
    }
    Ok(keys)
}

/// The issuance derivation: key for (user, attribute), bound to the GID.
///
/// This is the key [`keygen`] wraps under the authority secret. It is
/// distinct from [`derive_attribute_key`], which is what data keys are
/// wrapped under.
pub fn derive_user_attribute_key(
    gk: &HybridAbeGlobalKey,
    gid: &String,
    attribute: &String,
) -> [u8; KEY_LENGTH] {
    let mut secret = gid.as_bytes().to_vec();
    secret.extend_from_slice(attribute.as_bytes());
    derive_key(&secret, &attribute_salt(gk, attribute))
}

/// The wrapping derivation: key for an attribute, independent of any
/// user. Data keys are wrapped under this key during encryption and
/// unwrapped with a fresh re-derivation of it during decryption.
pub fn derive_attribute_key(
    gk: &HybridAbeGlobalKey,
    attribute: &String,
) -> [u8; KEY_LENGTH] {
    derive_key(attribute.as_bytes(), &attribute_salt(gk, attribute))
}

/// The conjunctive wrapping derivation: key for a full DNF term, chained
/// through the wrap keys of all member attributes so that each one is
/// necessary.
pub fn derive_conjunction_key(
    gk: &HybridAbeGlobalKey,
    term: &BTreeSet<String>,
) -> [u8; KEY_LENGTH] {
    let mut secret = Vec::new();
    for attribute in term {
        secret.extend_from_slice(&derive_attribute_key(gk, attribute));
    }
    let mut salt = gk.master_salt.clone();
    salt.extend_from_slice(DnfPolicy::label(term).as_bytes());
    derive_key(&secret, &salt)
}

fn attribute_salt(gk: &HybridAbeGlobalKey, attribute: &String) -> Vec<u8> {
    let mut salt = gk.master_salt.clone();
    salt.extend_from_slice(attribute.as_bytes());
    salt
}

/// The encrypt algorithm. Seals `plaintext` under a fresh random data
/// key and binds that key to the access policy according to `mode`.
///
/// Fails with [`HabeError::PolicyFormat`] if the policy does not parse or
/// any leaf lacks the `name@authority` shape.
///
/// # Arguments
///
///	* `gk` - The Global Key, generated by the function setup()
///	* `_pks` - Public descriptors of the authorities occurring in the policy (bookkeeping only)
///	* `policy` - The access policy String
///	* `plaintext` - plaintext data given as a slice of u8
///	* `mode` - how the data key is bound to the policy
///
pub fn encrypt(
    gk: &HybridAbeGlobalKey,
    _pks: &Vec<HybridAbeAuthorityPublicKey>,
    policy: &String,
    plaintext: &[u8],
    mode: KeyWrapMode,
) -> Result<HybridAbeCiphertext, HabeError> {
    match parse(policy) {
        Ok(pol) => {
            let attributes = leaves(&pol)?;
            debug!(policy = %policy, attributes = attributes.len(), "encrypting");
            let data_key = random_bytes(KEY_LENGTH);
            let encrypted_message = encrypt_symmetric(&data_key, plaintext)?;
            let mut encrypted_keys = BTreeMap::new();
            match mode {
                KeyWrapMode::PerAttribute => {
                    for attribute in &attributes {
                        let attribute_key = derive_attribute_key(gk, attribute);
                        encrypted_keys.insert(
                            attribute.clone(),
                            encrypt_symmetric(&attribute_key, &data_key)?
                        );
                    }
                },
                KeyWrapMode::PerConjunction => {
                    let dnf = DnfPolicy::from_policy(&pol);
                    for term in &dnf.terms {
                        let conjunction_key = derive_conjunction_key(gk, term);
                        encrypted_keys.insert(
                            DnfPolicy::label(term),
                            encrypt_symmetric(&conjunction_key, &data_key)?
                        );
                    }
                }
            }
            Ok(HybridAbeCiphertext {
                policy: policy.clone(),
                mode,
                encrypted_message,
                encrypted_keys,
            })
        },
        Err(e) => Err(e)
    }
}

/// The decrypt algorithm. Recovers the plaintext of `ct` if and only if
/// the user's attributes satisfy the ciphertext policy.
///
/// The unwrap chain authenticates the user's issued key under the current
/// authority secret obtained from `store` before the data key is
/// unwrapped with a re-derived attribute key. Decryption is
/// all-or-nothing: no partial plaintext or key material survives a
/// failure.
///
/// # Arguments
///
///	* `gk` - The Global Key, generated by the function setup()
///	* `sk` - The User Key of the decrypting user
///	* `store` - Scoped access to the secrets of the issuing authorities
///	* `ct` - A Hybrid ABE Ciphertext
///
pub fn decrypt<S: AuthorityKeyStore>(
    gk: &HybridAbeGlobalKey,
    sk: &HybridAbeUserKey,
    store: &S,
    ct: &HybridAbeCiphertext,
) -> Result<Vec<u8>, HabeError> {
    match parse(&ct.policy) {
        Ok(pol) => {
            let available = sk.attributes();
            let data_key = match ct.mode {
                KeyWrapMode::PerAttribute => {
                    let satisfying = satisfying_attributes(&pol, &available);
                    // deterministic representative: lexicographically smallest
                    let attribute = match satisfying.iter().next() {
                        Some(attribute) => attribute,
                        None => return Err(HabeError::PolicyNotSatisfied),
                    };
                    let sealed_data_key = match ct.encrypted_keys.get(attribute) {
                        Some(sealed) => sealed,
                        None => return Err(HabeError::CiphertextIntegrity(
                            format!("attribute {} not present in ciphertext", attribute)
                        )),
                    };
                    // authenticates issuance; the data key below is unwrapped
                    // with the re-derived attribute key, not with this one
                    let _user_attribute_key = unwrap_issued_key(sk, store, attribute)?;
                    let attribute_key = derive_attribute_key(gk, attribute);
                    decrypt_symmetric(&attribute_key, sealed_data_key)?
                },
                KeyWrapMode::PerConjunction => {
                    let dnf = DnfPolicy::from_policy(&pol);
                    let term = match dnf.satisfied_term(&available) {
                        Some(term) => term,
                        None => return Err(HabeError::PolicyNotSatisfied),
                    };
                    for attribute in term {
                        unwrap_issued_key(sk, store, attribute)?;
                    }
                    let label = DnfPolicy::label(term);
                    let sealed_data_key = match ct.encrypted_keys.get(&label) {
                        Some(sealed) => sealed,
                        None => return Err(HabeError::CiphertextIntegrity(
                            format!("conjunction '{}' not present in ciphertext", label)
                        )),
                    };
                    let conjunction_key = derive_conjunction_key(gk, term);
                    decrypt_symmetric(&conjunction_key, sealed_data_key)?
                }
            };
            decrypt_symmetric(&data_key, &ct.encrypted_message)
        },
        Err(e) => Err(e)
    }
}

// Recovers the user's issued key for `attribute`, verifying it was
// wrapped under the current secret of the issuing authority.
fn unwrap_issued_key<S: AuthorityKeyStore>(
    sk: &HybridAbeUserKey,
    store: &S,
    attribute: &String,
) -> Result<Vec<u8>, HabeError> {
    let issued = match sk.keys.get(attribute) {
        Some(issued) => issued,
        None => return Err(HabeError::PolicyNotSatisfied),
    };
    let authority = store.authority_secret(&issued.authority)?;
    decrypt_symmetric(&authority.key, &issued.encrypted_key)
}

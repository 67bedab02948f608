//! Process-wide storage of authority key material.
//!
//! The registry replaces the original deployment's loose per-authority
//! key files with one keyed store behind a read/write lock. Secrets are
//! created on first [`AuthorityRegistry::setup`], handed out only through
//! scoped accessors, and invalidated by re-running setup for the same
//! name: attribute keys issued under the old secret no longer
//! authenticate afterwards and must be re-issued.
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::{debug, warn};
use crate::error::HabeError;
use crate::schemes::hybrid::{
    authgen,
    keygen,
    keygen_multiple,
    AuthorityKeyStore,
    HybridAbeAttributeKey,
    HybridAbeAuthorityPublicKey,
    HybridAbeAuthoritySecretKey,
    HybridAbeGlobalKey
};

#[derive(Clone)]
struct AuthorityEntry {
    public: HybridAbeAuthorityPublicKey,
    secret: HybridAbeAuthoritySecretKey,
}

/// Keyed storage of all authorities known to this process.
///
/// Every operation takes a scoped lock: reads share, setup is exclusive.
/// Serializing concurrent setup calls for the same name is this lock's
/// job; persisting the material beyond the process is the caller's.
pub struct AuthorityRegistry {
    authorities: RwLock<BTreeMap<String, AuthorityEntry>>,
}

impl AuthorityRegistry {
    pub fn new() -> AuthorityRegistry {
        AuthorityRegistry {
            authorities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates (or rotates) the authority `name` and returns its public
    /// descriptor.
    ///
    /// Re-running setup for an existing name silently replaces the
    /// secret; every attribute key issued under the old secret is
    /// invalidated from that point on.
    pub fn setup(&self, name: &String) -> Result<HybridAbeAuthorityPublicKey, HabeError> {
        let (public, secret) = authgen(name);
        let mut authorities = self.write()?;
        let replaced = authorities.insert(
            name.clone(),
            AuthorityEntry { public: public.clone(), secret }
        );
        match replaced {
            Some(_) => warn!(
                authority = %name,
                "authority secret rotated, previously issued attribute keys are invalid"
            ),
            None => debug!(authority = %name, "authority created"),
        }
        Ok(public)
    }

    /// Returns the public descriptor of `name`.
    pub fn public_key(&self, name: &String) -> Result<HybridAbeAuthorityPublicKey, HabeError> {
        let authorities = self.read()?;
        match authorities.get(name) {
            Some(entry) => Ok(entry.public.clone()),
            None => Err(unknown_authority(name)),
        }
    }

    /// Returns the public descriptors of all known authorities, e.g. to
    /// pass into encryption.
    pub fn public_keys(&self) -> Result<Vec<HybridAbeAuthorityPublicKey>, HabeError> {
        let authorities = self.read()?;
        Ok(authorities.values().map(|entry| entry.public.clone()).collect())
    }

    /// Runs `f` with scoped read access to the secret key of `name`.
    pub fn with_secret<T, F>(&self, name: &String, f: F) -> Result<T, HabeError>
    where
        F: FnOnce(&HybridAbeAuthoritySecretKey) -> T,
    {
        let authorities = self.read()?;
        match authorities.get(name) {
            Some(entry) => Ok(f(&entry.secret)),
            None => Err(unknown_authority(name)),
        }
    }

    /// Issues a user attribute key under the current secret of `name`.
    pub fn keygen(
        &self,
        gk: &HybridAbeGlobalKey,
        name: &String,
        gid: &String,
        attribute: &String,
    ) -> Result<HybridAbeAttributeKey, HabeError> {
        self.with_secret(name, |secret| keygen(gk, secret, gid, attribute))?
    }

    /// Issues user attribute keys for a whole attribute list under the
    /// current secret of `name`.
    pub fn keygen_multiple(
        &self,
        gk: &HybridAbeGlobalKey,
        name: &String,
        gid: &String,
        attributes: &Vec<String>,
    ) -> Result<BTreeMap<String, HybridAbeAttributeKey>, HabeError> {
        self.with_secret(name, |secret| keygen_multiple(gk, secret, gid, attributes))?
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, AuthorityEntry>>, HabeError> {
        self.authorities.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, AuthorityEntry>>, HabeError> {
        self.authorities.write().map_err(|_| poisoned())
    }
}

impl Default for AuthorityRegistry {
    fn default() -> Self {
        AuthorityRegistry::new()
    }
}

impl AuthorityKeyStore for AuthorityRegistry {
    fn authority_secret(&self, authority: &str) -> Result<HybridAbeAuthoritySecretKey, HabeError> {
        self.with_secret(&authority.to_string(), |secret| secret.clone())
    }
}

fn unknown_authority(name: &str) -> HabeError {
    HabeError::AuthoritySetup(format!("authority {} has not been set up", name))
}

fn poisoned() -> HabeError {
    HabeError::AuthoritySetup("authority store lock is poisoned".to_string())
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::schemes::hybrid::{setup, encrypt, decrypt, HybridAbeUserKey, KeyWrapMode};

    #[test]
    fn setup_and_lookup() {
        let registry = AuthorityRegistry::new();
        let public = registry.setup(&String::from("Hospital")).unwrap();
        assert_eq!(registry.public_key(&String::from("Hospital")).unwrap(), public);
        assert_eq!(registry.public_keys().unwrap().len(), 1);
        assert!(matches!(
            registry.public_key(&String::from("University")),
            Err(HabeError::AuthoritySetup(_))
        ));
    }

    #[test]
    fn scoped_secret_access() {
        let registry = AuthorityRegistry::new();
        registry.setup(&String::from("Hospital")).unwrap();
        let name = registry
            .with_secret(&String::from("Hospital"), |secret| secret.name.clone())
            .unwrap();
        assert_eq!(name, "Hospital");
    }

    #[test]
    fn end_to_end_through_registry() {
        let gk = setup();
        let registry = AuthorityRegistry::new();
        registry.setup(&String::from("Hospital")).unwrap();
        let gid = String::from("alice");
        let mut sk = HybridAbeUserKey::new(gid.clone());
        sk.extend(registry.keygen_multiple(
            &gk,
            &String::from("Hospital"),
            &gid,
            &vec![String::from("Doctor@Hospital"), String::from("Surgeon@Hospital")],
        ).unwrap());
        let policy = String::from("Doctor@Hospital AND Surgeon@Hospital");
        let ct = encrypt(&gk, &registry.public_keys().unwrap(), &policy, b"chart", KeyWrapMode::PerAttribute).unwrap();
        assert_eq!(decrypt(&gk, &sk, &registry, &ct).unwrap(), b"chart");
    }

    #[test]
    fn rotation_invalidates_issued_keys() {
        let gk = setup();
        let registry = AuthorityRegistry::new();
        registry.setup(&String::from("Hospital")).unwrap();
        let gid = String::from("alice");
        let mut sk = HybridAbeUserKey::new(gid.clone());
        sk.insert(registry.keygen(&gk, &String::from("Hospital"), &gid, &String::from("Doctor@Hospital")).unwrap());
        let policy = String::from("Doctor@Hospital");
        let ct = encrypt(&gk, &registry.public_keys().unwrap(), &policy, b"chart", KeyWrapMode::PerAttribute).unwrap();
        assert_eq!(decrypt(&gk, &sk, &registry, &ct).unwrap(), b"chart");
        // rotate: the stored user key must stop authenticating
        registry.setup(&String::from("Hospital")).unwrap();
        assert_eq!(decrypt(&gk, &sk, &registry, &ct), Err(HabeError::Authentication));
        // re-issuance under the new secret recovers access
        sk.insert(registry.keygen(&gk, &String::from("Hospital"), &gid, &String::from("Doctor@Hospital")).unwrap());
        assert_eq!(decrypt(&gk, &sk, &registry, &ct).unwrap(), b"chart");
    }

    #[test]
    fn keygen_unknown_authority() {
        let gk = setup();
        let registry = AuthorityRegistry::new();
        assert!(matches!(
            registry.keygen(&gk, &String::from("Hospital"), &String::from("alice"), &String::from("Doctor@Hospital")),
            Err(HabeError::AuthoritySetup(_))
        ));
    }
}

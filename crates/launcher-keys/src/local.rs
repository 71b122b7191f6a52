use std::fmt;

use base64::engine::general_purpose;
use base64::Engine as _;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::store::{KvStore, StoreError};

/// Store entry holding the PKCS#8 DER encoding of the device signing key.
pub const LOCAL_KEY_NAME: &str = "localEd25519Key";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("stored device key is unusable: {reason}")]
    Unusable { reason: String },

    #[error("generating device key: {0}")]
    Generate(#[source] rand_core::Error),

    #[error("encoding device key: {0}")]
    Encode(String),

    #[error("storing device key: {0}")]
    Store(#[source] StoreError),
}

/// The device's signing key, backed by the agent database rather than hardware.
#[derive(Clone)]
pub struct DeviceKey {
    signing: SigningKey,
}

impl DeviceKey {
    pub fn kind(&self) -> &'static str {
        "local"
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    pub fn public_key_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.verifying_key().as_bytes())
    }

    /// Hex SHA-256 of the raw public key bytes.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.verifying_key().as_bytes());
        hex_encode(&digest)
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing.sign(message)
    }

    fn from_der(raw: &[u8]) -> Result<Self, KeyError> {
        let signing = SigningKey::from_pkcs8_der(raw).map_err(|e| KeyError::Unusable {
            reason: e.to_string(),
        })?;
        Ok(Self { signing })
    }

    fn to_der(&self) -> Result<Vec<u8>, KeyError> {
        let doc = self
            .signing
            .to_pkcs8_der()
            .map_err(|e| KeyError::Encode(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    fn generate() -> Result<Self, KeyError> {
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        OsRng.try_fill_bytes(&mut secret).map_err(KeyError::Generate)?;
        Ok(Self {
            signing: SigningKey::from_bytes(&secret),
        })
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceKey")
            .field("kind", &self.kind())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Loads the device key from `store`, generating and persisting a new one when
/// the entry is missing, does not decode, or cannot be read at all. In the last
/// case the new key overwrites whatever the store held. A freshly generated key
/// is only returned once it has been written back.
pub fn setup_or_load(store: &dyn KvStore) -> Result<DeviceKey, KeyError> {
    match fetch_key(store) {
        Ok(Some(key)) => {
            info!(fingerprint = %key.fingerprint(), "found local key in database");
            return Ok(key);
        }
        Ok(None) => info!("no key found, generating new key"),
        Err(err) => info!("failed to load key, regenerating: {err}"),
    }

    let key = DeviceKey::generate()?;
    store_key(store, &key)?;
    info!(fingerprint = %key.fingerprint(), "stored new local key");
    Ok(key)
}

fn fetch_key(store: &dyn KvStore) -> Result<Option<DeviceKey>, KeyError> {
    let raw = store.get(LOCAL_KEY_NAME).map_err(|e| KeyError::Unusable {
        reason: e.to_string(),
    })?;
    match raw {
        Some(raw) => DeviceKey::from_der(&raw).map(Some),
        None => Ok(None),
    }
}

fn store_key(store: &dyn KvStore, key: &DeviceKey) -> Result<(), KeyError> {
    let raw = key.to_der()?;
    store.set(LOCAL_KEY_NAME, &raw).map_err(KeyError::Store)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

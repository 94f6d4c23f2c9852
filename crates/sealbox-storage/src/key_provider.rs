use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::options::KeyringOptions;

/// AES-256 data key for the encrypted file backend.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Short fingerprint of the key, safe to log.
    pub id: String,
    pub bytes: [u8; 32],
}

impl KeyMaterial {
    fn from_bytes(bytes: [u8; 32]) -> Self {
        let digest = Sha256::digest(bytes);
        let id = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
        Self { id, bytes }
    }

    fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    fn encode(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    fn decode(secret: &str) -> Result<Self, KeyError> {
        let raw = STANDARD
            .decode(secret.trim())
            .map_err(|e| KeyError::Decode(e.to_string()))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|raw: Vec<u8>| {
            KeyError::Decode(format!("expected 32 bytes, got {}", raw.len()))
        })?;
        Ok(Self::from_bytes(bytes))
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("stored data key is malformed: {0}")]
    Decode(String),
    #[error("key cache unavailable: {0}")]
    Cache(String),
}

/// Source of the data key. Implementations hand out the same key for the
/// lifetime of the stored data.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

/// Keeps the data key in the OS keychain as base64 under
/// `KeyringOptions::data_key_account`, generating it on first use.
/// The keychain is consulted once per provider; later calls hit the cache.
pub struct KeyringProvider {
    service: String,
    account: String,
    cached: Mutex<Option<KeyMaterial>>,
}

impl KeyringProvider {
    pub fn new(options: &KeyringOptions) -> Self {
        Self {
            service: options.service.clone(),
            account: options.data_key_account.clone(),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl KeyProvider for KeyringProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let cached = lock(&self.cached)?.clone();
        if let Some(material) = cached {
            return Ok(material);
        }

        let (service, account) = (self.service.clone(), self.account.clone());
        let loaded = tokio::task::spawn_blocking(move || load_or_generate(&service, &account))
            .await
            .map_err(|e| KeyError::Keyring(format!("keychain task failed: {e}")))??;

        // A concurrent caller may have loaded first; both read the same credential.
        Ok(lock(&self.cached)?.get_or_insert(loaded).clone())
    }
}

fn load_or_generate(service: &str, account: &str) -> Result<KeyMaterial, KeyError> {
    let entry =
        keyring::Entry::new(service, account).map_err(|e| KeyError::Keyring(e.to_string()))?;

    match entry.get_password() {
        Ok(secret) => {
            let material = KeyMaterial::decode(&secret)?;
            debug!(key_id = %material.id, "loaded data key from keychain");
            Ok(material)
        }
        Err(keyring::Error::NoEntry) => {
            let material = KeyMaterial::generate();
            entry
                .set_password(&material.encode())
                .map_err(|e| KeyError::Keyring(e.to_string()))?;
            info!(%service, key_id = %material.id, "generated new data key");
            Ok(material)
        }
        Err(err) => Err(KeyError::Keyring(err.to_string())),
    }
}

/// Process-local key for tests and throwaway sessions. Clones share the key.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        Ok(lock(&self.inner)?
            .get_or_insert_with(KeyMaterial::generate)
            .clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, KeyError> {
    mutex
        .lock()
        .map_err(|err| KeyError::Cache(format!("lock poisoned: {err}")))
}

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::adapter::AdapterError;

/// Errors produced by secure backends and the keyed store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecureStoreError {
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
    /// Namespace would make physical keys ambiguous.
    #[error("invalid namespace {namespace:?}: must not contain ':'")]
    InvalidNamespace { namespace: String },
    /// Value could not be converted to or from JSON.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl SecureStoreError {
    pub fn storage(reason: impl Into<String>) -> Self {
        SecureStoreError::Storage {
            reason: reason.into(),
        }
    }
}

/// Flat string-to-bytes contract over a secure key-value facility (OS keychain,
/// encrypted files, or memory in tests). Keys are physical keys; namespacing
/// happens one layer up.
#[async_trait]
pub trait SecureBackend: Send + Sync {
    /// Read the raw value for a key, `None` when absent.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SecureStoreError>;

    /// Persist a value under a key, overwriting any existing entry.
    async fn write(&self, key: &str, value: &[u8]) -> Result<(), SecureStoreError>;

    /// Remove a key and its value (idempotent).
    async fn delete(&self, key: &str) -> Result<(), SecureStoreError>;

    /// Snapshot of every key and value held by the backend.
    async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, SecureStoreError>;

    /// Every key held by the backend. Backends that can enumerate keys without
    /// reading values should override this.
    async fn list_keys(&self) -> Result<Vec<String>, SecureStoreError> {
        Ok(self.read_all().await?.into_keys().collect())
    }

    /// Remove every key held by the backend, regardless of who wrote it.
    async fn delete_all(&self) -> Result<(), SecureStoreError>;
}

#[async_trait]
impl<B: SecureBackend + ?Sized> SecureBackend for Arc<B> {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SecureStoreError> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), SecureStoreError> {
        (**self).write(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        (**self).delete(key).await
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, SecureStoreError> {
        (**self).read_all().await
    }

    async fn list_keys(&self) -> Result<Vec<String>, SecureStoreError> {
        (**self).list_keys().await
    }

    async fn delete_all(&self) -> Result<(), SecureStoreError> {
        (**self).delete_all().await
    }
}

/// In-memory backend that simulates encryption for tests and smoke runs.
/// This is not cryptographically secure; production deployments use the OS
/// keyring or the encrypted file backend from `sealbox-storage`.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecureBackend {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemorySecureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous write of arbitrary bytes, as if another writer had put them
    /// there. Lets tests plant corrupt or foreign entries.
    pub fn insert_raw(&self, key: &str, value: &[u8]) -> Result<(), SecureStoreError> {
        self.lock()?.insert(key.to_string(), mask(value));
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, SecureStoreError> {
        self.inner
            .lock()
            .map_err(|err| SecureStoreError::storage(format!("lock poisoned: {err}")))
    }
}

#[async_trait]
impl SecureBackend for InMemorySecureBackend {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SecureStoreError> {
        Ok(self.lock()?.get(key).map(|masked| unmask(masked)))
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), SecureStoreError> {
        // XOR is a placeholder to avoid storing plaintext in tests.
        self.lock()?.insert(key.to_string(), mask(value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, SecureStoreError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(key, masked)| (key.clone(), unmask(masked)))
            .collect())
    }

    async fn list_keys(&self) -> Result<Vec<String>, SecureStoreError> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete_all(&self) -> Result<(), SecureStoreError> {
        self.lock()?.clear();
        Ok(())
    }
}

const MASK_BYTE: u8 = 0xA5;

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}

fn unmask(input: &[u8]) -> Vec<u8> {
    mask(input) // XOR twice restores original.
}

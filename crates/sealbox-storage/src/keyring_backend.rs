use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use keyring::Entry;
use sealbox_core::storage::{SecureBackend, SecureStoreError};
use tracing::{debug, instrument, warn};

use crate::options::KeyringOptions;

/// Backend storing each key as one OS keychain credential
/// (service = `options.service`, account = key).
///
/// Platform keychains cannot list credentials, so the backend maintains an
/// index credential with the JSON array of keys it has written. Keys written
/// to the keychain by other tools are invisible to `read_all`/`delete_all`.
pub struct KeyringBackend {
    options: KeyringOptions,
    // Handles are reused so a process-wide credential builder sees one
    // credential per account.
    entries: Mutex<HashMap<String, Arc<Entry>>>,
    // Serializes read-modify-write cycles on the index.
    index_lock: Mutex<()>,
}

impl KeyringBackend {
    pub fn new(options: KeyringOptions) -> Self {
        Self {
            options,
            entries: Mutex::new(HashMap::new()),
            index_lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &KeyringOptions {
        &self.options
    }

    fn entry(&self, account: &str) -> Result<Arc<Entry>, SecureStoreError> {
        let mut entries = lock(&self.entries)?;
        if let Some(entry) = entries.get(account) {
            return Ok(Arc::clone(entry));
        }
        let entry = Arc::new(Entry::new(&self.options.service, account).map_err(keyring_err)?);
        entries.insert(account.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    fn check_key(&self, key: &str) -> Result<(), SecureStoreError> {
        if self.options.is_reserved(key) {
            return Err(SecureStoreError::storage(format!(
                "key {key:?} is reserved by the keyring backend"
            )));
        }
        Ok(())
    }

    fn read_secret(&self, account: &str) -> Result<Option<Vec<u8>>, SecureStoreError> {
        match self.entry(account)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(keyring_err(err)),
        }
    }

    fn delete_secret(&self, account: &str) -> Result<(), SecureStoreError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(keyring_err(err)),
        }
    }

    fn load_index(&self) -> Result<BTreeSet<String>, SecureStoreError> {
        let Some(raw) = self.read_secret(&self.options.index_account)? else {
            return Ok(BTreeSet::new());
        };
        serde_json::from_slice(&raw)
            .map_err(|e| SecureStoreError::storage(format!("keyring index is corrupt: {e}")))
    }

    fn save_index(&self, index: &BTreeSet<String>) -> Result<(), SecureStoreError> {
        if index.is_empty() {
            return self.delete_secret(&self.options.index_account);
        }
        let raw = serde_json::to_vec(index)
            .map_err(|e| SecureStoreError::storage(format!("keyring index encode: {e}")))?;
        self.entry(&self.options.index_account)?
            .set_secret(&raw)
            .map_err(keyring_err)
    }
}

#[async_trait]
impl SecureBackend for KeyringBackend {
    #[instrument(skip_all)]
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SecureStoreError> {
        self.check_key(key)?;
        self.read_secret(key)
    }

    #[instrument(skip_all)]
    async fn write(&self, key: &str, value: &[u8]) -> Result<(), SecureStoreError> {
        self.check_key(key)?;
        let _guard = lock(&self.index_lock)?;
        self.entry(key)?.set_secret(value).map_err(keyring_err)?;

        let mut index = self.load_index()?;
        if index.insert(key.to_string()) {
            self.save_index(&index)?;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        self.check_key(key)?;
        let _guard = lock(&self.index_lock)?;
        self.delete_secret(key)?;

        let mut index = self.load_index()?;
        if index.remove(key) {
            self.save_index(&index)?;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, SecureStoreError> {
        let mut entries = BTreeMap::new();
        for key in self.load_index()? {
            match self.read_secret(&key)? {
                Some(value) => {
                    entries.insert(key, value);
                }
                None => debug!(%key, "indexed credential is gone"),
            }
        }
        Ok(entries)
    }

    async fn list_keys(&self) -> Result<Vec<String>, SecureStoreError> {
        Ok(self.load_index()?.into_iter().collect())
    }

    #[instrument(skip_all)]
    async fn delete_all(&self) -> Result<(), SecureStoreError> {
        let _guard = lock(&self.index_lock)?;
        let index = self.load_index()?;
        warn!(count = index.len(), service = %self.options.service, "deleting all keyring entries");
        for key in &index {
            self.delete_secret(key)?;
        }
        self.delete_secret(&self.options.index_account)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, SecureStoreError> {
    mutex
        .lock()
        .map_err(|err| SecureStoreError::storage(format!("lock poisoned: {err}")))
}

fn keyring_err(err: keyring::Error) -> SecureStoreError {
    SecureStoreError::storage(format!("keyring: {err}"))
}

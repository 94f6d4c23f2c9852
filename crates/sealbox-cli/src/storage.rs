use std::{path::PathBuf, sync::Arc};

use crate::config::{BackendKind, Config};
use color_eyre::Result;
use dirs::data_dir;
use sealbox_core::{
    adapter::{ExecutionMode, StorageAdapter},
    keyed_store::SecureKeyedStore,
    logging::TracingLogger,
    storage::{InMemorySecureBackend, SecureBackend},
};
use sealbox_storage::{
    encrypted_file_backend::EncryptedFileBackend, key_provider::KeyringProvider,
    keyring_backend::KeyringBackend,
};
use serde_json::Value;
use tracing::debug;

/// Namespace used when neither the flag nor the config names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Store type the demo works with: arbitrary JSON over whichever backend the
/// config selects.
pub type DemoStore = SecureKeyedStore<Value, Arc<dyn SecureBackend>, ExecutionMode>;

/// Resolve the default data directory for Sealbox.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("sealbox"))
}

/// Build the backend selected by the config.
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn SecureBackend>> {
    let backend: Arc<dyn SecureBackend> = match config.backend {
        BackendKind::File => {
            let root = match &config.data_dir {
                Some(root) => root.clone(),
                None => default_data_dir()?,
            };
            debug!(?root, "initializing encrypted file backend");
            Arc::new(EncryptedFileBackend::new(
                root,
                KeyringProvider::new(&config.keyring),
            ))
        }
        BackendKind::Keyring => {
            debug!(service = %config.keyring.service, "initializing keyring backend");
            Arc::new(KeyringBackend::new(config.keyring.clone()))
        }
        BackendKind::Memory => Arc::new(InMemorySecureBackend::new()),
    };
    Ok(backend)
}

/// Wrap a backend in a namespaced store that logs through `tracing`.
pub fn open_store(
    backend: Arc<dyn SecureBackend>,
    namespace: &str,
    execution: ExecutionMode,
) -> Result<DemoStore> {
    let store = SecureKeyedStore::with_adapter(
        namespace,
        backend,
        StorageAdapter::serde().with_strategy(execution),
    )?;
    Ok(store.with_logger(Arc::new(TracingLogger)))
}

/// Build a store for `namespace` using config overrides.
pub fn store_from_config(config: &Config, namespace: &str) -> Result<DemoStore> {
    let backend = backend_from_config(config)?;
    open_store(backend, namespace, config.execution)
}

/// Helper for tests: a store over a fresh in-memory backend.
#[cfg(test)]
pub fn test_store(namespace: &str) -> DemoStore {
    open_store(
        Arc::new(InMemorySecureBackend::new()),
        namespace,
        ExecutionMode::Inline,
    )
    .expect("test namespace is valid")
}

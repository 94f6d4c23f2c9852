use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sealbox_core::storage::{SecureBackend, SecureStoreError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::key_provider::{KeyMaterial, KeyProvider};

/// Longest base64 file name used verbatim. Longer keys are stored under a
/// hashed name so they stay within common 255-byte file-name limits.
pub const MAX_ENCODED_NAME: usize = 200;

const HASHED_PREFIX: char = '~';

/// AES-GCM encrypted file-per-key backend. The data key comes from a
/// `KeyProvider` (OS keyring in production).
///
/// File names are the URL-safe base64 of the key, or `~<base64 sha256>` when
/// that would exceed [`MAX_ENCODED_NAME`]. Every blob also records its key,
/// which keeps hashed entries enumerable for `read_all` and `clear`.
pub struct EncryptedFileBackend<P: KeyProvider> {
    root: PathBuf,
    key_provider: P,
}

impl<P: KeyProvider> EncryptedFileBackend<P> {
    pub fn new(root: impl Into<PathBuf>, key_provider: P) -> Self {
        Self {
            root: root.into(),
            key_provider,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name_for(key))
    }

    async fn cipher(&self) -> Result<Aes256Gcm, SecureStoreError> {
        let key_material = self
            .key_provider
            .get_or_create()
            .await
            .map_err(|e| SecureStoreError::storage(format!("key provider: {e}")))?;
        build_cipher(&key_material)
    }

    /// Stored keys paired with their file paths. Temp files and anything else
    /// that is not an encoded key are skipped.
    fn stored_files(&self) -> Result<Vec<(String, PathBuf)>, SecureStoreError> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(storage_err(err)),
        };

        let mut files = Vec::new();
        for item in dir {
            let item = item.map_err(storage_err)?;
            if !item.file_type().map_err(storage_err)?.is_file() {
                continue;
            }
            let name = item.file_name();
            let path = item.path();
            let key = match name.to_str() {
                Some(hashed) if hashed.starts_with(HASHED_PREFIX) => hashed_key(&path),
                Some(encoded) => decode_file_name(encoded),
                None => None,
            };
            match key {
                Some(key) => files.push((key, path)),
                None => debug!(?name, "skipping foreign file"),
            }
        }
        files.sort();
        Ok(files)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob {
    /// Physical key, needed to enumerate entries stored under hashed names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    nonce: String,
    ciphertext: String,
}

#[async_trait]
impl<P: KeyProvider> SecureBackend for EncryptedFileBackend<P> {
    #[instrument(skip_all)]
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SecureStoreError> {
        let Some(blob) = read_blob(&self.path_for(key))? else {
            return Ok(None);
        };
        let cipher = self.cipher().await?;
        decrypt(&cipher, blob).map(Some)
    }

    #[instrument(skip_all)]
    async fn write(&self, key: &str, value: &[u8]) -> Result<(), SecureStoreError> {
        fs::create_dir_all(&self.root).map_err(storage_err)?;

        let cipher = self.cipher().await?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, value)
            .map_err(|e| SecureStoreError::storage(format!("encrypt failed: {e}")))?;

        let blob = StoredBlob {
            key: Some(key.to_string()),
            nonce: URL_SAFE_NO_PAD.encode(nonce.as_slice()),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        };

        write_blob(&self.path_for(key), &blob)
    }

    #[instrument(skip_all)]
    async fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        remove_if_present(&self.path_for(key))
    }

    #[instrument(skip_all)]
    async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, SecureStoreError> {
        let files = self.stored_files()?;
        let mut entries = BTreeMap::new();
        if files.is_empty() {
            return Ok(entries);
        }

        let cipher = self.cipher().await?;
        for (key, path) in files {
            // A file removed since the directory scan is simply skipped.
            if let Some(blob) = read_blob(&path)? {
                entries.insert(key, decrypt(&cipher, blob)?);
            }
        }
        Ok(entries)
    }

    async fn list_keys(&self) -> Result<Vec<String>, SecureStoreError> {
        Ok(self.stored_files()?.into_iter().map(|(key, _)| key).collect())
    }

    #[instrument(skip_all)]
    async fn delete_all(&self) -> Result<(), SecureStoreError> {
        for (_, path) in self.stored_files()? {
            remove_if_present(&path)?;
        }
        Ok(())
    }
}

fn decrypt(cipher: &Aes256Gcm, blob: StoredBlob) -> Result<Vec<u8>, SecureStoreError> {
    let nonce_bytes = URL_SAFE_NO_PAD
        .decode(blob.nonce)
        .map_err(|e| SecureStoreError::storage(format!("nonce decode failed: {e}")))?;
    if nonce_bytes.len() != 12 {
        return Err(SecureStoreError::storage(format!(
            "nonce has {} bytes, expected 12",
            nonce_bytes.len()
        )));
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = URL_SAFE_NO_PAD
        .decode(blob.ciphertext)
        .map_err(|e| SecureStoreError::storage(format!("ciphertext decode failed: {e}")))?;

    cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|e| SecureStoreError::storage(format!("decrypt failed: {e}")))
}

fn write_blob(path: &Path, blob: &StoredBlob) -> Result<(), SecureStoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| SecureStoreError::storage("invalid storage path"))?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    let json = serde_json::to_vec(blob).map_err(storage_err)?;
    tmp.write_all(&json).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn read_blob(path: &Path) -> Result<Option<StoredBlob>, SecureStoreError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(storage_err(err)),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(storage_err)?;
    serde_json::from_slice(&buf).map(Some).map_err(storage_err)
}

fn remove_if_present(path: &Path) -> Result<(), SecureStoreError> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(storage_err(err)),
    }
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, SecureStoreError> {
    Aes256Gcm::new_from_slice(&material.bytes)
        .map_err(|e| SecureStoreError::storage(format!("cipher init failed: {e}")))
}

fn file_name_for(key: &str) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(key);
    if encoded.len() <= MAX_ENCODED_NAME {
        return encoded;
    }
    let digest = Sha256::digest(key.as_bytes());
    format!("{HASHED_PREFIX}{}", URL_SAFE_NO_PAD.encode(digest))
}

/// Key recorded in a hashed-name blob. Blobs without one, or whose key does
/// not hash to the file name, are not ours.
fn hashed_key(path: &Path) -> Option<String> {
    let key = match read_blob(path) {
        Ok(Some(blob)) => blob.key,
        Ok(None) => None,
        Err(err) => {
            debug!(?path, %err, "unreadable hashed entry");
            None
        }
    };
    key.filter(|key| {
        path.file_name().and_then(|name| name.to_str()) == Some(file_name_for(key).as_str())
    })
}

fn decode_file_name(name: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(name).ok()?;
    String::from_utf8(bytes).ok()
}

fn storage_err<E: ToString>(err: E) -> SecureStoreError {
    SecureStoreError::storage(err.to_string())
}

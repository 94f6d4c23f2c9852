//! Concrete secure backends for the Sealbox keyed store.
//! The OS keyring backend stores entries directly in the platform keychain;
//! the file backend encrypts entries with AES-GCM under a keyring-held key.

pub mod encrypted_file_backend;
pub mod key_provider;
pub mod keyring_backend;
pub mod options;

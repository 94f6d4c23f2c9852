//! Physical key-value contract implemented by secure backends.

mod secure_store;

pub use secure_store::{InMemorySecureBackend, SecureBackend, SecureStoreError};

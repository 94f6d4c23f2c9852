//! Namespaced, timestamped, JSON-backed key-value store over a [`SecureBackend`].
//!
//! Physical keys are `"<namespace>:<key>"` and stored values are framed as
//! `"<millis>:<json>"`. Both formats are part of the on-disk compatibility
//! surface: data written by earlier releases must keep reading back.

use std::{backtrace::Backtrace, error::Error as StdError, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, field, instrument, warn, Span};

use crate::{
    adapter::{ExecutionStrategy, Inline, StorageAdapter},
    clock::{self, Clock, SystemClock},
    keys::{self, StorageKey},
    logging::{LogLevel, SharedLogger},
    storage::{SecureBackend, SecureStoreError},
};

/// Separates the namespace from the key, and the timestamp from the payload.
pub const SEPARATOR: char = ':';

/// A decoded value together with the logical key and the time it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    /// Logical key, without the namespace prefix.
    pub key: String,
    pub value: T,
    /// Milliseconds since the Unix epoch.
    pub store_time: i64,
}

impl<T> Entry<T> {
    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        clock::to_datetime(self.store_time)
    }
}

/// Reasons a stored value cannot be split into timestamp and payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("stored value is not valid utf-8")]
    NotUtf8,
    #[error("stored value has no timestamp separator")]
    MissingSeparator,
    #[error("invalid store timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Frame a JSON payload with its store time.
pub fn frame_entry(store_time: i64, json: &str) -> String {
    format!("{store_time}{SEPARATOR}{json}")
}

/// Split a stored value at the first separator. The payload may itself
/// contain separators. The timestamp must be a plain decimal integer, as
/// written by [`frame_entry`].
pub fn parse_frame(raw: &[u8]) -> Result<(i64, &str), FrameError> {
    let text = std::str::from_utf8(raw).map_err(|_| FrameError::NotUtf8)?;
    let (timestamp, payload) = text
        .split_once(SEPARATOR)
        .ok_or(FrameError::MissingSeparator)?;
    let invalid = || FrameError::InvalidTimestamp(timestamp.to_string());
    if timestamp.starts_with('+') {
        return Err(invalid());
    }
    let store_time = timestamp.parse::<i64>().map_err(|_| invalid())?;
    Ok((store_time, payload))
}

/// Keyed store scoped to one namespace of a (possibly shared) backend.
///
/// Corrupt entries read back as missing: `get` logs the failure and returns
/// `Ok(None)`. Backend I/O failures are always returned to the caller.
pub struct SecureKeyedStore<T, B, E = Inline> {
    namespace: String,
    backend: B,
    adapter: StorageAdapter<T, E>,
    clock: Arc<dyn Clock>,
    logger: Option<SharedLogger>,
}

impl<T, B> SecureKeyedStore<T, B, Inline>
where
    T: DeserializeOwned,
    B: SecureBackend,
{
    /// Store using `T`'s serde impls, inline execution, and the wall clock.
    pub fn new(namespace: impl Into<String>, backend: B) -> Result<Self, SecureStoreError> {
        Self::with_adapter(namespace, backend, StorageAdapter::serde())
    }
}

impl<T, B, E> SecureKeyedStore<T, B, E>
where
    B: SecureBackend,
{
    /// Fails when `namespace` contains [`SEPARATOR`]: `"A"` would otherwise
    /// clear entries of namespace `"A:B"`.
    pub fn with_adapter(
        namespace: impl Into<String>,
        backend: B,
        adapter: StorageAdapter<T, E>,
    ) -> Result<Self, SecureStoreError> {
        let namespace = namespace.into();
        if namespace.contains(SEPARATOR) {
            return Err(SecureStoreError::InvalidNamespace { namespace });
        }
        Ok(Self {
            namespace,
            backend,
            adapter,
            clock: Arc::new(SystemClock),
            logger: None,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Attach a logger to the store and its adapter.
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.adapter.set_logger(Some(Arc::clone(&logger)));
        self.logger = Some(logger);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn prefix(&self) -> String {
        format!("{}{SEPARATOR}", self.namespace)
    }

    /// Returns the logical key string and the physical backend key.
    fn resolve_key<K: StorageKey + ?Sized>(&self, key: &K) -> (String, String) {
        let resolved = keys::resolve(key);
        if resolved.is_fallback() {
            self.report(
                LogLevel::Warning,
                &format!(
                    "key {:?} is neither a string nor has a resource key; using its display form. \
                     Use a string key or implement StorageKey::resource_key",
                    resolved.value
                ),
                None,
            );
        }
        let physical = format!("{}{}", self.prefix(), resolved.value);
        Span::current().record("key", physical.as_str());
        (resolved.value, physical)
    }

    fn report(&self, level: LogLevel, message: &str, error: Option<&(dyn StdError + 'static)>) {
        if let Some(logger) = &self.logger {
            let trace = error.map(|_| Backtrace::capture());
            logger.log(level, message, error, trace.as_ref());
        }
    }
}

impl<T, B, E> SecureKeyedStore<T, B, E>
where
    T: Send + 'static,
    B: SecureBackend,
    E: ExecutionStrategy,
{
    /// Read and decode the entry for `key`. Missing and corrupt entries both
    /// yield `Ok(None)`.
    #[instrument(skip_all, fields(namespace = %self.namespace, key = field::Empty))]
    pub async fn get<K: StorageKey + ?Sized>(
        &self,
        key: &K,
    ) -> Result<Option<Entry<T>>, SecureStoreError> {
        let (logical, physical) = self.resolve_key(key);
        let Some(raw) = self.backend.read(&physical).await? else {
            return Ok(None);
        };

        let (store_time, payload) = match parse_frame(&raw) {
            Ok(frame) => frame,
            Err(err) => {
                self.report(
                    LogLevel::Error,
                    &format!("discarding malformed entry {physical:?}"),
                    Some(&err),
                );
                return Ok(None);
            }
        };

        // The adapter reports decode failures itself.
        match self.adapter.decode_from_json(payload).await {
            Ok(value) => Ok(Some(Entry {
                key: logical,
                value,
                store_time,
            })),
            Err(err) => {
                debug!(%err, key = %physical, "treating undecodable entry as missing");
                Ok(None)
            }
        }
    }

    /// Encode and store `value` under `key`, stamped with the clock's time.
    pub async fn put<K: StorageKey + ?Sized>(
        &self,
        key: &K,
        value: T,
    ) -> Result<(), SecureStoreError>
    where
        T: Serialize,
    {
        self.put_at(key, value, self.clock.now_millis()).await
    }

    /// Encode and store `value` under `key` with an explicit store time.
    #[instrument(
        skip_all,
        fields(namespace = %self.namespace, key = field::Empty, store_time = store_time)
    )]
    pub async fn put_at<K: StorageKey + ?Sized>(
        &self,
        key: &K,
        value: T,
        store_time: i64,
    ) -> Result<(), SecureStoreError>
    where
        T: Serialize,
    {
        let (_, physical) = self.resolve_key(key);
        let json = self.adapter.encode_to_json(value).await?;
        self.backend
            .write(&physical, frame_entry(store_time, &json).as_bytes())
            .await
    }

    /// Delete the entry for `key`; succeeds when it is already gone.
    #[instrument(skip_all, fields(namespace = %self.namespace, key = field::Empty))]
    pub async fn remove<K: StorageKey + ?Sized>(&self, key: &K) -> Result<(), SecureStoreError> {
        let (_, physical) = self.resolve_key(key);
        self.backend.delete(&physical).await
    }

    /// Delete every entry in this store's namespace. Other namespaces sharing
    /// the backend are left alone. Not atomic: a concurrent `put` into this
    /// namespace may or may not survive.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn clear(&self) -> Result<(), SecureStoreError> {
        let prefix = self.prefix();
        let mut removed = 0usize;
        for key in self.backend.list_keys().await? {
            if key.starts_with(&prefix) {
                self.backend.delete(&key).await?;
                removed += 1;
            }
        }
        debug!(removed, "cleared namespace");
        Ok(())
    }

    /// DANGER: deletes every entry in the backend, across ALL namespaces,
    /// including ones written by other stores. Use [`clear`](Self::clear) to
    /// empty only this store's namespace.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn clear_all_storage(&self) -> Result<(), SecureStoreError> {
        warn!("deleting every entry in the backend across all namespaces");
        self.backend.delete_all().await
    }

    /// Logical keys currently stored in this namespace, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, SecureStoreError> {
        let prefix = self.prefix();
        let mut keys: Vec<String> = self
            .backend
            .list_keys()
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use serde::{Deserialize, Serializer};

    use super::*;
    use crate::{
        adapter::{AdapterError, Offloaded},
        clock::FixedClock,
        keys::DisplayKey,
        logging::MemoryLogger,
        storage::InMemorySecureBackend,
    };

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        note: String,
    }

    fn note(text: &str) -> Note {
        Note { note: text.into() }
    }

    type SharedBackend = Arc<InMemorySecureBackend>;

    fn store(namespace: &str, backend: &SharedBackend) -> SecureKeyedStore<Note, SharedBackend> {
        SecureKeyedStore::new(namespace, Arc::clone(backend)).expect("valid namespace")
    }

    #[tokio::test]
    async fn put_then_get_round_trips_value_and_timestamp() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = store("profile", &backend).with_clock(FixedClock(1_700_000_000_123));

        store.put("greeting", note("hello")).await.expect("put");
        let entry = store
            .get("greeting")
            .await
            .expect("get")
            .expect("entry present");

        assert_eq!(entry.key, "greeting");
        assert_eq!(entry.value, note("hello"));
        assert_eq!(entry.store_time, 1_700_000_000_123);
        assert!(entry.stored_at().is_some());
    }

    #[tokio::test]
    async fn writes_namespaced_keys_and_framed_values() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = store("profile", &backend);

        store
            .put_at("greeting", note("hi"), 42)
            .await
            .expect("put");

        let raw = backend
            .read("profile:greeting")
            .await
            .expect("read")
            .expect("physical key present");
        assert_eq!(
            String::from_utf8(raw).expect("utf8"),
            r#"42:{"note":"hi"}"#
        );
    }

    #[tokio::test]
    async fn explicit_store_time_is_preserved() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = store("a", &backend).with_clock(FixedClock(1));

        store.put_at("k", note("v"), 987_654_321).await.expect("put");
        let entry = store.get("k").await.expect("get").expect("present");
        assert_eq!(entry.store_time, 987_654_321);
    }

    #[tokio::test]
    async fn missing_and_removed_keys_read_as_none() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = store("a", &backend);

        assert_eq!(store.get("never").await.expect("get"), None);

        store.put("k", note("v")).await.expect("put");
        store.remove("k").await.expect("remove");
        store.remove("k").await.expect("remove is idempotent");
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = store("a", &backend);

        store.put_at("k", note("first"), 1).await.expect("put");
        store.put_at("k", note("second"), 2).await.expect("put");

        let entry = store.get("k").await.expect("get").expect("present");
        assert_eq!(entry.value, note("second"));
        assert_eq!(entry.store_time, 2);
    }

    #[tokio::test]
    async fn payload_with_colons_round_trips() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = store("a", &backend);

        store.put("k", note("a:b:c")).await.expect("put");
        let entry = store.get("k").await.expect("get").expect("present");
        assert_eq!(entry.value, note("a:b:c"));
    }

    #[tokio::test]
    async fn clear_only_touches_own_namespace() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let a = store("A", &backend);
        let b = store("B", &backend);
        // Shares a prefix with "A" but is a different namespace.
        let ab = store("AB", &backend);

        a.put("x", note("v1")).await.expect("put");
        b.put("x", note("v2")).await.expect("put");
        ab.put("x", note("v3")).await.expect("put");

        a.clear().await.expect("clear");

        assert_eq!(a.get("x").await.expect("get"), None);
        assert_eq!(
            b.get("x").await.expect("get").map(|e| e.value),
            Some(note("v2"))
        );
        assert_eq!(
            ab.get("x").await.expect("get").map(|e| e.value),
            Some(note("v3"))
        );
    }

    #[test]
    fn namespace_containing_separator_is_rejected() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let err = SecureKeyedStore::<Note, _>::new("A:B", Arc::clone(&backend))
            .err()
            .expect("must reject");
        assert_eq!(
            err,
            SecureStoreError::InvalidNamespace {
                namespace: "A:B".into()
            }
        );
    }

    #[tokio::test]
    async fn keys_containing_separator_stay_in_their_namespace() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let a = store("A", &backend);
        let other = store("B", &backend);

        a.put("B:x", note("nested")).await.expect("put");
        other.put("x", note("v")).await.expect("put");
        a.clear().await.expect("clear");

        assert_eq!(a.get("B:x").await.expect("get"), None);
        assert!(other.get("x").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn clear_all_storage_wipes_every_namespace() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let a = store("A", &backend);
        let b = store("B", &backend);

        a.put("x", note("v1")).await.expect("put");
        b.put("x", note("v2")).await.expect("put");

        a.clear_all_storage().await.expect("clear all");

        assert_eq!(a.get("x").await.expect("get"), None);
        assert_eq!(b.get("x").await.expect("get"), None);
        assert!(backend.read_all().await.expect("read_all").is_empty());
    }

    #[tokio::test]
    async fn keys_lists_logical_keys_of_namespace() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let a = store("A", &backend);
        let b = store("B", &backend);

        a.put("zeta", note("1")).await.expect("put");
        a.put("alpha", note("2")).await.expect("put");
        b.put("other", note("3")).await.expect("put");

        assert_eq!(
            a.keys().await.expect("keys"),
            vec!["alpha".to_string(), "zeta".to_string()]
        );
    }

    #[tokio::test]
    async fn corrupt_entries_read_as_none_with_one_error_log() {
        let cases: [&[u8]; 4] = [
            b"no separator here",
            b"123:not json",
            b"abc:{\"note\":\"x\"}",
            &[0xff, 0xfe, b':', b'{'],
        ];

        for raw in cases {
            let backend = Arc::new(InMemorySecureBackend::new());
            let logger = MemoryLogger::new();
            let store = store("A", &backend).with_logger(Arc::new(logger.clone()));
            backend.insert_raw("A:bad", raw).expect("plant corrupt entry");

            assert_eq!(store.get("bad").await.expect("get must not fail"), None);
            assert_eq!(
                logger.at_level(LogLevel::Error).len(),
                1,
                "exactly one error for {raw:?}"
            );
        }
    }

    #[tokio::test]
    async fn corrupt_entry_without_logger_still_reads_as_none() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = store("A", &backend);
        backend.insert_raw("A:bad", b"1:{").expect("plant");
        assert_eq!(store.get("bad").await.expect("get"), None);
    }

    #[tokio::test]
    async fn decode_fn_rejection_reads_as_none() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let logger = MemoryLogger::new();
        let store = SecureKeyedStore::with_adapter(
            "A",
            Arc::clone(&backend),
            StorageAdapter::new(|_| -> anyhow::Result<Note> { anyhow::bail!("schema changed") }),
        )
        .expect("store")
        .with_logger(Arc::new(logger.clone()));

        store.put("k", note("v")).await.expect("put");
        assert_eq!(store.get("k").await.expect("get"), None);
        let errors = logger.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("schema changed"));
    }

    #[tokio::test]
    async fn non_string_key_falls_back_with_warning() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let logger = MemoryLogger::new();
        let store = store("A", &backend).with_logger(Arc::new(logger.clone()));

        store.put(&17u32, note("v")).await.expect("put");
        assert_eq!(logger.at_level(LogLevel::Warning).len(), 1);

        let entry = store.get(&17u32).await.expect("get").expect("present");
        assert_eq!(entry.key, "17");
        assert_eq!(logger.at_level(LogLevel::Warning).len(), 2);

        store
            .put(&DisplayKey("wrapped"), note("w"))
            .await
            .expect("put");
        assert_eq!(logger.at_level(LogLevel::Warning).len(), 3);
        assert!(backend.read("A:17").await.expect("read").is_some());
        assert!(backend.read("A:wrapped").await.expect("read").is_some());
    }

    struct UserId(u32);

    impl StorageKey for UserId {
        fn resource_key(&self) -> Option<String> {
            Some(format!("user-{}", self.0))
        }

        fn display_key(&self) -> String {
            format!("UserId({})", self.0)
        }
    }

    #[tokio::test]
    async fn resource_key_is_used_without_warning() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let logger = MemoryLogger::new();
        let store = store("A", &backend).with_logger(Arc::new(logger.clone()));

        store.put(&UserId(9), note("v")).await.expect("put");
        assert!(backend.read("A:user-9").await.expect("read").is_some());
        assert!(store.get(&UserId(9)).await.expect("get").is_some());
        assert!(logger.records().is_empty());
    }

    #[tokio::test]
    async fn offloaded_store_behaves_like_inline() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = SecureKeyedStore::with_adapter(
            "A",
            Arc::clone(&backend),
            StorageAdapter::<Note>::serde().with_strategy(Offloaded),
        )
        .expect("store");

        store.put_at("k", note("heavy:payload"), 5).await.expect("put");
        let entry = store.get("k").await.expect("get").expect("present");
        assert_eq!(entry.value, note("heavy:payload"));
        assert_eq!(entry.store_time, 5);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to serialize"))
        }
    }

    #[tokio::test]
    async fn encode_failure_propagates_from_put() {
        let backend = Arc::new(InMemorySecureBackend::new());
        let store = SecureKeyedStore::with_adapter(
            "A",
            Arc::clone(&backend),
            StorageAdapter::new(|_| -> anyhow::Result<Unserializable> { Ok(Unserializable) }),
        )
        .expect("store");

        let err = store
            .put("k", Unserializable)
            .await
            .expect_err("encode should fail");
        assert!(matches!(err, SecureStoreError::Adapter(AdapterError::Encode(_))));
        assert!(backend.read_all().await.expect("read_all").is_empty());
    }

    struct ReadOnlyBackend;

    #[async_trait]
    impl SecureBackend for ReadOnlyBackend {
        async fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, SecureStoreError> {
            Ok(None)
        }

        async fn write(&self, _key: &str, _value: &[u8]) -> Result<(), SecureStoreError> {
            Err(SecureStoreError::storage("read-only"))
        }

        async fn delete(&self, _key: &str) -> Result<(), SecureStoreError> {
            Err(SecureStoreError::storage("read-only"))
        }

        async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, SecureStoreError> {
            Ok(BTreeMap::from([("A:x".to_string(), b"1:{}".to_vec())]))
        }

        async fn delete_all(&self) -> Result<(), SecureStoreError> {
            Err(SecureStoreError::storage("read-only"))
        }
    }

    #[tokio::test]
    async fn backend_failures_propagate() {
        let store: SecureKeyedStore<Note, _> =
            SecureKeyedStore::new("A", ReadOnlyBackend).expect("store");

        assert!(matches!(
            store.put("x", note("v")).await,
            Err(SecureStoreError::Storage { .. })
        ));
        assert!(store.remove("x").await.is_err());
        assert!(store.clear().await.is_err());
        assert!(store.clear_all_storage().await.is_err());
    }

    struct UnreachableBackend;

    #[async_trait]
    impl SecureBackend for UnreachableBackend {
        async fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, SecureStoreError> {
            Err(SecureStoreError::storage("keychain locked"))
        }

        async fn write(&self, _key: &str, _value: &[u8]) -> Result<(), SecureStoreError> {
            Err(SecureStoreError::storage("keychain locked"))
        }

        async fn delete(&self, _key: &str) -> Result<(), SecureStoreError> {
            Err(SecureStoreError::storage("keychain locked"))
        }

        async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, SecureStoreError> {
            Err(SecureStoreError::storage("keychain locked"))
        }

        async fn delete_all(&self) -> Result<(), SecureStoreError> {
            Err(SecureStoreError::storage("keychain locked"))
        }
    }

    #[tokio::test]
    async fn read_failure_in_get_is_an_error_not_a_miss() {
        let logger = MemoryLogger::new();
        let store: SecureKeyedStore<Note, _> = SecureKeyedStore::new("A", UnreachableBackend)
            .expect("store")
            .with_logger(Arc::new(logger.clone()));

        assert_eq!(
            store.get("x").await,
            Err(SecureStoreError::storage("keychain locked"))
        );
        assert!(store.keys().await.is_err());
        assert!(logger.records().is_empty(), "I/O failures are not logged as corruption");
    }

    mod spans {
        use std::{fmt, sync::Mutex};

        use tracing::{
            field::{Field, Visit},
            span, Subscriber,
        };
        use tracing_subscriber::{layer::Context, prelude::*, Layer};

        use super::*;

        #[derive(Clone, Default)]
        struct RecordedKeys(Arc<Mutex<Vec<String>>>);

        impl<S: Subscriber> Layer<S> for RecordedKeys {
            fn on_record(&self, _id: &span::Id, values: &span::Record<'_>, _ctx: Context<'_, S>) {
                values.record(&mut KeyVisitor(&self.0));
            }
        }

        struct KeyVisitor<'a>(&'a Mutex<Vec<String>>);

        impl Visit for KeyVisitor<'_> {
            fn record_str(&mut self, field: &Field, value: &str) {
                if field.name() == "key" {
                    self.0.lock().expect("keys").push(value.to_string());
                }
            }

            fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
        }

        #[tokio::test]
        async fn operation_spans_record_physical_key() {
            let recorded = RecordedKeys::default();
            let subscriber = tracing_subscriber::registry().with(recorded.clone());
            let _default = tracing::subscriber::set_default(subscriber);

            let backend = Arc::new(InMemorySecureBackend::new());
            let store = store("profile", &backend);
            store.put("greeting", note("hi")).await.expect("put");
            store.get("greeting").await.expect("get");
            store.remove("greeting").await.expect("remove");

            assert_eq!(
                *recorded.0.lock().expect("keys"),
                vec!["profile:greeting"; 3]
            );
        }
    }

    #[test]
    fn parse_frame_splits_at_first_separator() {
        assert_eq!(
            parse_frame(br#"10:{"a":"b:c"}"#),
            Ok((10, r#"{"a":"b:c"}"#))
        );
        assert_eq!(parse_frame(b"-5:1"), Ok((-5, "1")));
        assert_eq!(parse_frame(b"nope"), Err(FrameError::MissingSeparator));
        assert_eq!(
            parse_frame(b"x1:{}"),
            Err(FrameError::InvalidTimestamp("x1".into()))
        );
        assert_eq!(
            parse_frame(b"+5:{}"),
            Err(FrameError::InvalidTimestamp("+5".into()))
        );
        assert_eq!(
            parse_frame(b":{}"),
            Err(FrameError::InvalidTimestamp("".into()))
        );
        assert_eq!(frame_entry(7, "{}"), "7:{}");
    }
}

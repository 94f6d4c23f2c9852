use std::{borrow::Cow, fmt};

/// Capability a logical key implements to be addressable by a keyed store.
///
/// Resolution order: a native string is used as-is, then a resource key, and
/// finally the `Display` form (which the store reports as a warning).
pub trait StorageKey {
    /// Borrowed string form for keys that already are strings.
    fn as_native_str(&self) -> Option<&str> {
        None
    }

    /// Canonical identifier for keys that carry one.
    fn resource_key(&self) -> Option<String> {
        None
    }

    /// Default textual representation used when nothing better exists.
    fn display_key(&self) -> String;
}

/// How a logical key was turned into its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Native,
    ResourceKey,
    Fallback,
}

/// A logical key after stringification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub value: String,
    pub source: KeySource,
}

impl ResolvedKey {
    pub fn is_fallback(&self) -> bool {
        self.source == KeySource::Fallback
    }
}

/// Stringify a logical key following the native/resource/fallback order.
pub fn resolve<K: StorageKey + ?Sized>(key: &K) -> ResolvedKey {
    if let Some(native) = key.as_native_str() {
        return ResolvedKey {
            value: native.to_string(),
            source: KeySource::Native,
        };
    }
    if let Some(resource) = key.resource_key() {
        return ResolvedKey {
            value: resource,
            source: KeySource::ResourceKey,
        };
    }
    ResolvedKey {
        value: key.display_key(),
        source: KeySource::Fallback,
    }
}

impl StorageKey for str {
    fn as_native_str(&self) -> Option<&str> {
        Some(self)
    }

    fn display_key(&self) -> String {
        self.to_string()
    }
}

impl StorageKey for String {
    fn as_native_str(&self) -> Option<&str> {
        Some(self.as_str())
    }

    fn display_key(&self) -> String {
        self.clone()
    }
}

impl StorageKey for Cow<'_, str> {
    fn as_native_str(&self) -> Option<&str> {
        Some(self.as_ref())
    }

    fn display_key(&self) -> String {
        self.to_string()
    }
}

impl<K: StorageKey + ?Sized> StorageKey for &K {
    fn as_native_str(&self) -> Option<&str> {
        (**self).as_native_str()
    }

    fn resource_key(&self) -> Option<String> {
        (**self).resource_key()
    }

    fn display_key(&self) -> String {
        (**self).display_key()
    }
}

macro_rules! display_storage_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StorageKey for $ty {
                fn display_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_storage_key!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char, bool);

/// Wraps any `Display` value so it can be used as a key through the fallback
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayKey<T>(pub T);

impl<T: fmt::Display> StorageKey for DisplayKey<T> {
    fn display_key(&self) -> String {
        self.0.to_string()
    }
}

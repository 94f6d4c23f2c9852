//! Core abstractions for Sealbox: the secure backend contract, the JSON storage
//! adapter, and the namespaced, timestamped keyed store built on top of them.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod adapter;
pub mod clock;
pub mod keyed_store;
pub mod keys;
pub mod logging;
pub mod storage;

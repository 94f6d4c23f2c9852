//! JSON conversion between domain values and their stored text form.
//!
//! The adapter owns a caller-supplied decode function (the inverse of the
//! value's `Serialize` impl) and an [`ExecutionStrategy`] deciding where the
//! serde work runs. Decode failures are reported to the optional logger and
//! then returned, leaving the swallow-or-propagate decision to the caller.

use std::{backtrace::Backtrace, error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::logging::{LogLevel, SharedLogger};

/// Errors raised while converting values to or from JSON.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The value could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
    /// The stored text is not valid JSON.
    #[error("invalid json: {0}")]
    Parse(String),
    /// The decode function rejected the parsed JSON.
    #[error("decode failed: {0}")]
    Decode(String),
    /// The execution context failed before producing a result.
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Caller-supplied conversion from parsed JSON to the domain type.
pub type DecodeFn<T> = Arc<dyn Fn(Value) -> anyhow::Result<T> + Send + Sync>;

/// Where serialization work runs. Results never depend on the strategy.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn execute<F, R>(&self, work: F) -> Result<R, AdapterError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static;
}

/// Runs work directly in the caller's task.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

#[async_trait]
impl ExecutionStrategy for Inline {
    async fn execute<F, R>(&self, work: F) -> Result<R, AdapterError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Ok(work())
    }
}

/// Moves work onto tokio's blocking pool, for large payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offloaded;

#[async_trait]
impl ExecutionStrategy for Offloaded {
    async fn execute<F, R>(&self, work: F) -> Result<R, AdapterError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| AdapterError::Execution(e.to_string()))
    }
}

/// Runtime-selectable strategy, for callers that pick one from configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Inline,
    Offloaded,
}

#[async_trait]
impl ExecutionStrategy for ExecutionMode {
    async fn execute<F, R>(&self, work: F) -> Result<R, AdapterError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self {
            ExecutionMode::Inline => Inline.execute(work).await,
            ExecutionMode::Offloaded => Offloaded.execute(work).await,
        }
    }
}

/// Converts `T` to and from JSON text.
pub struct StorageAdapter<T, E = Inline> {
    decode: DecodeFn<T>,
    strategy: E,
    logger: Option<SharedLogger>,
}

impl<T> StorageAdapter<T, Inline> {
    /// Adapter with an explicit decode function, running inline.
    pub fn new<F>(decode: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(decode),
            strategy: Inline,
            logger: None,
        }
    }
}

impl<T: DeserializeOwned> StorageAdapter<T, Inline> {
    /// Adapter whose decode function is `T`'s `Deserialize` impl.
    pub fn serde() -> Self {
        Self::new(|value| Ok(serde_json::from_value(value)?))
    }
}

impl<T, E> StorageAdapter<T, E> {
    /// Swap the execution strategy, keeping decode function and logger.
    pub fn with_strategy<S: ExecutionStrategy>(self, strategy: S) -> StorageAdapter<T, S> {
        StorageAdapter {
            decode: self.decode,
            strategy,
            logger: self.logger,
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub(crate) fn set_logger(&mut self, logger: Option<SharedLogger>) {
        self.logger = logger;
    }

    pub fn strategy(&self) -> &E {
        &self.strategy
    }
}

impl<T, E> StorageAdapter<T, E>
where
    T: Send + 'static,
    E: ExecutionStrategy,
{
    /// Serialize `value` to JSON text on the configured strategy.
    pub async fn encode_to_json(&self, value: T) -> Result<String, AdapterError>
    where
        T: Serialize,
    {
        self.strategy
            .execute(move || {
                serde_json::to_string(&value).map_err(|e| AdapterError::Encode(e.to_string()))
            })
            .await?
    }

    /// Parse JSON text and apply the decode function. Failures are logged
    /// (when a logger is attached) and returned.
    pub async fn decode_from_json(&self, json: &str) -> Result<T, AdapterError> {
        let decode = Arc::clone(&self.decode);
        let json = json.to_owned();
        let result = self
            .strategy
            .execute(move || {
                let parsed: Value =
                    serde_json::from_str(&json).map_err(|e| AdapterError::Parse(e.to_string()))?;
                decode(parsed).map_err(|e| AdapterError::Decode(format!("{e:#}")))
            })
            .await
            .and_then(|decoded| decoded);

        if let (Err(err), Some(logger)) = (&result, &self.logger) {
            logger.log(
                LogLevel::Error,
                "failed to decode stored json",
                Some(err as &(dyn StdError + 'static)),
                Some(&Backtrace::capture()),
            );
        }
        result
    }
}

use std::io::Write;

use color_eyre::{eyre::bail, Result};
use sealbox_core::keyed_store::Entry;
use serde_json::Value;
use tracing::info;

use crate::{cli::StoreCommand, storage::DemoStore};

/// Execute a store subcommand, writing human-readable output to `out`.
pub async fn handle<W: Write>(cmd: StoreCommand, store: &DemoStore, out: &mut W) -> Result<()> {
    let namespace = store.namespace().to_string();
    match cmd {
        StoreCommand::Get { key } => match store.get(key.as_str()).await? {
            Some(entry) => {
                writeln!(out, "{} (stored {})", entry.key, stored_label(&entry))?;
                writeln!(out, "{}", serde_json::to_string_pretty(&entry.value)?)?;
            }
            None => writeln!(out, "No entry for `{key}` in namespace `{namespace}`.")?,
        },
        StoreCommand::Put { key, value, at } => {
            let value = parse_value(&value);
            match at {
                Some(store_time) => store.put_at(key.as_str(), value, store_time).await?,
                None => store.put(key.as_str(), value).await?,
            }
            writeln!(out, "Stored `{key}` in namespace `{namespace}`.")?;
        }
        StoreCommand::Remove { key } => {
            store.remove(key.as_str()).await?;
            writeln!(out, "Removed `{key}` from namespace `{namespace}`.")?;
        }
        StoreCommand::List => {
            let keys = store.keys().await?;
            if keys.is_empty() {
                writeln!(
                    out,
                    "Namespace `{namespace}` is empty. Add one with `sealbox put <key> <json>`."
                )?;
                return Ok(());
            }
            for key in keys {
                writeln!(out, "{key}")?;
            }
        }
        StoreCommand::Clear => {
            store.clear().await?;
            writeln!(out, "Cleared namespace `{namespace}`.")?;
        }
        StoreCommand::ClearAll { yes: false } => {
            bail!("clear-all deletes entries in EVERY namespace of the backend; re-run with --yes to confirm")
        }
        StoreCommand::ClearAll { yes: true } => {
            info!("clear-all confirmed");
            store.clear_all_storage().await?;
            writeln!(out, "Deleted every entry in the backend (all namespaces).")?;
        }
    }

    Ok(())
}

/// JSON when it parses, otherwise the raw text as a JSON string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// RFC 3339 store time, or the raw millis when out of chrono's range.
pub fn stored_label<T>(entry: &Entry<T>) -> String {
    entry
        .stored_at()
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| entry.store_time.to_string())
}

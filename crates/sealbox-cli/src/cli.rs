use clap::{Parser, Subcommand};

/// CLI surface definition for the secure keyed store demo.
#[derive(Parser, Debug)]
#[command(
    name = "sealbox",
    about = "Namespaced JSON entries in your OS secure storage",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Namespace to operate on; falls back to the config file, then "default".
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Optional subcommand; defaults to launching the TUI when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Browse the namespace's entries (press q or Esc to exit).
    Tui,
    /// Print version and exit.
    Version,
    /// Round-trip a probe entry through the configured backend.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    #[command(flatten)]
    Store(StoreCommand),
}

/// Operations on the keyed store.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Print the entry stored under a key.
    Get { key: String },
    /// Store a value under a key. Text that is not valid JSON is stored as a string.
    Put {
        key: String,
        value: String,
        /// Store time in milliseconds since the Unix epoch (defaults to now).
        #[arg(long)]
        at: Option<i64>,
    },
    /// Delete the entry stored under a key.
    Remove { key: String },
    /// List the keys stored in the namespace.
    List,
    /// Delete every entry in the namespace.
    Clear,
    /// DANGER: delete every entry in the backend, across ALL namespaces.
    ClearAll {
        /// Confirm the cross-namespace wipe.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

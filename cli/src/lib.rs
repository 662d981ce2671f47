//! Kirbec daemon and operator tooling
//!
//! `kirbecd` runs the presence loop; `kirbec-cli` runs one ledger or bet
//! command against the same store.

pub mod commands;
pub mod config;
pub mod logging;
pub mod presence_source;

pub use commands::{execute, BetCommand, Cli, Command, LogCommand};
pub use config::{load_or_default, Backend, Config};
pub use presence_source::JsonPresenceSource;

pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_BRANCH"),
    "@",
    env!("GIT_HASH"),
    ")"
);

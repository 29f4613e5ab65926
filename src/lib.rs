//! status-beacon: a line-oriented TCP status server
//!
//! Clients connect, send an identifier followed by `\n`, and receive the
//! decimal status code of that identifier before the server closes the
//! connection. Unknown identifiers and malformed or slow requests get no
//! reply at all.
//!
//! Features:
//! - Fixed-size worker pool with blocking admission (backpressure)
//! - Per-connection read deadline
//! - `OWLSO-SERVER` liveness probe that bypasses the status store
//! - Pluggable status store behind the [`StatusLookup`] trait
//! - Configuration via CLI arguments or TOML file

pub mod config;
pub mod lookup;
pub mod pool;
pub mod protocol;
pub mod server;
pub mod status;

pub use config::{Config, ConfigError};
pub use lookup::{LookupError, StatusLookup, StatusTable};
pub use server::{Server, ServerError};
pub use status::StatusCode;

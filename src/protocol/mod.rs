//! Status protocol implementation.
//!
//! One request per connection:
//! - Client sends: `<identifier>\n`
//! - Server responds: the decimal status value, no terminator, then closes.
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  probe-17\n
//! Response: 75
//!
//! Request:  OWLSO-SERVER\n
//! Response: 100
//!
//! Request:  unknown-id\n
//! Response: (nothing, connection closed)
//! ```
//!
//! `OWLSO-SERVER\n` is a liveness probe: it always answers `100` without
//! touching the status store. It must match byte for byte, terminator
//! included. Unknown identifiers, read timeouts and malformed requests all
//! end with the connection closed and zero bytes written.

pub mod codec;
pub mod handler;

pub use handler::{handle_connection, HandlerSettings, Outcome};

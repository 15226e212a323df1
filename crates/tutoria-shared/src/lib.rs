//! # tutoria-shared
//!
//! Domain types and wire protocol shared between the Tutoria chat server and
//! client.  Nothing in here performs I/O; the crate exists so that both sides
//! agree on identities, conversation addressing, and the JSON event format
//! exchanged over the persistent connection.

pub mod constants;
pub mod protocol;
pub mod types;

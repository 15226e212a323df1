//! # tutoria-server
//!
//! Chat server for the Tutoria platform.  Hosts:
//! - the **presence registry** (one live connection per user),
//! - the **conversation resolver** (idempotent pair → conversation id),
//! - the **message router** (validate, timestamp, persist, forward),
//! - the **contact directory** (role-filtered partner projection),
//! - the WebSocket endpoint carrying the persistent-connection events and a
//!   small **REST API** (axum) for conversation initialization and contacts.
//!
//! The binary entry point lives in `main.rs`; everything else is a library so
//! integration tests can drive a real in-process server.

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod history;
pub mod presence;
pub mod resolver;
pub mod router;
pub mod ws;

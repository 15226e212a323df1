//! Client-side chat runtime: persistent connection session, REST helpers,
//! contact filtering, and the optimistic transcript model.

pub mod contacts;
pub mod error;
pub mod reconnect;
pub mod rest;
pub mod session;
pub mod transcript;

pub use error::ClientError;
pub use reconnect::ReconnectPolicy;
pub use rest::ApiClient;
pub use session::{spawn_session, SessionCommand, SessionConfig, SessionNotification};
pub use transcript::Transcript;

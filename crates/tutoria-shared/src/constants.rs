use uuid::Uuid;

/// Application name
pub const APP_NAME: &str = "Tutoria";

/// Maximum message body size in bytes, measured after trimming
pub const MAX_BODY_BYTES: usize = 4096;

/// Capacity of the per-connection outbound event buffer
pub const OUTBOX_CAPACITY: usize = 64;

/// Capacity of the client session command / notification channels
pub const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Default HTTP / WebSocket port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default number of reconnection attempts before giving up
pub const RECONNECT_MAX_ATTEMPTS: u32 = 5;

/// Initial delay between reconnection attempts in milliseconds
pub const RECONNECT_INITIAL_DELAY_MS: u64 = 500;

/// Upper bound on the reconnection delay in milliseconds
pub const RECONNECT_MAX_DELAY_MS: u64 = 10_000;

/// Timeout for a single connection attempt in milliseconds
pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default timeout for a single persistence call in milliseconds
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;

/// UUID v5 namespace under which conversation identifiers are derived from
/// the normalized participant pair.  Changing this value would re-key every
/// existing conversation.
pub const CONVERSATION_NAMESPACE: Uuid = Uuid::from_u128(0x8f0e_7d2a_4b1c_4e5f_9a3d_6c2b_1e0f_7a55);

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("could not connect: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("gave up reconnecting after {0} attempts")]
    RetriesExhausted(u32),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("session is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ClientError>;

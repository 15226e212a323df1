use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed or unauthorized send.  Rejected with no side effect; the
    /// offending client is not notified (see the wire protocol notes).
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The history store could not be reached (or the call timed out).
    #[error("History store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed request parameters.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidMessage(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "History store unavailable".to_string(),
            ),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

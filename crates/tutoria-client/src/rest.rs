//! Thin typed wrapper over the server's REST endpoints.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use tutoria_shared::constants::CONNECT_TIMEOUT_MS;
use tutoria_shared::protocol::{ContactsResponse, InitializeRequest, InitializeResponse};
use tutoria_shared::types::{Contact, UserId};

use crate::error::ClientError;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(CONNECT_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Resolve (creating if absent) the conversation with `partner_id` and
    /// fetch its full ordered history.
    pub async fn initialize_conversation(
        &self,
        user_id: &UserId,
        partner_id: &UserId,
    ) -> Result<InitializeResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/conversations/initialize", self.base_url))
            .json(&InitializeRequest {
                user_id: user_id.clone(),
                partner_id: partner_id.clone(),
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: InitializeResponse = response.json().await?;
        debug!(
            conversation = %body.conversation_id,
            history_len = body.messages.len(),
            "conversation initialized"
        );
        Ok(body)
    }

    /// Fetch the role-filtered contact list for `user_id`.
    pub async fn fetch_contacts(&self, user_id: &UserId) -> Result<Vec<Contact>, ClientError> {
        let response = self
            .http
            .get(format!("{}/contacts/{}", self.base_url, user_id))
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: ContactsResponse = response.json().await?;
        Ok(body.contacts)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

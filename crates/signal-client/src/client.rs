//! Signal HTTP client.

use crate::error::SignalError;
use crate::types::*;
use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// Signal CLI REST API client.
#[derive(Clone)]
pub struct SignalClient {
    client: Client,
    base_url: String,
    phone_number: String,
    api_token: Option<SecretString>,
}

impl SignalClient {
    /// Create a new Signal client.
    pub fn new(
        base_url: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Result<Self, SignalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            phone_number: phone_number.into(),
            api_token: None,
        })
    }

    /// Authenticate requests with a bearer token.
    pub fn with_api_token(mut self, token: SecretString) -> Self {
        self.api_token = Some(token);
        self
    }

    /// Get the configured phone number.
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Check if the Signal API is healthy.
    pub async fn health_check(&self) -> bool {
        self.request(Method::GET, "/v1/health")
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Get account information.
    #[instrument(skip(self))]
    pub async fn get_account(&self) -> Result<Account, SignalError> {
        let path = format!("/v1/accounts/{}", encode(&self.phone_number));
        let response = self.request(Method::GET, &path).send().await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err(SignalError::Api(msg));
        }

        Ok(response.json().await?)
    }

    /// Receive pending messages.
    #[instrument(skip(self))]
    pub async fn receive(&self) -> Result<Vec<IncomingMessage>, SignalError> {
        let path = format!("/v1/receive/{}", encode(&self.phone_number));
        let response = self.request(Method::GET, &path).send().await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err(SignalError::Api(msg));
        }

        let messages: Vec<IncomingMessage> = response.json().await?;
        debug!("Received {} messages", messages.len());
        Ok(messages)
    }

    /// Send a message to a recipient, returning its timestamp.
    #[instrument(skip(self, message))]
    pub async fn send(&self, recipient: &str, message: &str) -> Result<i64, SignalError> {
        self.post_message(SendMessageRequest::new(&self.phone_number, recipient, message))
            .await
    }

    /// Reply to a message, quoting it.
    #[instrument(skip(self, original, message), fields(recipient = %original.reply_target()))]
    pub async fn reply(&self, original: &BotMessage, message: &str) -> Result<i64, SignalError> {
        let mut request =
            SendMessageRequest::new(&self.phone_number, original.reply_target(), message);
        request.quote_timestamp = Some(original.original_timestamp());
        request.quote_author = Some(original.source.clone());
        request.quote_message = Some(original.text.clone());
        self.post_message(request).await
    }

    /// Replace the text of a message sent earlier, returning the edit's timestamp.
    #[instrument(skip(self, message))]
    pub async fn edit(
        &self,
        recipient: &str,
        target_timestamp: i64,
        message: &str,
    ) -> Result<i64, SignalError> {
        let mut request = SendMessageRequest::new(&self.phone_number, recipient, message);
        request.edit_timestamp = Some(target_timestamp);
        self.post_message(request).await
    }

    /// Delete a sent message for every recipient.
    #[instrument(skip(self))]
    pub async fn remote_delete(&self, recipient: &str, timestamp: i64) -> Result<(), SignalError> {
        let path = format!("/v1/remote-delete/{}", encode(&self.phone_number));
        let request = RemoteDeleteRequest {
            recipient: recipient.to_string(),
            timestamp,
        };
        let response = self.request(Method::DELETE, &path).json(&request).send().await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            warn!("Remote delete failed: {}", msg);
            return Err(SignalError::DeleteFailed(msg));
        }

        debug!("Deleted message {} for {}", timestamp, recipient);
        Ok(())
    }

    async fn post_message(&self, request: SendMessageRequest) -> Result<i64, SignalError> {
        let response = self
            .request(Method::POST, "/v2/send")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            warn!("Send failed: {}", msg);
            return Err(SignalError::SendFailed(msg));
        }

        let body: SendMessageResponse = response.json().await?;
        let timestamp = body.timestamp.ok_or(SignalError::MissingTimestamp)?;
        debug!("Sent message {}", timestamp);
        Ok(timestamp)
    }
}

// Webhook dispatch - Outbound HTTP calls issued by webhook actions

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use std::time::Duration;

/// A fully resolved outbound request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<WebhookBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WebhookBody {
    /// Sent with `Content-Type: application/json`
    Json(serde_json::Value),
    Raw(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Network collaborator used by webhook actions. Returns the response body as
/// text; the status code is not inspected.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn send(&self, request: WebhookRequest) -> Result<String, WebhookError>;
}

#[derive(Clone)]
pub struct HttpWebhookClient {
    client: Client,
}

impl HttpWebhookClient {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, WebhookError> {
        let mut builder = Client::builder().user_agent(user_agent.to_string());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn send(&self, request: WebhookRequest) -> Result<String, WebhookError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| WebhookError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.client.request(method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match request.body {
            Some(WebhookBody::Json(json)) => builder.json(&json),
            Some(WebhookBody::Raw(text)) => builder.body(text),
            None => builder,
        };

        let response = builder.send().await?;
        Ok(response.text().await?)
    }
}

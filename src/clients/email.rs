use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{http_client, ClientError, EmailSender};
use crate::config::EmailConfig;

/// A single outbound HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

/// Client for a transactional email HTTP API
#[derive(Clone)]
pub struct HttpEmailClient {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    from_address: String,
    from_name: String,
}

impl HttpEmailClient {
    pub fn new(config: &EmailConfig, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
            from_name: config.from_name.clone(),
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailClient {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ClientError> {
        let api_url = self
            .api_url
            .as_deref()
            .ok_or(ClientError::NotConfigured("EMAIL_API_URL"))?;

        let request = SendEmailRequest {
            from: Address {
                email: &self.from_address,
                name: Some(&self.from_name),
            },
            to: vec![Address {
                email: &message.to,
                name: None,
            }],
            subject: &message.subject,
            html_content: &message.html_body,
        };

        let mut builder = self.client.post(api_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(())
    }
}

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{http_client, ClientError, SmsSender};
use crate::config::SmsConfig;

#[derive(Debug, Serialize)]
struct TermiiSendRequest<'a> {
    to: String,
    from: &'a str,
    sms: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    channel: &'a str,
    api_key: &'a str,
}

/// Termii SMS gateway client
#[derive(Clone)]
pub struct TermiiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    sender_id: String,
    channel: String,
}

impl TermiiClient {
    pub fn new(config: &SmsConfig, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            sender_id: config.sender_id.clone(),
            channel: config.channel.clone(),
        }
    }
}

#[async_trait]
impl SmsSender for TermiiClient {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<(), ClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientError::NotConfigured("TERMII_API_KEY"))?;

        let to = normalize_phone(phone_number);
        let request = TermiiSendRequest {
            to,
            from: &self.sender_id,
            sms: message,
            kind: "plain",
            channel: &self.channel,
            api_key,
        };

        let response = self.client.post(&self.api_url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        log::info!("SMS dispatched to {}", request.to);
        Ok(())
    }
}

/// Formats a phone number for the gateway, assuming Nigeria (+234) when no
/// country code is present.
pub fn normalize_phone(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if cleaned.starts_with('+') {
        cleaned
    } else if let Some(rest) = cleaned.strip_prefix('0') {
        format!("+234{rest}")
    } else if cleaned.starts_with("234") {
        format!("+{cleaned}")
    } else {
        format!("+234{cleaned}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_local_and_international_numbers() {
        assert_eq!(normalize_phone("0801 234 5678"), "+2348012345678");
        assert_eq!(normalize_phone("2348012345678"), "+2348012345678");
        assert_eq!(normalize_phone("+44 (20) 7946-0958"), "+442079460958");
        assert_eq!(normalize_phone("8012345678"), "+2348012345678");
    }

    #[actix_web::test]
    async fn missing_api_key_is_reported_not_sent() {
        let client = TermiiClient::new(
            &SmsConfig {
                api_key: None,
                sender_id: "Linkoja".into(),
                api_url: "http://127.0.0.1:9/sms".into(),
                channel: "generic".into(),
            },
            Duration::from_secs(1),
        );

        let err = client.send_sms("08012345678", "hi").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConfigured("TERMII_API_KEY")));
    }
}

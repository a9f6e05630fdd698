pub mod email;
pub mod google;
pub mod sms;

use async_trait::async_trait;
use thiserror::Error;

pub use email::{EmailMessage, HttpEmailClient};
pub use google::{GoogleProfile, GoogleTokenClient};
pub use sms::TermiiClient;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("{0}")]
    Rejected(String),
}

/// Outbound SMS transport
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<(), ClientError>;
}

/// Outbound email transport
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ClientError>;
}

/// Validates a Google ID token and returns the identity it asserts
#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleProfile, ClientError>;
}

pub(crate) fn http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            log::warn!("Falling back to default HTTP client: {err}");
            reqwest::Client::new()
        })
}

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{http_client, ClientError, GoogleVerifier};
use crate::config::GoogleConfig;

/// Identity asserted by a validated Google ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    #[serde(default)]
    email_verified: serde_json::Value,
    name: Option<String>,
    picture: Option<String>,
}

/// Validates ID tokens against Google's tokeninfo endpoint
#[derive(Clone)]
pub struct GoogleTokenClient {
    client: reqwest::Client,
    tokeninfo_url: String,
    client_id: Option<String>,
}

impl GoogleTokenClient {
    pub fn new(config: &GoogleConfig, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            tokeninfo_url: config.tokeninfo_url.clone(),
            client_id: config.client_id.clone(),
        }
    }
}

#[async_trait]
impl GoogleVerifier for GoogleTokenClient {
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleProfile, ClientError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(ClientError::NotConfigured("GOOGLE_CLIENT_ID"))?;

        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let info: TokenInfo = response.json().await?;
        profile_from_token_info(info, client_id)
    }
}

fn profile_from_token_info(info: TokenInfo, client_id: &str) -> Result<GoogleProfile, ClientError> {
    match info.aud.as_deref() {
        Some(aud) if aud == client_id => {}
        Some(_) => return Err(ClientError::Rejected("Invalid token audience".into())),
        None => return Err(ClientError::Rejected("Token does not contain audience".into())),
    }

    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let (Some(email), Some(google_id)) = (non_empty(info.email), non_empty(info.sub)) else {
        return Err(ClientError::Rejected(
            "Token does not contain required user information".into(),
        ));
    };

    let email_verified = match &info.email_verified {
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::String(text) => text == "true",
        _ => false,
    };

    Ok(GoogleProfile {
        google_id,
        email,
        email_verified,
        name: non_empty(info.name),
        picture: non_empty(info.picture),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(value: serde_json::Value) -> TokenInfo {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_matching_audience() {
        let profile = profile_from_token_info(
            info(serde_json::json!({
                "aud": "client-1",
                "sub": "1234",
                "email": "ada@example.com",
                "email_verified": "true",
                "name": "Ada",
                "picture": "https://img/ada.png"
            })),
            "client-1",
        )
        .unwrap();

        assert_eq!(profile.google_id, "1234");
        assert_eq!(profile.email, "ada@example.com");
        assert!(profile.email_verified);
        assert_eq!(profile.picture.as_deref(), Some("https://img/ada.png"));
    }

    #[test]
    fn rejects_foreign_audience_and_missing_identity() {
        let wrong_aud = profile_from_token_info(
            info(serde_json::json!({ "aud": "someone-else", "sub": "1", "email": "a@b.c" })),
            "client-1",
        );
        assert!(matches!(wrong_aud, Err(ClientError::Rejected(_))));

        let no_email = profile_from_token_info(
            info(serde_json::json!({ "aud": "client-1", "sub": "1" })),
            "client-1",
        );
        assert!(matches!(no_email, Err(ClientError::Rejected(_))));
    }
}

//! Authorization code exchange

use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::check_status;
use crate::error::{BrokerError, Result};
use crate::provider::ProviderConfig;

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Set instead of tokens on failure; GitHub reports errors with status 200
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

pub(super) async fn exchange_code(
    http_client: &reqwest::Client,
    provider: &ProviderConfig,
    code: &str,
    code_verifier: Option<&str>,
) -> Result<TokenResponse> {
    let mut params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", provider.callback_url.as_str()),
        ("client_id", provider.client_id.as_str()),
    ];
    if !provider.client_secret.is_empty() {
        params.push(("client_secret", provider.client_secret.as_str()));
    }
    if let Some(verifier) = code_verifier {
        params.push(("code_verifier", verifier));
    }

    let response = http_client
        .post(&provider.endpoints.token)
        .header(ACCEPT, "application/json")
        .form(&params)
        .send()
        .await?;
    check_status(response.status(), "token exchange")?;

    let tokens: TokenResponse = response
        .json()
        .await
        .map_err(|e| BrokerError::unavailable(format!("Failed to parse token response: {}", e)))?;

    if let Some(error) = &tokens.error {
        return Err(BrokerError::invalid_token(format!("token exchange rejected: {}", error)));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_error_body_parses() {
        let body = r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#;
        let tokens: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(tokens.error.as_deref(), Some("bad_verification_code"));
        assert!(tokens.access_token.is_none());
    }

    #[test]
    fn test_oidc_token_body_parses() {
        let body = r#"{"access_token":"at","token_type":"Bearer","expires_in":3599,"id_token":"a.b.c","scope":"openid email"}"#;
        let tokens: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(tokens.id_token.as_deref(), Some("a.b.c"));
        assert_eq!(tokens.expires_in, Some(3599));
    }
}

//! User-info / profile fetch for opaque access tokens

use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use tracing::warn;

use super::{check_status, CanonicalClaims};
use crate::error::{BrokerError, Result};
use crate::provider::{facebook, github, ProviderConfig, ProviderKind};

pub(super) async fn fetch_profile(
    http_client: &reqwest::Client,
    provider: &ProviderConfig,
    access_token: &str,
) -> Result<CanonicalClaims> {
    let endpoint = provider.endpoints.userinfo.as_deref().ok_or_else(|| {
        BrokerError::configuration(format!(
            "provider {} has no userinfo endpoint",
            provider.provider_id
        ))
    })?;

    let mut request = http_client
        .get(endpoint)
        .bearer_auth(access_token)
        .header(ACCEPT, "application/json");

    if provider.kind == ProviderKind::Facebook {
        request = request.query(&[("fields", facebook::PROFILE_FIELDS)]);
    }

    let response = request.send().await?;
    check_status(response.status(), "userinfo request")?;

    let mut raw: Map<String, Value> = response
        .json()
        .await
        .map_err(|e| BrokerError::unavailable(format!("Failed to parse userinfo: {}", e)))?;

    if provider.kind == ProviderKind::Github && !has_email(&raw) {
        if let Some(emails_endpoint) = provider.endpoints.emails.as_deref() {
            match fetch_github_email(http_client, emails_endpoint, access_token).await {
                Ok(Some(entry)) => {
                    raw.insert("email".to_string(), Value::String(entry.email));
                    raw.insert("email_verified".to_string(), Value::Bool(entry.verified));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(provider_id = %provider.provider_id, error_code = e.error_code(), "Email lookup failed, continuing without email");
                }
            }
        }
    }

    Ok(CanonicalClaims::from_raw(provider.primary_issuer(), raw))
}

fn has_email(raw: &Map<String, Value>) -> bool {
    raw.get("email")
        .and_then(Value::as_str)
        .is_some_and(|e| !e.trim().is_empty())
}

async fn fetch_github_email(
    http_client: &reqwest::Client,
    endpoint: &str,
    access_token: &str,
) -> Result<Option<github::GithubEmail>> {
    let response = http_client
        .get(endpoint)
        .bearer_auth(access_token)
        .header(ACCEPT, "application/json")
        .send()
        .await?;
    check_status(response.status(), "emails request")?;

    let emails: Vec<github::GithubEmail> = response
        .json()
        .await
        .map_err(|e| BrokerError::unavailable(format!("Failed to parse emails: {}", e)))?;

    Ok(github::select_email(&emails).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_email() {
        let map = |v: Value| match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        assert!(has_email(&map(json!({ "email": "a@b.com" }))));
        assert!(!has_email(&map(json!({ "email": null }))));
        assert!(!has_email(&map(json!({ "email": "  " }))));
        assert!(!has_email(&map(json!({ "login": "octocat" }))));
    }
}

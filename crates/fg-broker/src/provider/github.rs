//! GitHub OAuth Apps
//!
//! GitHub issues access tokens only. `/user` omits the email when the user
//! keeps it private; `/user/emails` (needs `user:email`) lists every address.

use serde::Deserialize;

use super::KindDefaults;

pub const AUTHORIZATION_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
pub const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
pub const PROFILE_ENDPOINT: &str = "https://api.github.com/user";
pub const EMAILS_ENDPOINT: &str = "https://api.github.com/user/emails";
pub const ISSUER: &str = "https://github.com";

pub(crate) const DEFAULTS: KindDefaults = KindDefaults {
    authorization_endpoint: AUTHORIZATION_ENDPOINT,
    token_endpoint: TOKEN_ENDPOINT,
    userinfo_endpoint: Some(PROFILE_ENDPOINT),
    emails_endpoint: Some(EMAILS_ENDPOINT),
    jwks_uri: None,
    issuers: &[ISSUER],
    scopes: &["read:user", "user:email"],
    scope_separator: " ",
    issues_id_tokens: false,
};

/// Entry of the `/user/emails` response
#[derive(Debug, Clone, Deserialize)]
pub struct GithubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Primary address, else the first one listed
pub fn select_email(emails: &[GithubEmail]) -> Option<&GithubEmail> {
    emails.iter().find(|e| e.primary).or_else(|| emails.first())
}

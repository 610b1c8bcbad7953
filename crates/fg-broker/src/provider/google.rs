//! Google Sign-In

use super::KindDefaults;

pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
pub const JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Google signs tokens with either form of its issuer
pub const ISSUERS: &[&str] = &["https://accounts.google.com", "accounts.google.com"];

pub(crate) const DEFAULTS: KindDefaults = KindDefaults {
    authorization_endpoint: AUTHORIZATION_ENDPOINT,
    token_endpoint: TOKEN_ENDPOINT,
    userinfo_endpoint: Some(USERINFO_ENDPOINT),
    emails_endpoint: None,
    jwks_uri: Some(JWKS_URI),
    issuers: ISSUERS,
    scopes: &["openid", "email", "profile"],
    scope_separator: " ",
    issues_id_tokens: true,
};

//! Facebook Login
//!
//! Facebook hands out opaque access tokens only. The profile is read from the
//! Graph API `/me` node, which returns nothing beyond `id` unless fields are
//! named explicitly.

use super::KindDefaults;

pub const GRAPH_VERSION: &str = "v15.0";
pub const AUTHORIZATION_ENDPOINT: &str = "https://www.facebook.com/v15.0/dialog/oauth";
pub const TOKEN_ENDPOINT: &str = "https://graph.facebook.com/v15.0/oauth/access_token";
pub const PROFILE_ENDPOINT: &str = "https://graph.facebook.com/me";
pub const ISSUER: &str = "https://www.facebook.com";

/// `fields` query value for the `/me` request
pub const PROFILE_FIELDS: &str = "id,name,email";

pub(crate) const DEFAULTS: KindDefaults = KindDefaults {
    authorization_endpoint: AUTHORIZATION_ENDPOINT,
    token_endpoint: TOKEN_ENDPOINT,
    userinfo_endpoint: Some(PROFILE_ENDPOINT),
    emails_endpoint: None,
    jwks_uri: None,
    issuers: &[ISSUER],
    scopes: &["email", "public_profile"],
    scope_separator: ",",
    issues_id_tokens: false,
};

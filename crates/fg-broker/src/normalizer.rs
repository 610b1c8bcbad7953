//! Identity Normalization
//!
//! Maps verified claims onto the local identity shape. Each provider family
//! has a table of candidate claim names in priority order.

use serde_json::Value;

use crate::error::{BrokerError, Result};
use crate::identity::UnlinkedIdentity;
use crate::provider::ProviderKind;
use crate::verifier::CanonicalClaims;

enum NameSource {
    Claim(&'static str),
    /// `given_name` and `family_name` joined by a space
    GivenAndFamily,
}

struct FieldTable {
    subject: &'static [&'static str],
    display_name: &'static [NameSource],
    email: &'static [&'static str],
}

const OIDC_TABLE: FieldTable = FieldTable {
    subject: &["sub"],
    display_name: &[
        NameSource::Claim("name"),
        NameSource::GivenAndFamily,
        NameSource::Claim("preferred_username"),
    ],
    email: &["email"],
};

const FACEBOOK_TABLE: FieldTable = FieldTable {
    subject: &["id"],
    display_name: &[NameSource::Claim("name")],
    email: &["email"],
};

const GITHUB_TABLE: FieldTable = FieldTable {
    subject: &["id"],
    display_name: &[NameSource::Claim("name"), NameSource::Claim("login")],
    email: &["email"],
};

fn table(kind: ProviderKind) -> &'static FieldTable {
    match kind {
        ProviderKind::Google | ProviderKind::Oidc => &OIDC_TABLE,
        ProviderKind::Facebook => &FACEBOOK_TABLE,
        ProviderKind::Github => &GITHUB_TABLE,
    }
}

/// Normalize verified claims for `provider_id`
///
/// Fails with `IncompleteProfile` when no subject can be found, or when
/// neither an email nor a display name can.
pub fn normalize(
    provider_id: &str,
    kind: ProviderKind,
    claims: &CanonicalClaims,
) -> Result<UnlinkedIdentity> {
    let table = table(kind);

    let subject_id = clean(claims.subject_id.as_deref())
        .or_else(|| table.subject.iter().find_map(|name| identifier(claims, name)))
        .ok_or_else(|| BrokerError::incomplete("subject_id"))?;

    let display_name = clean(claims.display_name.as_deref()).or_else(|| {
        table.display_name.iter().find_map(|source| match source {
            NameSource::Claim(name) => string_claim(claims, name),
            NameSource::GivenAndFamily => given_and_family(claims),
        })
    });

    let email = clean(claims.email.as_deref())
        .or_else(|| table.email.iter().find_map(|name| string_claim(claims, name)))
        .map(|e| e.to_lowercase());

    if display_name.is_none() && email.is_none() {
        return Err(BrokerError::incomplete("email or display_name"));
    }

    Ok(UnlinkedIdentity::new(
        provider_id.to_string(),
        subject_id,
        display_name,
        email,
    ))
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_claim(claims: &CanonicalClaims, name: &str) -> Option<String> {
    clean(claims.raw.get(name).and_then(Value::as_str))
}

/// String claim, or an integer rendered in decimal
fn identifier(claims: &CanonicalClaims, name: &str) -> Option<String> {
    match claims.raw.get(name)? {
        Value::String(s) => clean(Some(s.as_str())),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_i64().map(|v| v.to_string())),
        _ => None,
    }
}

fn given_and_family(claims: &CanonicalClaims) -> Option<String> {
    let parts: Vec<String> = ["given_name", "family_name"]
        .iter()
        .filter_map(|name| string_claim(claims, name))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(issuer: &str, raw: Value) -> CanonicalClaims {
        match raw {
            Value::Object(map) => CanonicalClaims::from_raw(issuer, map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_google_claims() {
        let c = claims(
            "https://accounts.google.com",
            json!({ "sub": "u1", "email": "a@b.com", "name": "Ana" }),
        );
        let identity = normalize("google", ProviderKind::Google, &c).unwrap();

        assert_eq!(identity.provider_id(), "google");
        assert_eq!(identity.subject_id(), "u1");
        assert_eq!(identity.display_name(), Some("Ana"));
        assert_eq!(identity.email(), Some("a@b.com"));
    }

    #[test]
    fn test_oidc_name_fallbacks() {
        let c = claims("https://idp", json!({ "sub": "s", "given_name": "Ana", "family_name": "Lima" }));
        assert_eq!(
            normalize("corp", ProviderKind::Oidc, &c).unwrap().display_name(),
            Some("Ana Lima")
        );

        let c = claims("https://idp", json!({ "sub": "s", "preferred_username": "alima" }));
        assert_eq!(
            normalize("corp", ProviderKind::Oidc, &c).unwrap().display_name(),
            Some("alima")
        );
    }

    #[test]
    fn test_facebook_profile() {
        let c = claims("https://www.facebook.com", json!({ "id": "1029384756", "name": "Ana" }));
        let identity = normalize("facebook", ProviderKind::Facebook, &c).unwrap();

        assert_eq!(identity.subject_id(), "1029384756");
        assert!(identity.email().is_none());
    }

    #[test]
    fn test_github_numeric_id_and_login_fallback() {
        let c = claims("https://github.com", json!({ "id": 583231, "login": "octocat", "name": null }));
        let identity = normalize("github", ProviderKind::Github, &c).unwrap();

        assert_eq!(identity.subject_id(), "583231");
        assert_eq!(identity.display_name(), Some("octocat"));
    }

    #[test]
    fn test_trim_and_lowercase() {
        let c = claims(
            "https://accounts.google.com",
            json!({ "sub": " u1 ", "email": " Ana@Example.COM ", "name": "  " }),
        );
        let identity = normalize("google", ProviderKind::Google, &c).unwrap();

        assert_eq!(identity.subject_id(), "u1");
        assert_eq!(identity.email(), Some("ana@example.com"));
        assert!(identity.display_name().is_none());
    }

    #[test]
    fn test_typed_fields_win() {
        let mut c = claims("https://github.com", json!({ "id": 7, "name": "raw" }));
        c.display_name = Some("Typed".to_string());
        c.subject_id = Some("typed-subject".to_string());
        let identity = normalize("github", ProviderKind::Github, &c).unwrap();

        assert_eq!(identity.subject_id(), "typed-subject");
        assert_eq!(identity.display_name(), Some("Typed"));
    }

    #[test]
    fn test_missing_subject_is_incomplete() {
        let c = claims("https://accounts.google.com", json!({ "email": "a@b.com" }));
        assert!(matches!(
            normalize("google", ProviderKind::Google, &c),
            Err(BrokerError::IncompleteProfile { .. })
        ));
    }

    #[test]
    fn test_missing_email_and_name_is_incomplete() {
        let c = claims("https://www.facebook.com", json!({ "id": "1", "locale": "en_US" }));
        assert!(matches!(
            normalize("facebook", ProviderKind::Facebook, &c),
            Err(BrokerError::IncompleteProfile { .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let c = claims("https://accounts.google.com", json!({ "sub": "u1", "name": "Ana" }));
        assert_eq!(
            normalize("google", ProviderKind::Google, &c).unwrap(),
            normalize("google", ProviderKind::Google, &c).unwrap()
        );
    }
}

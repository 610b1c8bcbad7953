//! Signed ID token verification

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};

use super::{CanonicalClaims, JwksCache};
use crate::error::{BrokerError, Result};
use crate::provider::ProviderConfig;

/// Asymmetric algorithms accepted for ID tokens
const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

pub(super) async fn verify(
    jwks: &JwksCache,
    provider: &ProviderConfig,
    token: &str,
    expected_nonce: Option<&str>,
    leeway: u64,
) -> Result<CanonicalClaims> {
    let (header, payload) = split_token(token)?;

    // Expiry is decided on the payload alone, before any key is fetched
    check_expiry(&payload, leeway, Utc::now().timestamp())?;

    let alg = accepted_algorithm(&header)?;
    let kid = header.get("kid").and_then(Value::as_str);

    let jwks_uri = provider.endpoints.jwks_uri.as_deref().ok_or_else(|| {
        BrokerError::configuration(format!("provider {} has no jwks_uri", provider.provider_id))
    })?;
    let key = jwks.get_key(jwks_uri, kid, alg).await?;

    let mut validation = Validation::new(alg);
    validation.leeway = leeway;
    validation.validate_nbf = true;
    validation.set_issuer(provider.endpoints.issuers.as_slice());
    validation.set_audience(&[&provider.client_id]);
    validation.set_required_spec_claims(&["exp", "iss", "aud"]);

    let claims = decode::<Map<String, Value>>(token, &key, &validation)
        .map_err(|e| map_jwt_error(e, provider))?
        .claims;

    if let (Some(expected), Some(actual)) =
        (expected_nonce, claims.get("nonce").and_then(Value::as_str))
    {
        if expected != actual {
            return Err(BrokerError::StateMismatch);
        }
    }

    let issuer = claims
        .get("iss")
        .and_then(Value::as_str)
        .unwrap_or_else(|| provider.primary_issuer())
        .to_string();

    Ok(CanonicalClaims::from_raw(issuer, claims))
}

/// Split into header and payload objects; the signature is left to `decode`
fn split_token(token: &str) -> Result<(Map<String, Value>, Map<String, Value>)> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(BrokerError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    Ok((
        decode_segment(segments[0], "header")?,
        decode_segment(segments[1], "payload")?,
    ))
}

fn decode_segment(segment: &str, what: &str) -> Result<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|_| BrokerError::malformed(format!("{} is not base64url", what)))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(BrokerError::malformed(format!("{} is not a JSON object", what))),
    }
}

fn check_expiry(payload: &Map<String, Value>, leeway: u64, now: i64) -> Result<()> {
    let exp = match payload.get("exp") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| BrokerError::malformed("exp is out of range"))?,
        Some(_) => return Err(BrokerError::malformed("exp is not numeric")),
        None => return Err(BrokerError::malformed("missing exp claim")),
    };

    if exp.saturating_add(leeway as i64) < now {
        return Err(BrokerError::ExpiredCredential);
    }
    Ok(())
}

fn accepted_algorithm(header: &Map<String, Value>) -> Result<Algorithm> {
    let name = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| BrokerError::invalid_signature("header has no alg"))?;

    name.parse::<Algorithm>()
        .ok()
        .filter(|alg| ACCEPTED_ALGORITHMS.contains(alg))
        .ok_or_else(|| BrokerError::invalid_signature(format!("algorithm {} not accepted", name)))
}

fn map_jwt_error(err: jsonwebtoken::errors::Error, provider: &ProviderConfig) -> BrokerError {
    match err.kind() {
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => BrokerError::ExpiredCredential,
        ErrorKind::InvalidAudience => BrokerError::AudienceMismatch {
            expected: provider.client_id.clone(),
        },
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => BrokerError::AudienceMismatch {
            expected: provider.client_id.clone(),
        },
        ErrorKind::MissingRequiredClaim(claim) => {
            BrokerError::invalid_signature(format!("missing {} claim", claim))
        }
        ErrorKind::InvalidIssuer => BrokerError::invalid_signature("issuer not accepted"),
        _ => BrokerError::invalid_signature(err.to_string()),
    }
}

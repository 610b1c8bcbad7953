//! Shared fixtures: an RSA-signing test identity provider served by wiremock

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fg_broker::{AuthBroker, BrokerOptions, InMemoryUserDirectory, ProviderConfig, ProviderRegistry};

pub const CLIENT_ID: &str = "abc";
pub const CLIENT_SECRET: &str = "test-secret";
pub const KID: &str = "test-key-1";

pub struct SigningKey {
    pub kid: String,
    encoding_key: EncodingKey,
    pub jwk: Value,
}

impl SigningKey {
    fn generate(kid: &str) -> Self {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();

        let public_key = private_key.to_public_key();
        let jwk = json!({
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        });

        Self {
            kid: kid.to_string(),
            encoding_key,
            jwk,
        }
    }

    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_kid(claims, &self.kid)
    }

    pub fn sign_without_kid(&self, claims: &Value) -> String {
        encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key).unwrap()
    }

    pub fn sign_with_kid(&self, claims: &Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding_key).unwrap()
    }
}

/// Key published in the test JWKS
pub fn signing_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(|| SigningKey::generate(KID))
}

/// Unpublished key that claims the published kid
pub fn rogue_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(|| SigningKey::generate(KID))
}

/// Second published key, for rotation tests
pub fn rotated_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(|| SigningKey::generate("test-key-2"))
}

pub struct TestIdp {
    pub server: MockServer,
}

impl TestIdp {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    /// Serve `keys` at `/jwks`
    pub async fn publish_keys(&self, keys: &[&SigningKey]) {
        let jwks = json!({ "keys": keys.iter().map(|k| k.jwk.clone()).collect::<Vec<_>>() });
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .mount(&self.server)
            .await;
    }

    /// Google-kind provider pointed at this server
    pub fn google(&self) -> ProviderConfig {
        ProviderConfig::google(CLIENT_ID, CLIENT_SECRET, "https://app.example.com/auth/google/callback")
            .with_jwks_uri(self.url("/jwks"))
            .with_issuer(self.uri())
            .with_token_endpoint(self.url("/token"))
            .with_userinfo_endpoint(self.url("/userinfo"))
    }

    pub fn facebook(&self) -> ProviderConfig {
        ProviderConfig::facebook("fb-app", CLIENT_SECRET, "https://app.example.com/auth/facebook/callback")
            .with_token_endpoint(self.url("/oauth/access_token"))
            .with_userinfo_endpoint(self.url("/me"))
    }

    pub fn github(&self) -> ProviderConfig {
        ProviderConfig::github("gh-app", CLIENT_SECRET, "https://app.example.com/auth/github/callback")
            .with_token_endpoint(self.url("/login/oauth/access_token"))
            .with_userinfo_endpoint(self.url("/user"))
            .with_emails_endpoint(self.url("/user/emails"))
    }

    /// Standard claims for a token issued by this server
    pub fn id_token_claims(&self, subject: &str, nonce: Option<&str>) -> Value {
        let now = Utc::now().timestamp();
        let mut claims = json!({
            "iss": self.uri(),
            "sub": subject,
            "aud": CLIENT_ID,
            "iat": now,
            "exp": now + 3600,
            "email": "a@b.com",
            "email_verified": true,
            "name": "Ana",
        });
        if let Some(nonce) = nonce {
            claims["nonce"] = json!(nonce);
        }
        claims
    }
}

pub fn broker(providers: Vec<ProviderConfig>) -> AuthBroker {
    broker_with_options(providers, BrokerOptions::default())
}

pub fn broker_with_options(providers: Vec<ProviderConfig>, options: BrokerOptions) -> AuthBroker {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider).unwrap();
    }
    AuthBroker::with_options(registry, Arc::new(InMemoryUserDirectory::new()), options).unwrap()
}

/// Value of a query parameter in a redirect URL
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| urlencoding::decode(value).unwrap().into_owned())
    })
}

//! Auth Broker
//!
//! Orchestrates a login: `begin_login` issues the anti-forgery state and the
//! provider redirect, `complete_login` turns the provider's callback into a
//! local session.
//!
//! ```text
//! begin_login ──► LoginStateStore.issue ──► RedirectTarget
//! complete_login ──► LoginStateStore.consume
//!                ──► CredentialVerifier.verify
//!                ──► normalizer::normalize
//!                ──► UserDirectory.find_or_create_local_user
//!                ──► SessionStore.create
//! ```

use std::sync::Arc;

use chrono::Duration;
use fg_config::{FedGateConfig, MAX_TTL_SECS};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::Result;
use crate::identity::Identity;
use crate::login_state::{LoginState, LoginStateStore};
use crate::normalizer;
use crate::provider::{ProviderConfig, ProviderRegistry};
use crate::session::{SessionId, SessionStore};
use crate::users::UserDirectory;
use crate::verifier::{CredentialVerifier, FlowContext, RawCredential, VerifierOptions};

/// Where to send the browser to start a login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectTarget {
    pub url: String,
    pub state: String,
}

/// Broker tuning
#[derive(Debug, Clone)]
pub struct BrokerOptions {
    pub session_ttl: Duration,
    pub login_state_ttl: Duration,
    pub max_pending_logins: usize,
    pub verifier: VerifierOptions,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self::from_config(&FedGateConfig::default())
    }
}

impl BrokerOptions {
    pub fn from_config(config: &FedGateConfig) -> Self {
        Self {
            session_ttl: Duration::seconds(config.session.ttl_secs.clamp(1, MAX_TTL_SECS)),
            login_state_ttl: Duration::seconds(config.login.state_ttl_secs.clamp(1, MAX_TTL_SECS)),
            max_pending_logins: config.login.max_pending_states,
            verifier: VerifierOptions::from_config(config),
        }
    }
}

/// Federated login broker
pub struct AuthBroker {
    providers: Arc<ProviderRegistry>,
    verifier: CredentialVerifier,
    login_states: LoginStateStore,
    sessions: SessionStore,
    users: Arc<dyn UserDirectory>,
}

impl AuthBroker {
    pub fn new(providers: ProviderRegistry, users: Arc<dyn UserDirectory>) -> Result<Self> {
        Self::with_options(providers, users, BrokerOptions::default())
    }

    pub fn with_options(
        providers: ProviderRegistry,
        users: Arc<dyn UserDirectory>,
        options: BrokerOptions,
    ) -> Result<Self> {
        Ok(Self {
            providers: Arc::new(providers),
            verifier: CredentialVerifier::new(options.verifier)?,
            login_states: LoginStateStore::with_capacity(
                options.login_state_ttl,
                options.max_pending_logins,
            ),
            sessions: SessionStore::new(options.session_ttl),
            users,
        })
    }

    /// Build from loaded configuration
    pub fn from_config(config: &FedGateConfig, users: Arc<dyn UserDirectory>) -> Result<Self> {
        let providers = ProviderRegistry::from_settings(&config.providers)?;
        Self::with_options(providers, users, BrokerOptions::from_config(config))
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn login_states(&self) -> &LoginStateStore {
        &self.login_states
    }

    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    /// Start a login with `provider_id`
    pub fn begin_login(&self, provider_id: &str) -> Result<RedirectTarget> {
        let _span = info_span!("begin_login", provider_id = %provider_id).entered();

        let provider = self.providers.get(provider_id)?;
        let login_state = self
            .login_states
            .issue(provider_id, provider.issues_id_tokens());
        let url = authorization_url(provider, &login_state);

        info!("Login started");
        Ok(RedirectTarget {
            url,
            state: login_state.state,
        })
    }

    /// Finish a login from the provider's callback
    ///
    /// The first failing step's error is returned unchanged. The state is
    /// consumed whatever the outcome, so a failed attempt must restart with
    /// `begin_login`.
    pub async fn complete_login(
        &self,
        provider_id: &str,
        credential: RawCredential,
        returned_state: &str,
    ) -> Result<SessionId> {
        let span = info_span!(
            "complete_login",
            provider_id = %provider_id,
            credential = credential.kind(),
        );

        async {
            let result = self.run_login(provider_id, credential, returned_state).await;
            match &result {
                Ok(_) => info!("Login completed"),
                Err(e) => warn!(error_code = e.error_code(), "Login failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_login(
        &self,
        provider_id: &str,
        credential: RawCredential,
        returned_state: &str,
    ) -> Result<SessionId> {
        let login_state = self.login_states.consume(returned_state, provider_id);
        let provider = self.providers.get(provider_id)?;
        let login_state = login_state?;

        let flow = FlowContext {
            nonce: login_state.nonce,
            code_verifier: Some(login_state.code_verifier),
        };
        let claims = self.verifier.verify(provider, credential, &flow).await?;
        let unlinked = normalizer::normalize(provider_id, provider.kind, &claims)?;

        let local_user_id = self
            .users
            .find_or_create_local_user(
                unlinked.provider_id(),
                unlinked.subject_id(),
                unlinked.display_name(),
                unlinked.email(),
            )
            .await?;

        Ok(self.sessions.create(unlinked.link(local_user_id)))
    }

    /// Identity behind a session
    pub fn current_user(&self, session_id: &SessionId) -> Result<Identity> {
        self.sessions.resolve(session_id)
    }

    /// End a session; repeated calls are no-ops
    pub fn logout(&self, session_id: &SessionId) {
        if self.sessions.revoke(session_id) {
            info!("Session revoked");
        }
    }

    /// Sweep expired sessions and pending logins
    pub fn purge_expired(&self) -> usize {
        let removed = self.sessions.purge_expired() + self.login_states.purge_expired();
        if removed > 0 {
            debug!(removed, "Purged expired entries");
        }
        removed
    }
}

fn authorization_url(provider: &ProviderConfig, login_state: &LoginState) -> String {
    let endpoint = &provider.endpoints.authorization;
    let separator = if endpoint.contains('?') { '&' } else { '?' };

    let mut url = format!(
        "{}{}response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
        endpoint,
        separator,
        urlencoding::encode(&provider.client_id),
        urlencoding::encode(&provider.callback_url),
        urlencoding::encode(&provider.scope_param()),
        urlencoding::encode(&login_state.state),
        urlencoding::encode(&login_state.code_challenge()),
    );

    if let Some(nonce) = &login_state.nonce {
        url.push_str(&format!("&nonce={}", urlencoding::encode(nonce)));
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrokerError;
    use crate::users::InMemoryUserDirectory;

    fn broker() -> AuthBroker {
        let mut registry = ProviderRegistry::new();
        registry
            .register(ProviderConfig::google("abc", "secret", "https://app.example.com/auth/google/callback"))
            .unwrap();
        registry
            .register(ProviderConfig::facebook("fb-app", "secret", "https://app.example.com/auth/facebook/callback"))
            .unwrap();
        AuthBroker::new(registry, Arc::new(InMemoryUserDirectory::new())).unwrap()
    }

    #[test]
    fn test_begin_login_google_url() {
        let broker = broker();
        let target = broker.begin_login("google").unwrap();

        assert!(target.url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?response_type=code"));
        assert!(target.url.contains("client_id=abc"));
        assert!(target.url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fgoogle%2Fcallback"));
        assert!(target.url.contains("scope=email%20openid%20profile"));
        assert!(target.url.contains(&format!("state={}", target.state)));
        assert!(target.url.contains("code_challenge_method=S256"));
        assert!(target.url.contains("&nonce="));
        assert_eq!(broker.login_states().len(), 1);
    }

    #[test]
    fn test_begin_login_facebook_url() {
        let target = broker().begin_login("facebook").unwrap();

        assert!(target.url.starts_with("https://www.facebook.com/v15.0/dialog/oauth?"));
        assert!(target.url.contains("scope=email%2Cpublic_profile"));
        assert!(!target.url.contains("nonce="));
    }

    #[test]
    fn test_states_are_distinct() {
        let broker = broker();
        let a = broker.begin_login("google").unwrap();
        let b = broker.begin_login("google").unwrap();
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn test_begin_login_unknown_provider() {
        assert!(matches!(
            broker().begin_login("twitter"),
            Err(BrokerError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn test_authorization_url_keeps_existing_query() {
        let provider = ProviderConfig::new("corp", crate::ProviderKind::Oidc, "c", "", "/cb")
            .with_authorization_endpoint("https://idp.example.com/authorize?tenant=acme");
        let state = LoginStateStore::default().issue("corp", true);

        assert!(authorization_url(&provider, &state)
            .starts_with("https://idp.example.com/authorize?tenant=acme&response_type=code"));
    }

    #[tokio::test]
    async fn test_complete_login_with_forged_state() {
        let broker = broker();
        let result = broker
            .complete_login("google", RawCredential::IdToken("a.b.c".to_string()), "forged")
            .await;
        assert!(matches!(result, Err(BrokerError::StateMismatch)));
    }

    #[tokio::test]
    async fn test_unknown_provider_still_consumes_state() {
        let broker = broker();
        let target = broker.begin_login("google").unwrap();

        let result = broker
            .complete_login("twitter", RawCredential::IdToken("a.b.c".to_string()), &target.state)
            .await;
        assert!(matches!(result, Err(BrokerError::UnknownProvider { .. })));
        assert!(broker.login_states().is_empty());

        let retry = broker
            .complete_login("google", RawCredential::IdToken("a.b.c".to_string()), &target.state)
            .await;
        assert!(matches!(retry, Err(BrokerError::StateMismatch)));
    }

    #[test]
    fn test_options_clamp_oversized_ttls() {
        let mut config = FedGateConfig::default();
        config.session.ttl_secs = i64::MAX;
        config.login.state_ttl_secs = i64::MAX;

        let options = BrokerOptions::from_config(&config);
        assert_eq!(options.session_ttl, Duration::seconds(MAX_TTL_SECS));
        assert_eq!(options.login_state_ttl, Duration::seconds(MAX_TTL_SECS));
    }

    #[test]
    fn test_logout_unknown_session_is_noop() {
        let broker = broker();
        broker.logout(&SessionId::from("missing"));
        broker.logout(&SessionId::from("missing"));
        assert!(matches!(
            broker.current_user(&SessionId::from("missing")),
            Err(BrokerError::SessionNotFound)
        ));
    }
}

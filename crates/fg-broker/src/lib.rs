//! FedGate Broker
//!
//! Federated login across Google, Facebook, GitHub and generic OpenID
//! Connect issuers:
//! - provider registration with per-kind endpoint defaults
//! - credential verification (signed ID tokens, access tokens, code exchange)
//! - claim normalization into one local identity shape
//! - single-use login state and TTL-bound server-side sessions

pub mod broker;
pub mod error;
pub mod identity;
pub mod login_state;
pub mod normalizer;
pub mod provider;
pub mod session;
pub mod users;
pub mod verifier;

pub use broker::{AuthBroker, BrokerOptions, RedirectTarget};
pub use error::{BrokerError, Result};
pub use identity::{Identity, UnlinkedIdentity};
pub use login_state::{LoginState, LoginStateStore};
pub use provider::{ProviderConfig, ProviderEndpoints, ProviderKind, ProviderRegistry};
pub use session::{Session, SessionId, SessionStore};
pub use users::{InMemoryUserDirectory, UserDirectory};
pub use verifier::{CanonicalClaims, CredentialVerifier, FlowContext, RawCredential, VerifierOptions};

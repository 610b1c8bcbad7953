//! Broker Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Unknown provider: {provider_id}")]
    UnknownProvider { provider_id: String },

    #[error("Duplicate provider: {provider_id}")]
    DuplicateProvider { provider_id: String },

    #[error("Malformed token: {message}")]
    MalformedToken { message: String },

    #[error("Invalid signature: {message}")]
    InvalidSignature { message: String },

    #[error("Audience mismatch: token not issued for client {expected}")]
    AudienceMismatch { expected: String },

    #[error("Credential expired")]
    ExpiredCredential,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    #[error("Incomplete profile: missing {missing}")]
    IncompleteProfile { missing: String },

    #[error("Login state mismatch")]
    StateMismatch,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("User directory error: {message}")]
    UserDirectory { message: String },
}

impl BrokerError {
    pub fn unknown_provider(provider_id: impl Into<String>) -> Self {
        Self::UnknownProvider { provider_id: provider_id.into() }
    }

    pub fn duplicate_provider(provider_id: impl Into<String>) -> Self {
        Self::DuplicateProvider { provider_id: provider_id.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken { message: message.into() }
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature { message: message.into() }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken { message: message.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable { message: message.into() }
    }

    pub fn incomplete(missing: impl Into<String>) -> Self {
        Self::IncompleteProfile { missing: missing.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn user_directory(message: impl Into<String>) -> Self {
        Self::UserDirectory { message: message.into() }
    }

    /// Only a provider outage is worth an automatic retry; every other
    /// failure needs a fresh `begin_login` because state is single-use.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::ProviderUnavailable { .. })
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            BrokerError::UnknownProvider { .. } => "UNKNOWN_PROVIDER",
            BrokerError::DuplicateProvider { .. } => "DUPLICATE_PROVIDER",
            BrokerError::MalformedToken { .. } => "MALFORMED_TOKEN",
            BrokerError::InvalidSignature { .. } => "INVALID_SIGNATURE",
            BrokerError::AudienceMismatch { .. } => "AUDIENCE_MISMATCH",
            BrokerError::ExpiredCredential => "EXPIRED_CREDENTIAL",
            BrokerError::InvalidToken { .. } => "INVALID_TOKEN",
            BrokerError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            BrokerError::IncompleteProfile { .. } => "INCOMPLETE_PROFILE",
            BrokerError::StateMismatch => "STATE_MISMATCH",
            BrokerError::SessionNotFound => "SESSION_NOT_FOUND",
            BrokerError::SessionExpired => "SESSION_EXPIRED",
            BrokerError::Configuration { .. } => "CONFIGURATION_ERROR",
            BrokerError::UserDirectory { .. } => "USER_DIRECTORY_ERROR",
        }
    }

    /// Message safe to show the end user; never carries claim contents.
    pub fn user_message(&self) -> &'static str {
        match self {
            BrokerError::UnknownProvider { .. } => "This sign-in method is not available.",
            BrokerError::MalformedToken { .. }
            | BrokerError::InvalidSignature { .. }
            | BrokerError::AudienceMismatch { .. }
            | BrokerError::InvalidToken { .. } => {
                "We could not verify your sign-in. Please try again."
            }
            BrokerError::ExpiredCredential => "Your sign-in took too long. Please try again.",
            BrokerError::ProviderUnavailable { .. } => {
                "The identity provider is temporarily unavailable. Please try again shortly."
            }
            BrokerError::IncompleteProfile { .. } => {
                "Your identity provider did not share the profile details required to sign in."
            }
            BrokerError::StateMismatch => {
                "Your sign-in request is invalid or has expired. Please start again."
            }
            BrokerError::SessionNotFound | BrokerError::SessionExpired => {
                "Your session has ended. Please sign in again."
            }
            BrokerError::DuplicateProvider { .. }
            | BrokerError::Configuration { .. }
            | BrokerError::UserDirectory { .. } => "Sign-in is temporarily unavailable.",
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrokerError::unavailable("request to identity provider timed out")
        } else {
            BrokerError::unavailable(format!("request to identity provider failed: {}", err))
        }
    }
}

impl From<fg_config::ConfigError> for BrokerError {
    fn from(err: fg_config::ConfigError) -> Self {
        BrokerError::configuration(err.to_string())
    }
}

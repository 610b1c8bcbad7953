//! Local identity types
//!
//! An [`UnlinkedIdentity`] only comes out of the normalizer, and an
//! [`Identity`] only comes from linking one to a local user. Neither can be
//! built or deserialized by callers.

use serde::Serialize;

/// Normalized provider identity not yet mapped to a local user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlinkedIdentity {
    provider_id: String,
    subject_id: String,
    display_name: Option<String>,
    email: Option<String>,
}

impl UnlinkedIdentity {
    pub(crate) fn new(
        provider_id: String,
        subject_id: String,
        display_name: Option<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            provider_id,
            subject_id,
            display_name,
            email,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub(crate) fn link(self, local_user_id: String) -> Identity {
        Identity {
            local_user_id,
            provider_id: self.provider_id,
            subject_id: self.subject_id,
            display_name: self.display_name,
            email: self.email,
        }
    }
}

/// Authenticated user as seen by the application
///
/// `(provider_id, subject_id)` maps to exactly one `local_user_id`; one local
/// user may hold identities from several providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    local_user_id: String,
    provider_id: String,
    subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl Identity {
    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_keeps_profile() {
        let unlinked = UnlinkedIdentity::new(
            "google".to_string(),
            "u1".to_string(),
            Some("Ana".to_string()),
            Some("a@b.com".to_string()),
        );
        let identity = unlinked.link("user-1".to_string());

        assert_eq!(identity.local_user_id(), "user-1");
        assert_eq!(identity.provider_id(), "google");
        assert_eq!(identity.subject_id(), "u1");
        assert_eq!(identity.display_name(), Some("Ana"));
        assert_eq!(identity.email(), Some("a@b.com"));
    }

    #[test]
    fn test_serialize_camel_case() {
        let identity = UnlinkedIdentity::new("github".to_string(), "42".to_string(), None, None)
            .link("user-2".to_string());
        let json = serde_json::to_value(&identity).unwrap();

        assert_eq!(json["localUserId"], "user-2");
        assert_eq!(json["subjectId"], "42");
        assert!(json.get("email").is_none());
    }
}

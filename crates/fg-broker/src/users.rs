//! Local user directory seam

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::error::Result;

/// Maps provider identities onto local user accounts
///
/// Implementations must be an idempotent upsert keyed by
/// `(provider_id, subject_id)`: repeated or concurrent calls for the same
/// pair return the same local user id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_or_create_local_user(
        &self,
        provider_id: &str,
        subject_id: &str,
        display_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<String>;
}

/// In-process directory for development and tests
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<(String, String), String>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of linked provider identities
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn local_user_id(&self, provider_id: &str, subject_id: &str) -> Option<String> {
        self.users
            .get(&(provider_id.to_string(), subject_id.to_string()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_or_create_local_user(
        &self,
        provider_id: &str,
        subject_id: &str,
        _display_name: Option<&str>,
        _email: Option<&str>,
    ) -> Result<String> {
        let entry = self
            .users
            .entry((provider_id.to_string(), subject_id.to_string()))
            .or_insert_with(|| {
                let local_user_id = uuid::Uuid::new_v4().to_string();
                info!(provider_id, local_user_id = %local_user_id, "Created local user");
                local_user_id
            });
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let directory = InMemoryUserDirectory::new();
        let first = directory
            .find_or_create_local_user("google", "u1", Some("Ana"), Some("a@b.com"))
            .await
            .unwrap();
        let second = directory
            .find_or_create_local_user("google", "u1", None, None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.local_user_id("google", "u1"), Some(first));
    }

    #[tokio::test]
    async fn test_same_subject_different_provider() {
        let directory = InMemoryUserDirectory::new();
        let google = directory
            .find_or_create_local_user("google", "1", None, None)
            .await
            .unwrap();
        let github = directory
            .find_or_create_local_user("github", "1", None, None)
            .await
            .unwrap();

        assert_ne!(google, github);
    }
}

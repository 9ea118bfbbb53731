use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for one stored file
///
/// `permissions` decides privacy: `None` is public, `Some` is private and
/// lists the principals allowed to fetch signed URLs or delete. An empty
/// list is private with nobody authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: String,
    pub provider: String,
    pub purpose: String,
    /// Provider payload, only readable by the backend named in `provider`
    pub data: String,
    pub uploaded_by: String,
    pub permissions: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn is_private(&self) -> bool {
        self.permissions.is_some()
    }

    /// Whether `user_id` is explicitly listed in the permissions
    pub fn grants(&self, user_id: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|allowed| allowed.iter().any(|p| p == user_id))
    }
}

/// A record about to be persisted; the store assigns `id` when absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub id: Option<String>,
    pub provider: String,
    pub purpose: String,
    pub data: String,
    pub uploaded_by: String,
    pub permissions: Option<Vec<String>>,
}

impl NewFileRecord {
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> FileRecord {
        FileRecord {
            id,
            provider: self.provider,
            purpose: self.purpose,
            data: self.data,
            uploaded_by: self.uploaded_by,
            permissions: self.permissions,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(permissions: Option<Vec<String>>) -> FileRecord {
        NewFileRecord {
            id: None,
            provider: "memory".to_string(),
            purpose: "test".to_string(),
            data: "{}".to_string(),
            uploaded_by: "u1".to_string(),
            permissions,
        }
        .into_record("1".to_string(), Utc::now())
    }

    #[test]
    fn test_public_record_grants_nobody() {
        let file = record(None);
        assert!(!file.is_private());
        assert!(!file.grants("u1"));
    }

    #[test]
    fn test_private_record_grants_listed_users() {
        let file = record(Some(vec!["u1".to_string(), "u2".to_string()]));
        assert!(file.is_private());
        assert!(file.grants("u2"));
        assert!(!file.grants("u3"));
    }

    #[test]
    fn test_empty_permissions_is_private_for_everyone() {
        let file = record(Some(vec![]));
        assert!(file.is_private());
        assert!(!file.grants("u1"));
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller identity taken from a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Subject claim; this is the user id files are shared with
    pub sub: String,
    /// Session UID (only present for interactive OIDC flows)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_uid: Option<String>,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

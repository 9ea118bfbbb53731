use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::jwks::JwksClient;
use super::model::AuthenticatedUser;
use crate::core::error::AppError;

/// Validates RS256 bearer tokens against the issuer's JWKS
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "sessionUid", alias = "sid", default)]
    session_uid: Option<String>,
}

impl Claims {
    fn into_user(self) -> Result<AuthenticatedUser, AppError> {
        if self.sub.trim().is_empty() {
            return Err(AppError::Auth("Token has an empty subject".to_string()));
        }

        Ok(AuthenticatedUser {
            sub: self.sub,
            session_uid: self.session_uid,
        })
    }
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let token_data = decode::<Claims>(token, &decoding_key, &self.validation())
            .map_err(|e| AppError::Auth(e.to_string()))?;

        token_data.claims.into_user()
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        let jwks = Arc::new(JwksClient::new(
            "http://127.0.0.1:9/oidc",
            Duration::from_secs(60),
        ));
        JwtValidator::new(
            jwks,
            "http://127.0.0.1:9/oidc".to_string(),
            "filegate".to_string(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_claims_map_to_user() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub":"user-1","sid":"s-1","scope":"files:read files:write"}"#,
        )
        .unwrap();

        let user = claims.into_user().unwrap();

        assert_eq!(user.user_id(), "user-1");
        assert_eq!(user.session_uid.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_claims_without_session() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"service-a"}"#).unwrap();
        assert_eq!(claims.into_user().unwrap().session_uid, None);
    }

    #[test]
    fn test_claims_reject_blank_subject() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"  "}"#).unwrap();
        assert!(matches!(claims.into_user(), Err(AppError::Auth(_))));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let result = validator().validate_token("not-a-jwt").await;
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[tokio::test]
    async fn test_hs256_token_is_rejected_before_key_lookup() {
        // {"alg":"HS256","typ":"JWT","kid":"k1"}.{"sub":"u"}.sig
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6ImsxIn0.eyJzdWIiOiJ1In0.c2ln";
        let err = validator().validate_token(token).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported algorithm"));
    }
}

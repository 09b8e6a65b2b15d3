//! JWT session token verification.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{api::models::users::CurrentUser, config::Config, errors::Error, types::UserId};

/// Claims carried by identity-service access tokens. Unknown claims are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId, // Subject (user ID)
    pub exp: i64, // Expiration time
    #[serde(default)]
    pub iat: Option<i64>, // Issued at
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self { id: claims.sub }
    }
}

/// Verify and decode a JWT session token
pub fn verify_session_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    let secret_key = config.auth.jwt_secret.as_ref().ok_or_else(|| Error::Internal {
        operation: "JWT sessions: auth.jwt_secret is required".to_string(),
    })?;

    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let mut validation = Validation::default();
    // Identity-service tokens carry an `aud` we do not pin
    validation.validate_aud = false;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Server errors (500) - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },

        _ => Error::Internal {
            operation: format!("JWT verification (unknown error): {e}"),
        },
    })?;

    Ok(CurrentUser::from(token_data.claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("test-secret-key-for-jwt".to_string());
        config
    }

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_verify_identity_service_token() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();
        let token = sign(
            &serde_json::json!({
                "sub": user_id,
                "email": "operador@oficina.com.br",
                "aud": "authenticated",
                "role": "authenticated",
                "exp": (Utc::now() + chrono::Duration::hours(1)).timestamp(),
                "iat": Utc::now().timestamp(),
            }),
            "test-secret-key-for-jwt",
        );

        let user = verify_session_token(&token, &config).unwrap();
        assert_eq!(user.id, user_id);
    }

    #[test]
    fn test_verify_invalid_token() {
        let config = create_test_config();

        let result = verify_session_token("invalid.token.here", &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let config = create_test_config();
        let token = sign(
            &serde_json::json!({
                "sub": Uuid::new_v4(),
                "exp": (Utc::now() + chrono::Duration::hours(1)).timestamp(),
            }),
            "different-secret",
        );

        let result = verify_session_token(&token, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_expired_token() {
        let config = create_test_config();
        let token = sign(
            &serde_json::json!({
                "sub": Uuid::new_v4(),
                "exp": (Utc::now() - chrono::Duration::hours(2)).timestamp(),
            }),
            "test-secret-key-for-jwt",
        );

        let result = verify_session_token(&token, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_subject_must_be_uuid() {
        let config = create_test_config();
        let token = sign(
            &serde_json::json!({
                "sub": "not-a-uuid",
                "exp": (Utc::now() + chrono::Duration::hours(1)).timestamp(),
            }),
            "test-secret-key-for-jwt",
        );

        assert!(verify_session_token(&token, &config).is_err());
    }

    #[test]
    fn test_missing_secret_is_internal_error() {
        let config = Config::default();
        let result = verify_session_token("a.b.c", &config);
        assert!(matches!(result.unwrap_err(), Error::Internal { .. }));
    }
}

//! Caller identity from the `Authorization` header.
//!
//! Tokens are validated by the gateway in front of this service. Here the JWT
//! payload is only decoded to read the `sub` claim; signature, expiry, issuer
//! and audience are not checked.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::dangerous::insecure_decode;
use serde::Deserialize;
use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("authorization header with bearer token is required")]
    MissingCredential,

    #[error("malformed credential: {0}")]
    MalformedCredential(String),
}

#[derive(Debug, Deserialize)]
struct SubjectClaims {
    sub: String,
}

/// Returns the token of a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub fn user_id_from_token(token: &str) -> Result<String, IdentityError> {
    // Reads the claims whatever `alg` the provider signed with.
    let data = insecure_decode::<SubjectClaims>(token)
        .map_err(|e| IdentityError::MalformedCredential(e.to_string()))?;

    let sub = data.claims.sub.trim();
    if sub.is_empty() {
        return Err(IdentityError::MalformedCredential(
            "empty subject claim".to_string(),
        ));
    }
    Ok(sub.to_string())
}

pub fn user_id_from_header(header: Option<&str>) -> Result<String, IdentityError> {
    let token = header
        .and_then(bearer_token)
        .ok_or(IdentityError::MissingCredential)?;
    user_id_from_token(token)
}

/// The owner every handler acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        Ok(AuthUser(user_id_from_header(header)?))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    fn token(claims: serde_json::Value, secret: &[u8]) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_subject_is_extracted() {
        let jwt = token(json!({ "sub": "auth0|5f1e" }), b"secret");
        assert_eq!(user_id_from_token(&jwt).unwrap(), "auth0|5f1e");
    }

    #[test]
    fn test_signature_and_expiry_are_not_checked() {
        let expired = Utc::now().timestamp() - 3600;
        let jwt = token(
            json!({ "sub": "user-7", "exp": expired, "aud": "someone-else" }),
            b"a key this service never sees",
        );
        assert_eq!(user_id_from_token(&jwt).unwrap(), "user-7");
    }

    // {"alg":"RS256","kid":"x","typ":"JWT"}
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsImtpZCI6IngiLCJ0eXAiOiJKV1QifQ";
    // {"alg":"ES256","typ":"JWT"}
    const ES256_HEADER: &str = "eyJhbGciOiJFUzI1NiIsInR5cCI6IkpXVCJ9";
    // {"sub":"auth0|abc","iss":"https://tenant.auth0.com/","exp":1}
    const AUTH0_PAYLOAD: &str =
        "eyJzdWIiOiJhdXRoMHxhYmMiLCJpc3MiOiJodHRwczovL3RlbmFudC5hdXRoMC5jb20vIiwiZXhwIjoxfQ";

    #[test]
    fn test_asymmetric_tokens_from_the_provider_are_read() {
        for header in [RS256_HEADER, ES256_HEADER] {
            let jwt = format!("{}.{}.bm90LWEtcmVhbC1zaWduYXR1cmU", header, AUTH0_PAYLOAD);
            let bearer = format!("Bearer {}", jwt);
            assert_eq!(
                user_id_from_header(Some(&bearer)),
                Ok("auth0|abc".to_string())
            );
        }
    }

    #[test]
    fn test_missing_subject_is_malformed() {
        let jwt = token(json!({ "name": "no subject" }), b"secret");
        assert!(matches!(
            user_id_from_token(&jwt),
            Err(IdentityError::MalformedCredential(_))
        ));

        let jwt = token(json!({ "sub": "" }), b"secret");
        assert!(matches!(
            user_id_from_token(&jwt),
            Err(IdentityError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        assert!(matches!(
            user_id_from_token("not-a-jwt"),
            Err(IdentityError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            user_id_from_header(None),
            Err(IdentityError::MissingCredential)
        );
        assert_eq!(
            user_id_from_header(Some("Token xyz")),
            Err(IdentityError::MissingCredential)
        );
    }
}

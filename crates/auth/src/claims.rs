use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keyportal_core::Username;

use crate::AuthenticatedIdentity;

/// Session claims carried in the signed session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / authenticated username.
    pub sub: Username,

    /// Display name captured at login.
    pub name: String,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn issue(identity: &AuthenticatedIdentity, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            sub: identity.username.clone(),
            name: identity.display_name.clone(),
            issued_at: now,
            expires_at: now + lifetime,
        }
    }

    pub fn identity(&self) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            username: self.sub.clone(),
            display_name: self.name.clone(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has expired")]
    Expired,

    #[error("session not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid session time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("invalid session token: {0}")]
    InvalidToken(String),
}

/// Deterministically validate session claims.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// [`Hs256SessionSigner::verify`].
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), SessionError> {
    if claims.expires_at <= claims.issued_at {
        return Err(SessionError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(SessionError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(SessionError::Expired);
    }
    Ok(())
}

/// HS256 signer/verifier keyed by the session secret.
#[derive(Clone)]
pub struct Hs256SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256SessionSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        // Time-window checks live in `validate_claims`; the library only checks the signature.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for Hs256SessionSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Hs256SessionSigner(<secret>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            username: Username::new("alice"),
            display_name: "Alice".to_string(),
        }
    }

    #[test]
    fn window_checks() {
        let now = Utc::now();
        let claims = SessionClaims::issue(&identity(), now, Duration::days(14));
        assert_eq!(validate_claims(&claims, now), Ok(()));
        assert_eq!(
            validate_claims(&claims, now + Duration::days(14)),
            Err(SessionError::Expired)
        );
        assert_eq!(
            validate_claims(&claims, now - Duration::seconds(1)),
            Err(SessionError::NotYetValid)
        );

        let broken = SessionClaims::issue(&identity(), now, Duration::zero());
        assert_eq!(validate_claims(&broken, now), Err(SessionError::InvalidTimeWindow));
    }

    #[test]
    fn signed_token_verifies_and_keeps_identity() {
        let signer = Hs256SessionSigner::new(b"test-secret");
        let now = Utc::now();
        let token = signer
            .sign(&SessionClaims::issue(&identity(), now, Duration::hours(1)))
            .unwrap();

        let claims = signer.verify(&token, now).unwrap();
        assert_eq!(claims.identity(), identity());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256SessionSigner::new(b"one")
            .sign(&SessionClaims::issue(&identity(), now, Duration::hours(1)))
            .unwrap();

        let err = Hs256SessionSigner::new(b"two").verify(&token, now).unwrap_err();
        assert!(matches!(err, SessionError::InvalidToken(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = Hs256SessionSigner::new(b"test-secret");
        let issued = Utc::now() - Duration::days(30);
        let token = signer
            .sign(&SessionClaims::issue(&identity(), issued, Duration::days(14)))
            .unwrap();

        assert_eq!(signer.verify(&token, Utc::now()), Err(SessionError::Expired));
    }
}

//! Bearer token claims, minting, and verification.
//!
//! # Purpose
//! Defines the claim set carried by platform session tokens and the HS256
//! issuer/verifier pair used to produce and check them.
//!
//! # Key invariants
//! - Only HS256 is accepted; tokens with any other `alg` header fail
//!   verification.
//! - `iss`, `aud`, and `exp` are always validated; `sub` must be non-empty.
//! - Role tags travel as plain strings so tokens minted by other issuers with
//!   extra tags still verify; unknown tags are dropped by [`CdfClaims::role_set`].
//!
//! # Common pitfalls
//! - Issuer and verifier must share the same secret, issuer, and audience.
use crate::{AuthzError, AuthzResult, RoleSet};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdfClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl CdfClaims {
    pub fn role_set(&self) -> RoleSet {
        RoleSet::from_tags(&self.roles)
    }
}

pub struct TokenIssuer {
    issuer: String,
    audience: String,
    ttl: Duration,
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl: Duration,
    ) -> AuthzResult<Self> {
        if secret.is_empty() {
            return Err(AuthzError::EmptySecret);
        }
        Ok(Self {
            issuer: issuer.into(),
            audience: audience.into(),
            ttl,
            encoding_key: EncodingKey::from_secret(secret),
        })
    }

    pub fn mint(&self, subject: &str, email: Option<&str>, roles: &RoleSet) -> AuthzResult<String> {
        if subject.is_empty() {
            return Err(AuthzError::MissingSubject);
        }
        let now = now_epoch_seconds();
        let claims = CdfClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: subject.to_string(),
            email: email.map(str::to_string),
            roles: roles.tags(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            jti: None,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }
}

pub struct TokenVerifier {
    issuer: String,
    audience: String,
    leeway: u64,
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway: u64,
    ) -> AuthzResult<Self> {
        if secret.is_empty() {
            return Err(AuthzError::EmptySecret);
        }
        Ok(Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway,
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    pub fn verify(&self, token: &str) -> AuthzResult<CdfClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = self.leeway;
        let data = jsonwebtoken::decode::<CdfClaims>(token, &self.decoding_key, &validation)?;
        if data.claims.sub.is_empty() {
            return Err(AuthzError::MissingSubject);
        }
        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    const SECRET: &[u8] = b"test-secret-with-enough-entropy";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, "cdf-platform", "authenticated", Duration::from_secs(600))
            .expect("issuer")
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET, "cdf-platform", "authenticated", 5).expect("verifier")
    }

    #[test]
    fn mint_and_verify_roundtrip() {
        let roles = RoleSet::from_iter([Role::Plgo, Role::Auditor]);
        let token = issuer()
            .mint("user-1", Some("plgo@example.org"), &roles)
            .expect("mint");
        let claims = verifier().verify(&token).expect("verify");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("plgo@example.org"));
        assert_eq!(claims.role_set(), roles);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_audience() {
        let token = issuer().mint("user-1", None, &RoleSet::new()).expect("mint");
        let other = TokenVerifier::new(SECRET, "cdf-platform", "other", 5).expect("verifier");
        let err = other.verify(&token).expect_err("audience mismatch");
        assert!(matches!(err, AuthzError::Jwt(_)));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = issuer().mint("user-1", None, &RoleSet::new()).expect("mint");
        let other =
            TokenVerifier::new(b"another-secret", "cdf-platform", "authenticated", 5).expect("v");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let now = now_epoch_seconds();
        let claims = CdfClaims {
            iss: "cdf-platform".to_string(),
            aud: "authenticated".to_string(),
            sub: "user-1".to_string(),
            email: None,
            roles: vec![],
            iat: now - 7_200,
            exp: now - 3_600,
            jti: None,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .expect("encode");
        assert!(verifier().verify(&token).is_err());
    }

    #[test]
    fn unknown_role_tags_are_dropped() {
        let now = now_epoch_seconds();
        let claims = CdfClaims {
            iss: "cdf-platform".to_string(),
            aud: "authenticated".to_string(),
            sub: "user-1".to_string(),
            email: None,
            roles: vec!["mp".to_string(), "project_manager".to_string()],
            iat: now,
            exp: now + 60,
            jti: None,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .expect("encode");
        let verified = verifier().verify(&token).expect("verify");
        assert_eq!(verified.roles.len(), 2);
        assert_eq!(verified.role_set(), RoleSet::from_iter([Role::Mp]));
    }

    #[test]
    fn empty_secret_and_subject_rejected() {
        assert!(matches!(
            TokenIssuer::new(b"", "i", "a", Duration::from_secs(1)),
            Err(AuthzError::EmptySecret)
        ));
        assert!(matches!(
            TokenVerifier::new(b"", "i", "a", 0),
            Err(AuthzError::EmptySecret)
        ));
        assert!(matches!(
            issuer().mint("", None, &RoleSet::new()),
            Err(AuthzError::MissingSubject)
        ));
    }
}

use crate::models::all_models::UserRole;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structure representing JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: Uuid,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

/// Identity extracted from a verified token; attached to the request
/// extensions for the lifetime of one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: UserRole,
}

/// Signs and verifies credential tokens. Built once at startup from the
/// process-wide secret; a missing secret aborts startup, never a request.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens are invalid the moment `exp` passes
        validation.leeway = 0;

        TokenCodec {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validation,
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    /// Issues a signed, time-bounded token for the given account
    pub fn issue(
        &self,
        subject_id: Uuid,
        role: UserRole,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            id: subject_id,
            role,
            iat: now.timestamp() as usize,
            exp: (now + self.lifetime).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Verifies signature and expiry and returns the embedded claims.
    /// Malformed input is an error value, never a panic.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("unit-test-secret", 1)
    }

    #[test]
    fn issue_then_verify_round_trips_identity() {
        let codec = codec();
        let id = Uuid::new_v4();

        let token = codec.issue(id, UserRole::Doctor).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.id, id);
        assert_eq!(claims.role, UserRole::Doctor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_expired_token() {
        // One-hour lifetime, clock two hours ahead of issuance
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: Uuid::new_v4(),
            role: UserRole::User,
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
        };
        let token = encode(&Header::default(), &claims, &codec.encoding).unwrap();

        assert!(codec.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let codec = codec();
        let token = codec.issue(Uuid::new_v4(), UserRole::Admin).unwrap();

        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut mangled: String = signature.chars().rev().collect();
        if mangled == signature {
            mangled.push('x');
        }
        let tampered = format!("{}.{}", head, mangled);

        assert!(codec.verify(&tampered).is_err());
    }

    #[test]
    fn verify_rejects_token_signed_with_other_secret() {
        let other = TokenCodec::new("a-different-secret", 1);
        let token = other.issue(Uuid::new_v4(), UserRole::SuperAdmin).unwrap();

        assert!(codec().verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_malformed_input() {
        let codec = codec();

        assert!(codec.verify("").is_err());
        assert!(codec.verify("not-a-token").is_err());
        assert!(codec.verify("a.b.c").is_err());
    }
}

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Verify a token issued by the auth service. Token issuance lives outside
/// this backend; we only check the shared-secret signature and expiry.
pub fn validate_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

#[cfg(test)]
pub(crate) fn create_token(sub: &str, role: Role, secret: &str) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = chrono::Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        role,
        exp: (now + chrono::Duration::hours(24)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_token_round_trips() {
        let token = create_token("user-1", Role::Admin, "secret");
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("user-1", Role::Member, "secret");
        assert!(validate_token(&token, "other").is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(validate_token("not-a-jwt", "secret").is_none());
    }
}

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::error::AppError;

use super::jwt::{self, Claims, Role};

/// Authentication state extracted from the token cookie.
///
/// A missing or invalid token degrades to the unauthenticated view instead
/// of rejecting the request; handlers that require authentication call
/// [`AuthContext::require_authenticated`] explicitly.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub claims: Option<Claims>,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.claims
            .as_ref()
            .is_some_and(|c| c.role == Role::Admin)
    }

    /// User identifier for per-user bookmarks.
    pub fn user_id(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.sub.as_str())
    }

    pub fn require_authenticated(&self) -> Result<&Claims, AppError> {
        self.claims.as_ref().ok_or(AppError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(jar) = CookieJar::from_request_parts(parts, state).await;

        let claims = jar
            .get(&state.config.cookie_name)
            .and_then(|cookie| jwt::validate_token(cookie.value(), &state.config.jwt_secret));

        Ok(AuthContext { claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_is_rejected_with_401() {
        let anonymous = AuthContext::default();
        assert!(!anonymous.is_authenticated());
        assert!(matches!(
            anonymous.require_authenticated(),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn member_claims_are_not_admin() {
        let context = AuthContext {
            claims: Some(Claims {
                sub: "user-1".into(),
                role: Role::Member,
                exp: 0,
                iat: 0,
            }),
        };
        assert!(context.is_authenticated());
        assert!(!context.is_admin());
        assert_eq!(context.user_id(), Some("user-1"));
    }
}

//! Caller resolution and authorization policies
//!
//! Every request is resolved into a [`Caller`] by a [`CallerResolver`]
//! before it reaches a handler. The default resolver trusts the `Role`,
//! `UserId` and `computation_id` request headers as sent: any client able to
//! set those headers can act as any identity. A token-verifying resolver can
//! replace it without touching the handlers.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;

/// Header carrying the caller's role
pub const ROLE_HEADER: &str = "role";

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "userid";

/// Header carrying a computation id claim
pub const COMPUTATION_ID_HEADER: &str = "computation_id";

/// Role granted full access
pub const ADMIN_ROLE: &str = "admin";

// ============================================================================
// Caller
// ============================================================================

/// Claims attached to a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub role: Option<String>,
    pub user_id: Option<String>,
    pub computation_id: Option<String>,
}

impl Caller {
    pub fn admin() -> Self {
        Self {
            role: Some(ADMIN_ROLE.to_string()),
            ..Self::default()
        }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    /// Allow admins only
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            return Ok(());
        }
        Err(self.deny("admin role required"))
    }

    /// Allow admins and the user the resource belongs to
    pub fn require_subject_or_admin(&self, user_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id.as_deref() == Some(user_id) {
            return Ok(());
        }
        Err(self.deny("caller is neither admin nor the owning user"))
    }

    /// Allow admins and callers whose computation id claim matches.
    ///
    /// Mirrors the deployed delete-by-computation check, which compares the
    /// path against a `computation_id` header rather than the owning user.
    pub fn require_computation_or_admin(&self, computation_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.computation_id.as_deref() == Some(computation_id) {
            return Ok(());
        }
        Err(self.deny("caller is neither admin nor holding the computation id"))
    }

    fn deny(&self, reason: &str) -> ApiError {
        tracing::warn!(
            role = %self.role.as_deref().unwrap_or("-"),
            user_id = %self.user_id.as_deref().unwrap_or("-"),
            reason,
            "Authorization denied"
        );
        ApiError::Forbidden(format!("Not authorized: {}", reason))
    }
}

// ============================================================================
// Resolvers
// ============================================================================

/// Turns request headers into a [`Caller`]
pub trait CallerResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Caller;
}

/// Resolver that takes the identity headers at face value
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderCallerResolver;

impl CallerResolver for HeaderCallerResolver {
    fn resolve(&self, headers: &HeaderMap) -> Caller {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        Caller {
            role: header(ROLE_HEADER),
            user_id: header(USER_ID_HEADER),
            computation_id: header(COMPUTATION_ID_HEADER),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// State required by the caller resolution middleware
#[derive(Clone)]
pub struct AuthState {
    pub resolver: Arc<dyn CallerResolver>,
}

impl AuthState {
    pub fn new(resolver: Arc<dyn CallerResolver>) -> Self {
        Self { resolver }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new(Arc::new(HeaderCallerResolver))
    }
}

/// Middleware injecting the resolved [`Caller`] into request extensions.
///
/// Never rejects on its own; each operation applies its own policy.
pub async fn resolve_caller(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let caller = auth_state.resolver.resolve(request.headers());

    tracing::debug!(
        role = %caller.role.as_deref().unwrap_or("-"),
        user_id = %caller.user_id.as_deref().unwrap_or("-"),
        "Resolved caller"
    );

    request.extensions_mut().insert(caller);
    next.run(request).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum::response::IntoResponse;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_header_resolution_is_case_insensitive() {
        let caller = HeaderCallerResolver.resolve(&headers(&[("Role", "admin"), ("UserId", "u1")]));
        assert!(caller.is_admin());
        assert_eq!(caller.user_id.as_deref(), Some("u1"));
        assert_eq!(caller.computation_id, None);
    }

    #[test]
    fn test_blank_headers_are_absent() {
        let caller = HeaderCallerResolver.resolve(&headers(&[("role", "  ")]));
        assert_eq!(caller, Caller::default());
    }

    #[test]
    fn test_role_must_match_exactly() {
        let caller = HeaderCallerResolver.resolve(&headers(&[("role", "Admin")]));
        assert!(!caller.is_admin());
        assert!(caller.require_admin().is_err());
    }

    #[test]
    fn test_subject_policy() {
        assert!(Caller::user("u1").require_subject_or_admin("u1").is_ok());
        assert!(Caller::admin().require_subject_or_admin("u1").is_ok());
        assert!(Caller::user("u2").require_subject_or_admin("u1").is_err());
        assert!(Caller::default().require_subject_or_admin("u1").is_err());
    }

    #[test]
    fn test_computation_policy() {
        let holder = Caller {
            computation_id: Some("c1".to_string()),
            ..Caller::default()
        };
        assert!(holder.require_computation_or_admin("c1").is_ok());
        assert!(holder.require_computation_or_admin("c2").is_err());
        assert!(Caller::admin().require_computation_or_admin("c2").is_ok());
        // owning the record's user id is not enough here
        assert!(Caller::user("u1").require_computation_or_admin("c1").is_err());
    }

    #[test]
    fn test_denial_is_forbidden() {
        let err = Caller::default().require_admin().unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}

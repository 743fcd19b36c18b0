//! Auth Middleware
//!
//! - `require_access`: bearer access token → active user, or reject
//! - `optional_access`: same attempt, never rejects
//! - `enforce_route_policy`: role check against a per-route policy

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::application::CurrentUserUseCase;
use crate::domain::entity::user::User;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::{token_kind::TokenKind, user_role::UserRole};
use crate::error::{AuthError, AuthResult};
use crate::presentation::extract::CurrentUser;
use crate::presentation::handlers::AuthAppState;

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

async fn authenticate<R>(state: &AuthAppState<R>, token: &str) -> AuthResult<User>
where
    R: AuthStore,
{
    let claims = state.codec.verify(token, TokenKind::Access)?;
    CurrentUserUseCase::new(state.repo.clone())
        .execute(&claims.sub)
        .await
}

/// Middleware that requires a valid access token
pub async fn require_access<R>(
    State(state): State<AuthAppState<R>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
{
    let token = bearer_token(req.headers()).ok_or(AuthError::MissingToken)?;
    let user = authenticate(&state, &token).await?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Middleware that attaches a user when possible and otherwise proceeds
pub async fn optional_access<R>(
    State(state): State<AuthAppState<R>>,
    mut req: Request,
    next: Next,
) -> Response
where
    R: AuthStore,
{
    if let Some(token) = bearer_token(req.headers()) {
        match authenticate(&state, &token).await {
            Ok(user) => {
                req.extensions_mut().insert(CurrentUser(user));
            }
            Err(e) => {
                tracing::debug!(error = %e, "Optional access token ignored");
            }
        }
    }

    next.run(req).await
}

// ============================================================================
// Route Policy
// ============================================================================

/// Declared access rule for a group of routes, fixed at router construction
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    public: bool,
    roles: Arc<[UserRole]>,
}

impl RoutePolicy {
    /// Anyone, authenticated or not
    pub fn public() -> Self {
        Self {
            public: true,
            roles: Arc::from([]),
        }
    }

    /// Any authenticated user
    pub fn authenticated() -> Self {
        Self::roles(UserRole::ALL)
    }

    /// Authenticated users holding one of `roles`
    pub fn roles(roles: impl IntoIterator<Item = UserRole>) -> Self {
        Self {
            public: false,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Granted iff the route is public or `role` is one of the required roles
    pub fn authorize(&self, role: Option<UserRole>) -> AuthResult<()> {
        if self.public {
            return Ok(());
        }

        let Some(role) = role else {
            return Err(AuthError::MissingToken);
        };

        if self.roles.contains(&role) {
            return Ok(());
        }

        let required = self
            .roles
            .iter()
            .map(UserRole::code)
            .collect::<Vec<_>>()
            .join(", ");

        Err(AuthError::forbidden(format!(
            "Requires one of roles: {}",
            required
        )))
    }
}

/// Applies a [`RoutePolicy`]. Runs after `require_access` on protected routes.
pub async fn enforce_route_policy(
    State(policy): State<RoutePolicy>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let role = req
        .extensions()
        .get::<CurrentUser>()
        .map(|CurrentUser(user)| user.role);

    policy.authorize(role)?;

    Ok(next.run(req).await)
}

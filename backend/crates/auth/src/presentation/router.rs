//! Auth Router
//!
//! Access rules are attached per route group when the router is built.
//! Layers run outermost first: `require_access` resolves the user, then
//! `enforce_route_policy` checks the role.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::domain::repository::AuthStore;
use crate::domain::value_object::user_role::UserRole;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{
    RoutePolicy, enforce_route_policy, optional_access, require_access,
};

/// Routes under `/auth`
pub fn auth_router<R>(state: AuthAppState<R>) -> Router
where
    R: AuthStore,
{
    let public = Router::new()
        .route("/login", post(handlers::login::<R>))
        .route("/refresh", post(handlers::refresh::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .route("/forgot-password", post(handlers::forgot_password::<R>))
        .route("/reset-password", post(handlers::reset_password::<R>));

    // Guest bootstraps the first admin; later calls need an admin session
    let register = Router::new()
        .route("/register", post(handlers::register::<R>))
        .route_layer(from_fn_with_state(state.clone(), optional_access::<R>));

    let authenticated = Router::new()
        .route("/me", get(handlers::me))
        .route("/change-password", post(handlers::change_password::<R>))
        .route_layer(from_fn_with_state(
            RoutePolicy::authenticated(),
            enforce_route_policy,
        ))
        .route_layer(from_fn_with_state(state.clone(), require_access::<R>));

    Router::new()
        .merge(public)
        .merge(register)
        .merge(authenticated)
        .with_state(state)
}

/// Routes under `/users`, ADMIN only
pub fn users_router<R>(state: AuthAppState<R>) -> Router
where
    R: AuthStore,
{
    Router::new()
        .route("/", get(handlers::list_users::<R>))
        .route(
            "/{id}",
            get(handlers::get_user::<R>).patch(handlers::update_user::<R>),
        )
        .route(
            "/{id}/temporary-password",
            post(handlers::issue_temporary_password::<R>),
        )
        .route_layer(from_fn_with_state(
            RoutePolicy::roles([UserRole::Admin]),
            enforce_route_policy,
        ))
        .route_layer(from_fn_with_state(state.clone(), require_access::<R>))
        .with_state(state)
}

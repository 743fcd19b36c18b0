//! Presentation Layer
//!
//! HTTP handlers, DTOs, extractors, router, and middleware.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use extract::{CurrentUser, OptionalUser, ValidJson};
pub use handlers::AuthAppState;
pub use middleware::{RoutePolicy, enforce_route_policy, optional_access, require_access};
pub use router::{auth_router, users_router};

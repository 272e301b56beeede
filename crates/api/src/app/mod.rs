//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage, repositories, broadcaster, token validator
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: error taxonomy and JSON error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use brigade_auth::TokenValidator;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router.
pub fn build_app(validator: Arc<TokenValidator>, services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState { validator };

    // Protected routes: require an authenticated caller.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}

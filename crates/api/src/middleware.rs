use std::sync::Arc;

use axum::{
    extract::State,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use brigade_auth::TokenValidator;

use crate::app::errors::ApiError;
use crate::context::UserContext;

#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<TokenValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    // A header that is not valid UTF-8 is treated like a missing one.
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let user = match state.validator.validate(header).await {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(reason = %e, path = %req.uri().path(), "request not authenticated");
            return ApiError::Unauthenticated(e.to_string()).into_response();
        }
    };

    req.extensions_mut().insert(UserContext::new(user));
    next.run(req).await
}

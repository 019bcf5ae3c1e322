//! Authentication Middleware
//! Mission: Resolve the bearer token on protected routes to an Identity

use crate::api::error::ApiError;
use crate::auth::models::{Identity, UserId};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

/// Validates `Authorization: Bearer <jwt>`, loads the user and stores an
/// [`Identity`] in the request extensions for the handlers
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthenticated)?;

    let claims = state
        .jwt_handler
        .validate_token(bearer.token())
        .map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::InvalidToken
        })?;

    let user_id: UserId = claims.sub.parse().map_err(|_| ApiError::InvalidToken)?;
    let user = state
        .users
        .get_user(user_id)?
        .ok_or(ApiError::InvalidToken)?;

    req.extensions_mut().insert(Identity::from_user(&user));

    Ok(next.run(req).await)
}

/// Extract identity from request (use after auth middleware)
pub fn extract_identity(req: &Request) -> Option<&Identity> {
    req.extensions().get::<Identity>()
}

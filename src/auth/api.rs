//! Authentication API Endpoints
//! Mission: Registration, login and the current-user lookup

use crate::api::error::ApiError;
use crate::api::extract::ValidJson;
use crate::auth::{
    middleware::extract_identity,
    models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserResponse},
};
use crate::db::is_constraint_violation;
use crate::state::AppState;
use crate::validation::FieldErrors;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

const EMAIL_TAKEN: &str = "user with this email already exists.";

fn email_taken() -> ApiError {
    let mut fields = FieldErrors::new();
    fields.add("email", EMAIL_TAKEN);
    ApiError::invalid_fields(fields)
}

/// Register endpoint - POST /register
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let new_user = payload.validate()?;

    if state.users.get_user_by_email(&new_user.email)?.is_some() {
        info!("Registration rejected: email already registered");
        return Err(email_taken());
    }

    // A concurrent signup can still win the race to the unique index.
    let user = state.users.create_user(&new_user).map_err(|e| {
        if is_constraint_violation(&e) {
            email_taken()
        } else {
            ApiError::from(e)
        }
    })?;

    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from_user(&user),
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = crate::validation::normalize_email(&payload.email);

    let Some(user) = state.users.authenticate(&email, &payload.password)? else {
        warn!("Failed login attempt");
        return Err(ApiError::InvalidCredentials);
    };

    let (token, expires_in) = state.jwt_handler.generate_token(&user)?;

    info!(user_id = user.id, "Login successful");

    Ok(Json(LoginResponse {
        token,
        expires_in,
        user: UserResponse::from_user(&user),
    }))
}

/// Current user - GET /me
/// Answered from the identity the middleware already resolved
pub async fn get_current_user(req: Request) -> Result<Json<UserResponse>, ApiError> {
    let identity = extract_identity(&req).ok_or(ApiError::Unauthenticated)?;
    Ok(Json(UserResponse::from_identity(identity)))
}

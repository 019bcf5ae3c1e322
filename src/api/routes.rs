use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::api::{doctors, mappings, patients};
use crate::auth::{api as auth_api, auth_middleware};
use crate::middleware::{rate_limit_middleware, request_logging, RateLimitLayer};
use crate::state::AppState;

/// Create the API router
///
/// `/register` and `/login` go through `auth_limiter`; everything except
/// `/health` requires a bearer token.
pub fn create_router(state: AppState, auth_limiter: RateLimitLayer) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth_api::register))
        .route("/login", post(auth_api::login))
        .route_layer(middleware::from_fn_with_state(
            auth_limiter,
            rate_limit_middleware,
        ))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(auth_api::get_current_user))
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:id",
            get(patients::get_patient)
                .put(patients::replace_patient)
                .patch(patients::patch_patient)
                .delete(patients::delete_patient),
        )
        .route(
            "/doctors",
            get(doctors::list_doctors).post(doctors::create_doctor),
        )
        .route(
            "/doctors/:id",
            get(doctors::get_doctor)
                .put(doctors::replace_doctor)
                .patch(doctors::patch_doctor)
                .delete(doctors::delete_doctor),
        )
        .route(
            "/mappings",
            get(mappings::list_mappings).post(mappings::create_mapping),
        )
        .route(
            "/mappings/patient/:patient_id",
            get(mappings::list_patient_mappings),
        )
        .route(
            "/mappings/:id",
            get(mappings::get_mapping).delete(mappings::delete_mapping),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    let public_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

//! API Errors
//! Mission: One error type for every handler, mapped to status + JSON body

use crate::validation::FieldErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// No credentials on a protected route
    Unauthenticated,
    /// Credentials present but unusable (bad signature, expired, unknown user)
    InvalidToken,
    InvalidCredentials,
    Forbidden,
    NotFound(&'static str),
    Validation {
        message: String,
        fields: FieldErrors,
    },
    Internal,
}

impl ApiError {
    /// General validation failure without field detail
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    pub fn invalid_fields(fields: FieldErrors) -> Self {
        ApiError::Validation {
            message: "Invalid input.".to_string(),
            fields,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidToken | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        ApiError::invalid_fields(fields)
    }
}

/// Store and hashing failures. Details stay in the log.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %format!("{err:#}"), "Internal error while handling request");
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthenticated => {
                json!({ "error": "Authentication credentials were not provided." })
            }
            ApiError::InvalidToken => json!({ "error": "Invalid or expired token" }),
            ApiError::InvalidCredentials => json!({ "error": "Invalid email or password" }),
            ApiError::Forbidden => {
                json!({ "error": "You do not have permission to perform this action." })
            }
            ApiError::NotFound(kind) => json!({ "error": format!("{kind} not found") }),
            ApiError::Validation { message, fields } if fields.is_empty() => {
                json!({ "error": message })
            }
            ApiError::Validation { message, fields } => {
                json!({ "error": message, "fields": fields })
            }
            ApiError::Internal => json!({ "error": "Internal server error" }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("Patient").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::validation("bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(anyhow::anyhow!("disk on fire"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_field_errors_in_body() {
        let mut fields = FieldErrors::new();
        fields.add("name", "This field is required.");

        let body = body_json(ApiError::from(fields).into_response()).await;
        assert_eq!(body["error"], "Invalid input.");
        assert_eq!(body["fields"]["name"][0], "This field is required.");
    }

    #[tokio::test]
    async fn test_general_validation_has_no_fields() {
        let body = body_json(ApiError::validation("nope").into_response()).await;
        assert_eq!(body, serde_json::json!({ "error": "nope" }));
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::from(anyhow::anyhow!("secret path /var/db")).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }
}

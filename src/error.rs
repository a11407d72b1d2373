//! Request pipeline errors and their HTTP mapping.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::dispatcher::DispatchError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, malformed or rejected bearer credential.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Token verification is required but not usable in this deployment.
    #[error("{0}")]
    ServiceUnavailable(&'static str),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    Validation(String),

    /// Backend failure. Detail is logged, never returned to the caller.
    #[error("Backend dispatch failed")]
    Dispatch(#[from] DispatchError),
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => GatewayError::Unauthorized("Missing bearer token"),
            AuthError::InvalidToken => GatewayError::Unauthorized("Invalid identity token"),
            AuthError::VerifierUnavailable => {
                GatewayError::ServiceUnavailable("Auth libraries unavailable")
            }
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// JSON error body
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let GatewayError::Dispatch(err) = &self {
            tracing::error!(error = %err, "backend dispatch failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        };
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

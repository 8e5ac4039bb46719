use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::utils::GatewayError;

/// Failure surfaced by an HTTP handler
#[derive(Debug)]
pub enum ApiError {
    /// No caller identity on the request
    Unauthorized,
    Gateway(GatewayError),
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        ApiError::Gateway(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Gateway(e) => match e {
                GatewayError::InvalidAgent(_) | GatewayError::PromptTooLarge { .. } => StatusCode::BAD_REQUEST,
                GatewayError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
                GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                GatewayError::ProviderUnavailable(_) | GatewayError::ServiceUnavailable => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                GatewayError::Config(_) | GatewayError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (kind, detail) = match &self {
            ApiError::Unauthorized => ("unauthorized", "missing x-user-id header".to_string()),
            ApiError::Gateway(e) => (e.kind(), e.to_string()),
        };
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, detail);
        }
        (status, Json(json!({ "error": kind, "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GatewayError::InvalidAgent("x".into()), StatusCode::BAD_REQUEST),
            (GatewayError::PromptTooLarge { size: 2, limit: 1 }, StatusCode::BAD_REQUEST),
            (
                GatewayError::InsufficientCredits { balance: 0, required: 1 },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (GatewayError::RateLimited("ada".into()), StatusCode::TOO_MANY_REQUESTS),
            (GatewayError::ServiceUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (GatewayError::Ledger("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}

//! HTTP rendering of [`Error`].
//!
//! Every failure leaves the API as `{"success": false, "message": ...}` with a
//! status chosen by variant. Server-side failures are logged here and their
//! details are not sent to the client.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } | Self::Webhook { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } | Self::InsufficientStock { .. } => StatusCode::CONFLICT,
            Self::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Gateway { .. } | Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
            match self {
                Self::Gateway { .. } | Self::Http(_) => "Payment provider unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
            self.to_string()
        };

        let body = ErrorBody {
            success: false,
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::not_found("Order", 1).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::conflict("x").status_code(), StatusCode::CONFLICT);
        let transition = Error::InvalidTransition {
            from: "Completed".to_string(),
            to: "Pending".to_string(),
        };
        assert_eq!(transition.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let gateway = Error::Gateway {
            message: "x".to_string(),
        };
        assert_eq!(gateway.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let error = Error::Database(sea_orm::DbErr::Custom("secret table name".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
    }
}

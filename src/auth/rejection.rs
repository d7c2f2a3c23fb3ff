//! Responses produced when the gate refuses a request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const UNAUTHORIZED_MSG: &str = "The request is not authorized";

/// Terminal refusal outcomes of the gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The caller is not authorized.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An upstream dependency answered with an unexpected status.
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// No usable upstream response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Rejection::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Rejection::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Rejection::Unauthorized(detail)
            | Rejection::BadGateway(detail)
            | Rejection::Internal(detail) => detail,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnauthorizedBody<'a> {
    pub message: &'a str,
    pub error: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Rejection::Unauthorized(detail) => (
                status,
                Json(UnauthorizedBody {
                    message: UNAUTHORIZED_MSG,
                    error: detail,
                }),
            )
                .into_response(),
            Rejection::BadGateway(detail) | Rejection::Internal(detail) => {
                (status, Json(ErrorBody { error: detail })).into_response()
            }
        }
    }
}

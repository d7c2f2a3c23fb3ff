//! Authorization middleware.
//!
//! # Decision order
//! 1. Header parse failure → 401
//! 2. Token exchange refused with 401 → 401, any other failure → 502
//! 3. Enrichment fan-out runs to completion, then the first error decides:
//!    5xx → 502, other upstream status → 401, no status → 500
//! 4. Otherwise the enriched `User` is attached and the request proceeds

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use crate::auth::authentication::Authentication;
use crate::auth::enrichment::ReferenceData;
use crate::auth::error::OutcomeError;
use crate::auth::exchange::LoginService;
use crate::auth::rejection::Rejection;
use crate::auth::user::User;
use crate::config::AuthConfig;
use crate::http::client::{ClientBuildError, ResilientClient};
use crate::http::response::is_server_error;
use crate::observability::Metrics;

/// Shared state of the middleware: one client per upstream service.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    login: LoginService,
    reference: ReferenceData,
}

impl AuthorizationGate {
    pub fn new(config: &AuthConfig, metrics: Metrics) -> Result<Self, ClientBuildError> {
        let login = ResilientClient::new(&config.login_service, metrics.clone())?;
        let reference = ResilientClient::new(&config.member_wrapper, metrics)?;
        Ok(Self::from_clients(login, reference))
    }

    pub fn from_clients(login: ResilientClient, reference: ResilientClient) -> Self {
        Self {
            login: LoginService::new(login),
            reference: ReferenceData::new(reference),
        }
    }

    pub fn login(&self) -> &LoginService {
        &self.login
    }

    /// Resolve the caller's identity from the inbound headers.
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<User, Rejection> {
        let authentication = Authentication::from_headers(headers)
            .map_err(|e| Rejection::Unauthorized(e.to_string()))?;

        let mut user = self
            .login
            .exchange(&authentication, Some(cancel))
            .await
            .map_err(exchange_rejection)?;

        let report = self.reference.fan_out(&authentication, cancel).await;
        if let Some(rejection) = decide(&report.errors) {
            return Err(rejection);
        }
        report.merge_into(&mut user);
        Ok(user)
    }
}

fn exchange_rejection(err: OutcomeError) -> Rejection {
    if err.code == StatusCode::UNAUTHORIZED.as_u16() {
        Rejection::Unauthorized(err.message)
    } else {
        Rejection::BadGateway(err.message)
    }
}

/// Map enrichment failures to a rejection. Only the first error counts.
pub fn decide(errors: &[OutcomeError]) -> Option<Rejection> {
    let first = errors.first()?;
    let message = first.message.clone();
    Some(if is_server_error(first.code) {
        Rejection::BadGateway(message)
    } else if first.has_status() {
        Rejection::Unauthorized(message)
    } else {
        Rejection::Internal(message)
    })
}

/// Middleware entry point, installed with `axum::middleware::from_fn_with_state`.
///
/// Outbound calls are tied to a token cancelled when this future completes
/// or is dropped, so an abandoned request stops its upstream work.
pub async fn authorize(
    State(gate): State<AuthorizationGate>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match gate.resolve(req.headers(), &cancel).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(rejection) => {
            tracing::warn!(
                status = rejection.status().as_u16(),
                error = %rejection.detail(),
                path = %req.uri().path(),
                "request rejected"
            );
            rejection.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_errors_no_rejection() {
        assert_eq!(decide(&[]), None);
    }

    #[test]
    fn test_first_error_decides() {
        let errors = [OutcomeError::new(403, "forbidden"), OutcomeError::new(503, "down")];
        assert_eq!(
            decide(&errors),
            Some(Rejection::Unauthorized("forbidden".into()))
        );
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(
            decide(&[OutcomeError::new(503, "down")]),
            Some(Rejection::BadGateway("down".into()))
        );
        assert_eq!(
            decide(&[OutcomeError::new(404, "missing")]),
            Some(Rejection::Unauthorized("missing".into()))
        );
        assert_eq!(
            decide(&[OutcomeError::local("bad code")]),
            Some(Rejection::Internal("bad code".into()))
        );
    }

    #[test]
    fn test_exchange_failures() {
        assert_eq!(
            exchange_rejection(OutcomeError::new(401, "bad token")),
            Rejection::Unauthorized("bad token".into())
        );
        assert_eq!(
            exchange_rejection(OutcomeError::new(403, "nope")),
            Rejection::BadGateway("nope".into())
        );
        assert_eq!(
            exchange_rejection(OutcomeError::local("connection refused")),
            Rejection::BadGateway("connection refused".into())
        );
    }
}

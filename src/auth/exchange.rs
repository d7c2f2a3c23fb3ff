//! Token exchange against the login service.
//!
//! # Protocol
//! - `POST /token` with `{"token": "<credential>"}` and the original
//!   `Authorization` header
//! - 200: the body is a [`User`]
//! - anything else: the body is `{"error": "<message>"}`

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::auth::authentication::Authentication;
use crate::auth::error::OutcomeError;
use crate::auth::user::User;
use crate::health::ReadyCheck;
use crate::http::client::ResilientClient;

pub const TOKEN_PATH: &str = "/token";

/// Path probed by the readiness check.
pub const READY_PATH: &str = "/pkg";

/// Upper bound for a readiness probe.
pub const READY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default, deserialize_with = "crate::auth::user::null_as_default")]
    error: String,
}

/// Client for the login service.
#[derive(Debug, Clone)]
pub struct LoginService {
    client: ResilientClient,
}

impl LoginService {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    /// Turn a bearer credential into a [`User`].
    ///
    /// `Ok` always corresponds to a 200 answer and carries the caller's
    /// authentication. On failure the error code is the login service's
    /// status, or 0 when no decodable answer was obtained.
    pub async fn exchange(
        &self,
        authentication: &Authentication,
        cancel: Option<&CancellationToken>,
    ) -> Result<User, OutcomeError> {
        let body = serde_json::to_vec(&TokenRequest {
            token: &authentication.credential,
        })
        .map_err(|e| OutcomeError::local(e.to_string()))?;
        let mut headers = authentication
            .headers()
            .map_err(|e| OutcomeError::local(e.to_string()))?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(TOKEN_PATH, headers, Bytes::from(body), cancel)
            .await
            .map_err(|e| OutcomeError::local(e.to_string()))?;

        let code = response.status_code();
        if response.status == StatusCode::OK {
            let mut user: User = response
                .json()
                .map_err(|e| OutcomeError::local(format!("unable to decode user: {e}")))?;
            user.authentication = authentication.clone();
            return Ok(user);
        }

        let message = match response.json::<TokenErrorBody>() {
            Ok(body) => body.error,
            Err(e) => e.to_string(),
        };
        tracing::debug!(code, message = %message, "token exchange refused");
        Err(OutcomeError::new(code, message))
    }
}

#[async_trait]
impl ReadyCheck for LoginService {
    fn name(&self) -> &str {
        "login-service"
    }

    async fn ready(&self) -> Result<(), String> {
        let probe = self.client.get(READY_PATH, Default::default(), None);
        match tokio::time::timeout(READY_TIMEOUT, probe).await {
            Ok(Ok(response)) if response.status == StatusCode::OK => Ok(()),
            Ok(Ok(response)) => Err(format!(
                "login service is not available: {}",
                response.status_line()
            )),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("login service readiness probe timed out".to_string()),
        }
    }
}

//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether an attempt's outcome is retryable
//! - Hold the fixed delay and the retry budget of one client
//!
//! # Design Decisions
//! - Transport failures retry, except cancellation and deadline expiry
//! - Any 5xx response retries; everything else ends the loop
//! - `max_retry == 0` disables retries regardless of outcome

use std::time::Duration;

use crate::http::client::ClientError;
use crate::http::response::{is_server_error, Response};

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retry: u32,
    /// Sleep between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retry: u32, delay: Duration) -> Self {
        Self { max_retry, delay }
    }

    /// Policy that never retries.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retry > 0
    }

    /// Whether another attempt may follow `retries` earlier retries.
    pub fn allows(&self, retries: u32, outcome: &Result<Response, ClientError>) -> bool {
        retries < self.max_retry && is_retryable(outcome)
    }
}

/// Whether an attempt's outcome warrants another attempt.
pub fn is_retryable(outcome: &Result<Response, ClientError>) -> bool {
    match outcome {
        Ok(response) => is_server_error(response.status_code()),
        Err(err) => err.is_retryable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::tests::response_with_status;

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(is_retryable(&Ok(response_with_status(500))));
        assert!(is_retryable(&Ok(response_with_status(599))));
        assert!(!is_retryable(&Ok(response_with_status(200))));
        assert!(!is_retryable(&Ok(response_with_status(404))));
    }

    #[test]
    fn test_cancellation_is_not_retryable() {
        assert!(!is_retryable(&Err(ClientError::Cancelled)));
    }

    #[test]
    fn test_budget_is_enforced() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let failed = Ok(response_with_status(503));
        assert!(policy.allows(0, &failed));
        assert!(policy.allows(1, &failed));
        assert!(!policy.allows(2, &failed));
        assert!(!RetryPolicy::disabled().allows(0, &failed));
    }
}

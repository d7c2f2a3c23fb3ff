//! Readiness of the dependencies this instance needs to serve traffic.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

/// A dependency that can report whether it is usable.
#[async_trait]
pub trait ReadyCheck: Send + Sync {
    fn name(&self) -> &str;

    /// `Err` carries a human readable reason.
    async fn ready(&self) -> Result<(), String>;
}

/// The set of checks behind `/ready`.
#[derive(Clone, Default)]
pub struct Readiness {
    checks: Vec<Arc<dyn ReadyCheck>>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, check: Arc<dyn ReadyCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Register a dependency that may not be configured.
    pub fn with_optional(self, check: Option<Arc<dyn ReadyCheck>>) -> Self {
        match check {
            Some(check) => self.with_check(check),
            None => self,
        }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Probe every dependency concurrently. The first failure in
    /// registration order is reported.
    pub async fn check_all(&self) -> Result<(), String> {
        let outcomes = join_all(self.checks.iter().map(|check| async move {
            let outcome = check.ready().await;
            if let Err(reason) = &outcome {
                tracing::warn!(dependency = check.name(), reason = %reason, "dependency not ready");
            }
            outcome
        }))
        .await;

        outcomes.into_iter().collect()
    }
}

impl std::fmt::Debug for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|check| check.name()))
            .finish()
    }
}

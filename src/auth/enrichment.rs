//! Business-line and business-unit enrichment.
//!
//! # Data Flow
//! ```text
//! exchanged User
//!     → fan_out: two tasks on a JoinSet
//!         ├─ GET /v2/umvrefdata/businessline → names
//!         └─ GET /v2/umvrefdata/businessunit → codes parsed as integers
//!     → join point: every task finished
//!     → EnrichmentReport (results + errors in arrival order)
//!     → merge_into(&mut User), single-threaded
//! ```
//!
//! Branches never touch the `User`; they return owned results that are
//! merged after the join.

use serde::Deserialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::auth::authentication::Authentication;
use crate::auth::error::OutcomeError;
use crate::auth::user::{null_as_default, User};
use crate::http::client::ResilientClient;
use crate::http::response::Response;

pub const BUSINESS_LINE_PATH: &str = "/v2/umvrefdata/businessline";
pub const BUSINESS_UNIT_PATH: &str = "/v2/umvrefdata/businessunit";

/// One row of a reference-data answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReferenceItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReferenceEnvelope {
    #[serde(rename = "refData", default, deserialize_with = "null_as_default")]
    items: Vec<ReferenceItem>,
}

/// Result of one successful branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    BusinessLines(Vec<String>),
    BusinessUnits(Vec<i64>),
}

impl Enrichment {
    fn apply(self, user: &mut User) {
        match self {
            Enrichment::BusinessLines(lines) => user.business_lines.extend(lines),
            Enrichment::BusinessUnits(units) => user.business_units.extend(units),
        }
    }
}

/// Everything the branches produced, gathered after the join.
#[derive(Debug, Default)]
pub struct EnrichmentReport {
    pub enrichments: Vec<Enrichment>,
    /// In the order the branches reported them.
    pub errors: Vec<OutcomeError>,
}

impl EnrichmentReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<&OutcomeError> {
        self.errors.first()
    }

    /// Append every successful branch's results to `user`.
    pub fn merge_into(self, user: &mut User) {
        for enrichment in self.enrichments {
            enrichment.apply(user);
        }
    }
}

/// Client for the reference-data (member wrapper) service.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    client: ResilientClient,
}

impl ReferenceData {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    /// Run both lookups concurrently and wait for both.
    ///
    /// Dropping the returned future aborts the branches.
    pub async fn fan_out(
        &self,
        authentication: &Authentication,
        cancel: &CancellationToken,
    ) -> EnrichmentReport {
        let mut branches = JoinSet::new();

        let (client, auth, token) = (self.clone(), authentication.clone(), cancel.clone());
        branches.spawn(async move { client.business_lines(&auth, Some(&token)).await });

        let (client, auth, token) = (self.clone(), authentication.clone(), cancel.clone());
        branches.spawn(async move { client.business_units(&auth, Some(&token)).await });

        let mut report = EnrichmentReport::default();
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(Ok(enrichment)) => report.enrichments.push(enrichment),
                Ok(Err(err)) => report.errors.push(err),
                Err(e) => report.errors.push(OutcomeError::local(e.to_string())),
            }
        }
        report
    }

    pub async fn business_lines(
        &self,
        authentication: &Authentication,
        cancel: Option<&CancellationToken>,
    ) -> Result<Enrichment, OutcomeError> {
        let items = self.lookup(BUSINESS_LINE_PATH, authentication, cancel).await?;
        Ok(Enrichment::BusinessLines(
            items.into_iter().map(|item| item.name).collect(),
        ))
    }

    /// Any non-numeric code fails the whole branch.
    pub async fn business_units(
        &self,
        authentication: &Authentication,
        cancel: Option<&CancellationToken>,
    ) -> Result<Enrichment, OutcomeError> {
        let items = self.lookup(BUSINESS_UNIT_PATH, authentication, cancel).await?;
        let units = items
            .iter()
            .map(|item| parse_unit(&item.code))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Enrichment::BusinessUnits(units))
    }

    async fn lookup(
        &self,
        path: &str,
        authentication: &Authentication,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<ReferenceItem>, OutcomeError> {
        let headers = authentication
            .headers()
            .map_err(|e| OutcomeError::local(e.to_string()))?;
        let response = self
            .client
            .get(path, headers, cancel)
            .await
            .map_err(|e| OutcomeError::local(e.to_string()))?;
        decode_reference(&response)
    }
}

fn decode_reference(response: &Response) -> Result<Vec<ReferenceItem>, OutcomeError> {
    let code = response.status_code();
    if code == 200 {
        return response
            .json::<ReferenceEnvelope>()
            .map(|envelope| envelope.items)
            .map_err(|e| OutcomeError::local(format!("unable to decode reference data: {e}")));
    }

    let mut err = response
        .json::<OutcomeError>()
        .unwrap_or_else(|e| OutcomeError::local(e.to_string()));
    err.code = code;
    Err(err)
}

fn parse_unit(code: &str) -> Result<i64, OutcomeError> {
    code.parse::<i64>()
        .map_err(|e| OutcomeError::local(format!("invalid business unit code {code:?}: {e}")))
}

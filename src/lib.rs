//! Identity gate: bearer-token authorization with concurrent identity
//! enrichment, built on a resilient outbound HTTP client.

pub mod auth;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use auth::{authorize, AuthorizationGate, User};
pub use config::GateConfig;
pub use http::{HttpServer, ResilientClient};
pub use lifecycle::Shutdown;
pub use observability::Metrics;

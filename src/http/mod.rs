//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound:
//!     TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → auth gate (protected routes only)
//!     → handlers.rs
//!
//! Outbound:
//!     caller
//!     → client.rs (base URL join, default headers, retries, cancellation)
//!     → response.rs (status, headers, buffered body, timing)
//! ```

pub mod client;
pub mod handlers;
pub mod response;
pub mod server;

pub use client::{ClientBuildError, ClientError, ResilientClient};
pub use response::Response;
pub use server::HttpServer;

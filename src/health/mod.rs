//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health → liveness, always OK while the process serves
//! GET /ready
//!     → readiness.rs (probe every registered dependency concurrently)
//!     → 200 OK, or 503 with the first failure
//! ```

pub mod readiness;

pub use readiness::{ReadyCheck, Readiness};

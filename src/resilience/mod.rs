//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (http/client.rs):
//!     → attempt (bounded by the client timeout, per-host connection cap)
//!     → retries.rs (retryable? sleep fixed delay, try again)
//!     → cancellation aborts both the attempt and the sleep
//! ```
//!
//! Retries live only here; callers above the client never retry.

pub mod retries;

pub use retries::RetryPolicy;

//! Authorization subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → authentication.rs (parse `Authorization: Bearer <token>`)
//!     → exchange.rs (POST /token on the login service → User)
//!     → enrichment.rs (business lines + units, concurrently)
//!     → gate.rs (decide, attach User or answer with rejection.rs)
//!     → next handler
//! ```

pub mod authentication;
pub mod enrichment;
pub mod error;
pub mod exchange;
pub mod gate;
pub mod rejection;
pub mod user;

pub use authentication::Authentication;
pub use enrichment::{Enrichment, EnrichmentReport, ReferenceData};
pub use error::{AuthError, OutcomeError};
pub use exchange::LoginService;
pub use gate::{authorize, AuthorizationGate};
pub use rejection::Rejection;
pub use user::{Info, User};

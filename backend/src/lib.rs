//! RSVP backend library modules.
//!
//! The crate is arranged hexagonally: `domain` holds transport-agnostic
//! types and ports, `inbound` the HTTP adapters, `outbound` the PostgreSQL
//! persistence adapters, and `server` the configuration and app wiring used
//! by the binary entry point.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;

//! Shared HTTP adapter state.
//!
//! Handlers receive this via `actix_web::web::Data` so they depend only on
//! the domain port and the gate, never on outbound adapters directly.

use std::sync::Arc;

use crate::domain::ports::RsvpStore;
use crate::domain::AuthGate;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Store backing submit and list operations.
    pub rsvps: Arc<dyn RsvpStore>,
    /// Admission gate for protected reads.
    pub auth: AuthGate,
}

impl HttpState {
    /// Bundle a store and a gate for handler injection.
    pub fn new(rsvps: Arc<dyn RsvpStore>, auth: AuthGate) -> Self {
        Self { rsvps, auth }
    }
}

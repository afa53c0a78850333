//! Domain ports for the hexagonal boundary.
//!
//! Inbound adapters depend on these traits; outbound adapters implement
//! them. Each port ships a deterministic fixture so handlers can be tested
//! without I/O.

mod rsvp_store;

pub use rsvp_store::{FixtureRsvpStore, RsvpStore, RsvpStoreError};

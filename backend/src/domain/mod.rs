//! Domain primitives and ports.
//!
//! Purpose: define strongly typed entities used by the API and persistence
//! layers. Keep types immutable and document invariants and serialisation
//! contracts (serde) in each type's Rustdoc. Nothing in this module may
//! import a transport or database crate.

pub mod auth;
pub mod error;
pub mod ports;
pub mod rsvp;

pub use self::auth::AuthGate;
pub use self::error::{Error, ErrorCode};
pub use self::rsvp::{
    Allergies, EmailAddress, GuestName, Rsvp, RsvpSubmission, RsvpValidationError,
    SubmissionOutcome,
};

/// Convenient result alias for fallible domain operations.
pub type DomainResult<T> = Result<T, Error>;

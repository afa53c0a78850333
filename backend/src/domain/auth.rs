//! Shared-secret admission gate for protected reads.
//!
//! The gate owns the authorisation *decision*; extracting the presented key
//! from the transport (an `X-API-Key` header) is the inbound adapter's job.
//! With no secret configured every request is admitted — explicit open mode
//! for non-production use.

use zeroize::Zeroizing;

use crate::domain::{Error, DomainResult};

/// Binary admit/deny gate keyed on an optional shared secret.
///
/// # Examples
/// ```
/// use rsvp_backend::domain::AuthGate;
///
/// let gate = AuthGate::with_secret("s3cret");
/// assert!(gate.authorize(Some("s3cret")).is_ok());
/// assert!(gate.authorize(Some("wrong")).is_err());
/// assert!(AuthGate::open().authorize(None).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct AuthGate {
    secret: Option<Zeroizing<String>>,
}

impl AuthGate {
    /// Gate that admits every request (no secret configured).
    pub fn open() -> Self {
        Self { secret: None }
    }

    /// Gate that admits only requests presenting exactly `secret`.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(Zeroizing::new(secret.into())),
        }
    }

    /// Build a gate from optional configuration; `None` means open mode.
    pub fn from_config(secret: Option<String>) -> Self {
        match secret {
            Some(value) => Self::with_secret(value),
            None => Self::open(),
        }
    }

    /// Whether a secret is configured at all.
    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    /// Decide admission for a presented key.
    ///
    /// # Errors
    /// Returns an [`ErrorCode::Unauthorized`](crate::domain::ErrorCode)
    /// error when a secret is configured and the presented key is absent or
    /// differs from it.
    pub fn authorize(&self, presented: Option<&str>) -> DomainResult<()> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        match presented {
            Some(key) if key == secret.as_str() => Ok(()),
            _ => Err(Error::unauthorized("invalid or missing API key")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(None)]
    #[case(Some("anything"))]
    fn open_gate_admits_everything(#[case] presented: Option<&str>) {
        assert!(AuthGate::open().authorize(presented).is_ok());
    }

    #[test]
    fn configured_gate_admits_exact_match_only() {
        let gate = AuthGate::with_secret("s3cret");
        assert!(gate.authorize(Some("s3cret")).is_ok());
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("S3CRET"))]
    #[case(Some("s3cret "))]
    fn configured_gate_denies_mismatches(#[case] presented: Option<&str>) {
        let gate = AuthGate::with_secret("s3cret");
        let error = gate.authorize(presented).expect_err("denied");
        assert_eq!(error.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn from_config_maps_absence_to_open_mode() {
        assert!(AuthGate::from_config(None).is_open());
        assert!(!AuthGate::from_config(Some("k".into())).is_open());
    }
}

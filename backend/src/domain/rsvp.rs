//! RSVP data model.
//!
//! The natural key of an RSVP is the `(name, email)` pair: at most one live
//! record exists per pair, and a later submission for the same pair replaces
//! the earlier one in place. Validation happens at construction so the rest
//! of the system only ever sees well-formed values.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum length of a guest name in characters.
pub const NAME_MAX: usize = 255;
/// Maximum length of an email address in characters.
pub const EMAIL_MAX: usize = 255;
/// Maximum length of the allergies note in characters.
pub const ALLERGIES_MAX: usize = 500;

/// Attendance default applied when a submission omits `coming`.
pub const DEFAULT_COMING: bool = true;
/// Transport-assistance default applied when a submission omits it.
pub const DEFAULT_TRANSPORT_ASSIST: bool = false;

/// Validation errors returned by the RSVP value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsvpValidationError {
    EmptyName,
    NameTooLong { max: usize },
    EmptyEmail,
    EmailTooLong { max: usize },
    InvalidEmail,
    AllergiesTooLong { max: usize },
}

impl fmt::Display for RsvpValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::NameTooLong { max } => write!(f, "name must be at most {max} characters"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmailTooLong { max } => write!(f, "email must be at most {max} characters"),
            Self::InvalidEmail => write!(f, "email must be a valid address"),
            Self::AllergiesTooLong { max } => {
                write!(f, "allergies must be at most {max} characters")
            }
        }
    }
}

impl std::error::Error for RsvpValidationError {}

/// Guest name as submitted from the RSVP form.
///
/// Surrounding whitespace is stripped; the trimmed value must be 1 to
/// [`NAME_MAX`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GuestName(String);

impl GuestName {
    /// Validate and construct a [`GuestName`].
    pub fn new(name: impl Into<String>) -> Result<Self, RsvpValidationError> {
        let trimmed = name.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(RsvpValidationError::EmptyName);
        }
        if trimmed.chars().count() > NAME_MAX {
            return Err(RsvpValidationError::NameTooLong { max: NAME_MAX });
        }
        Ok(Self(trimmed))
    }
}

impl AsRef<str> for GuestName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for GuestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<GuestName> for String {
    fn from(value: GuestName) -> Self {
        value.0
    }
}

impl TryFrom<String> for GuestName {
    type Error = RsvpValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        // Syntactic check only: one @, no whitespace, dotted domain.
        let pattern = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Email address with a syntactic validity check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`].
    pub fn new(email: impl Into<String>) -> Result<Self, RsvpValidationError> {
        let trimmed = email.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(RsvpValidationError::EmptyEmail);
        }
        if trimmed.chars().count() > EMAIL_MAX {
            return Err(RsvpValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        if !email_regex().is_match(&trimmed) {
            return Err(RsvpValidationError::InvalidEmail);
        }
        Ok(Self(trimmed))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = RsvpValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Free-text allergies note, up to [`ALLERGIES_MAX`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Allergies(String);

impl Allergies {
    /// Validate and construct an [`Allergies`] note.
    pub fn new(note: impl Into<String>) -> Result<Self, RsvpValidationError> {
        let note = note.into();
        if note.chars().count() > ALLERGIES_MAX {
            return Err(RsvpValidationError::AllergiesTooLong {
                max: ALLERGIES_MAX,
            });
        }
        Ok(Self(note))
    }
}

impl AsRef<str> for Allergies {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Allergies> for String {
    fn from(value: Allergies) -> Self {
        value.0
    }
}

impl TryFrom<String> for Allergies {
    type Error = RsvpValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Validated write model for one RSVP submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpSubmission {
    name: GuestName,
    email: EmailAddress,
    coming: bool,
    allergies: Option<Allergies>,
    transport_assist: bool,
}

impl RsvpSubmission {
    /// Construct a submission with the documented defaults for the optional
    /// flags (`coming = true`, `transport_assist = false`).
    pub fn new(name: GuestName, email: EmailAddress) -> Self {
        Self {
            name,
            email,
            coming: DEFAULT_COMING,
            allergies: None,
            transport_assist: DEFAULT_TRANSPORT_ASSIST,
        }
    }

    /// Override the attendance flag.
    #[must_use]
    pub fn with_coming(mut self, coming: bool) -> Self {
        self.coming = coming;
        self
    }

    /// Attach an allergies note.
    #[must_use]
    pub fn with_allergies(mut self, allergies: Option<Allergies>) -> Self {
        self.allergies = allergies;
        self
    }

    /// Override the transport-assistance flag.
    #[must_use]
    pub fn with_transport_assist(mut self, transport_assist: bool) -> Self {
        self.transport_assist = transport_assist;
        self
    }

    /// Guest name component of the natural key.
    pub fn name(&self) -> &GuestName {
        &self.name
    }

    /// Email component of the natural key.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Whether the guest is coming.
    pub fn coming(&self) -> bool {
        self.coming
    }

    /// Allergies note, if provided.
    pub fn allergies(&self) -> Option<&Allergies> {
        self.allergies.as_ref()
    }

    /// Whether the guest needs help with transport.
    pub fn transport_assist(&self) -> bool {
        self.transport_assist
    }
}

/// Persisted RSVP record.
///
/// `id` is assigned by storage and immutable; `created_at` reflects the most
/// recent submission for the `(name, email)` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rsvp {
    pub id: i32,
    pub name: GuestName,
    pub email: EmailAddress,
    pub coming: bool,
    pub allergies: Option<Allergies>,
    pub transport_assist: bool,
    pub created_at: DateTime<Utc>,
}

/// Which branch of the atomic upsert a submission took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// First submission for the `(name, email)` pair.
    Created,
    /// A record with the same pair existed and was replaced in place.
    Replaced,
}

impl SubmissionOutcome {
    /// Returns true when an existing record was overwritten.
    ///
    /// # Examples
    /// ```
    /// use rsvp_backend::domain::SubmissionOutcome;
    ///
    /// assert!(SubmissionOutcome::Replaced.is_replaced());
    /// assert!(!SubmissionOutcome::Created.is_replaced());
    /// ```
    pub fn is_replaced(self) -> bool {
        matches!(self, Self::Replaced)
    }
}

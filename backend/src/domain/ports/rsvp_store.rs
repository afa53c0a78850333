//! Port for RSVP persistence.
//!
//! The [`RsvpStore`] trait defines the contract for the conflict-resolving
//! write and the ordered read. Adapters must implement `submit` as a single
//! atomic statement: the created/replaced distinction comes from the storage
//! engine's own conflict branch, never from a separate existence check.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use crate::domain::rsvp::{Rsvp, RsvpSubmission, SubmissionOutcome};

/// Errors raised by RSVP store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RsvpStoreError {
    /// The database could not be reached or a connection checkout failed.
    #[error("rsvp store connection failed: {message}")]
    Connection { message: String },

    /// A query or mutation failed during execution.
    #[error("rsvp store query failed: {message}")]
    Query { message: String },

    /// A uniqueness violation surfaced outside the conflict-resolving write.
    #[error("rsvp already exists: {message}")]
    Duplicate { message: String },
}

impl RsvpStoreError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a duplicate-key error with the given message.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate {
            message: message.into(),
        }
    }
}

/// Port for RSVP storage and retrieval.
#[async_trait]
pub trait RsvpStore: Send + Sync {
    /// Insert a new record keyed by `(name, email)` or replace all mutable
    /// fields of the existing record with that key, atomically.
    ///
    /// Returns whether the write took the insert branch
    /// ([`SubmissionOutcome::Created`]) or the conflict branch
    /// ([`SubmissionOutcome::Replaced`]).
    async fn submit(
        &self,
        submission: &RsvpSubmission,
    ) -> Result<SubmissionOutcome, RsvpStoreError>;

    /// Return every record, most recent submission first.
    async fn list_all(&self) -> Result<Vec<Rsvp>, RsvpStoreError>;
}

/// In-memory store with the same upsert-by-natural-key semantics as the
/// database adapter. Backs handler tests; not safe for production use.
#[derive(Debug, Default)]
pub struct FixtureRsvpStore {
    inner: Mutex<FixtureInner>,
}

#[derive(Debug, Default)]
struct FixtureInner {
    rows: Vec<Rsvp>,
    next_id: i32,
}

impl FixtureRsvpStore {
    /// Create an empty fixture store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held. Test helper.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RsvpStore for FixtureRsvpStore {
    async fn submit(
        &self,
        submission: &RsvpSubmission,
    ) -> Result<SubmissionOutcome, RsvpStoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| RsvpStoreError::query("fixture store poisoned"))?;

        let existing = inner.rows.iter_mut().find(|row| {
            row.name == *submission.name() && row.email == *submission.email()
        });
        match existing {
            Some(row) => {
                row.coming = submission.coming();
                row.allergies = submission.allergies().cloned();
                row.transport_assist = submission.transport_assist();
                row.created_at = Utc::now();
                Ok(SubmissionOutcome::Replaced)
            }
            None => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.rows.push(Rsvp {
                    id,
                    name: submission.name().clone(),
                    email: submission.email().clone(),
                    coming: submission.coming(),
                    allergies: submission.allergies().cloned(),
                    transport_assist: submission.transport_assist(),
                    created_at: Utc::now(),
                });
                Ok(SubmissionOutcome::Created)
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<Rsvp>, RsvpStoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| RsvpStoreError::query("fixture store poisoned"))?;
        let mut rows = inner.rows.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

//! PostgreSQL-backed [`RsvpStore`] implementation.
//!
//! The submit path is one atomic `INSERT .. ON CONFLICT .. DO UPDATE`
//! statement; whether it took the insert or the conflict branch is read
//! back from the database itself via `RETURNING (xmax = 0)`. The statement
//! goes through `diesel::sql_query` because the branch marker is a Postgres
//! system column the query DSL cannot express.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Nullable, Text};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};

use crate::domain::ports::{RsvpStore, RsvpStoreError};
use crate::domain::rsvp::{Rsvp, RsvpSubmission, SubmissionOutcome};

use super::connection::{DbPool, TransactionError};
use super::models::{RsvpRow, UpsertResultRow};
use super::schema::rsvps;

/// One atomic statement: insert a fresh row or overwrite all mutable fields
/// of the row sharing the `(name, email)` key, refreshing `created_at` on
/// both branches. `xmax = 0` holds only for the insert branch.
const UPSERT_SQL: &str = "\
    INSERT INTO rsvps (name, email, coming, allergies, transport_assist, created_at) \
    VALUES ($1, $2, $3, $4, $5, now()) \
    ON CONFLICT (name, email) DO UPDATE SET \
        coming = EXCLUDED.coming, \
        allergies = EXCLUDED.allergies, \
        transport_assist = EXCLUDED.transport_assist, \
        created_at = now() \
    RETURNING (xmax = 0) AS inserted";

/// Diesel-backed implementation of the [`RsvpStore`] port.
#[derive(Clone)]
pub struct DieselRsvpStore {
    pool: DbPool,
}

impl DieselRsvpStore {
    /// Create a store over the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map Diesel errors to store errors, keeping uniqueness violations
/// distinct so callers can surface them as conflicts.
fn map_diesel_error(error: diesel::result::Error) -> RsvpStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            RsvpStoreError::duplicate(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            debug!(message = info.message(), "database connection closed");
            RsvpStoreError::connection("database connection error")
        }
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
            RsvpStoreError::query("database error")
        }
        other => {
            debug!(error = %other, "diesel operation failed");
            RsvpStoreError::query("database error")
        }
    }
}

fn map_transaction_error(error: TransactionError) -> RsvpStoreError {
    match error {
        TransactionError::Pool(err) => RsvpStoreError::connection(err.to_string()),
        TransactionError::Query(err) => map_diesel_error(err),
    }
}

#[async_trait]
impl RsvpStore for DieselRsvpStore {
    async fn submit(
        &self,
        submission: &RsvpSubmission,
    ) -> Result<SubmissionOutcome, RsvpStoreError> {
        let result: UpsertResultRow = self
            .pool
            .with_transaction(|conn| {
                async move {
                    diesel::sql_query(UPSERT_SQL)
                        .bind::<Text, _>(submission.name().as_ref())
                        .bind::<Text, _>(submission.email().as_ref())
                        .bind::<Bool, _>(submission.coming())
                        .bind::<Nullable<Text>, _>(
                            submission.allergies().map(AsRef::as_ref),
                        )
                        .bind::<Bool, _>(submission.transport_assist())
                        .get_result(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_transaction_error)?;

        Ok(if result.inserted {
            SubmissionOutcome::Created
        } else {
            SubmissionOutcome::Replaced
        })
    }

    async fn list_all(&self) -> Result<Vec<Rsvp>, RsvpStoreError> {
        let rows: Vec<RsvpRow> = self
            .pool
            .with_transaction(|conn| {
                async move {
                    rsvps::table
                        .select(RsvpRow::as_select())
                        .order(rsvps::created_at.desc())
                        .then_order_by(rsvps::id.desc())
                        .load(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_transaction_error)?;

        rows.into_iter()
            .map(|row| {
                let id = row.id;
                Rsvp::try_from(row).map_err(|err| {
                    warn!(id, error = %err, "stored rsvp fails domain validation");
                    RsvpStoreError::query("stored record failed validation")
                })
            })
            .collect()
    }
}

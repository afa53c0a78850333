//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist to satisfy Diesel's type
//! requirements and to localise the NULL-to-default mapping for rows written
//! by historical schema revisions.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::rsvp::{
    Allergies, EmailAddress, GuestName, Rsvp, RsvpValidationError, DEFAULT_COMING,
    DEFAULT_TRANSPORT_ASSIST,
};

use super::schema::rsvps;

/// Row struct for reading from the rsvps table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rsvps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RsvpRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub coming: Option<bool>,
    pub allergies: Option<String>,
    pub transport_assist: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RsvpRow> for Rsvp {
    type Error = RsvpValidationError;

    fn try_from(row: RsvpRow) -> Result<Self, Self::Error> {
        let allergies = row.allergies.map(Allergies::new).transpose()?;
        Ok(Self {
            id: row.id,
            name: GuestName::new(row.name)?,
            email: EmailAddress::new(row.email)?,
            coming: row.coming.unwrap_or(DEFAULT_COMING),
            allergies,
            transport_assist: row.transport_assist.unwrap_or(DEFAULT_TRANSPORT_ASSIST),
            // Rows predating the created_at default can only carry NULL;
            // surface them as the epoch so the field stays total.
            created_at: row.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        })
    }
}

/// Result row of the atomic upsert: `inserted` is true when the statement
/// took the insert branch (`xmax = 0`), false on the conflict branch.
#[derive(Debug, QueryableByName)]
pub(crate) struct UpsertResultRow {
    #[diesel(sql_type = diesel::sql_types::Bool)]
    pub inserted: bool,
}

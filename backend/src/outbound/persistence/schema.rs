//! Diesel table definition for the PostgreSQL schema.
//!
//! Must match the shape the reconciler converges on. Columns declared with
//! defaults but without NOT NULL in the DDL are `Nullable` here; the row
//! mapping applies the documented defaults when a legacy row carries NULL.

diesel::table! {
    /// RSVP submissions, unique per `(name, email)`.
    rsvps (id) {
        /// Primary key, assigned by the `SERIAL` sequence.
        id -> Int4,
        /// Guest name (max 255 characters). Part of the natural key.
        name -> Varchar,
        /// Guest email (max 255 characters). Part of the natural key.
        email -> Varchar,
        /// Whether the guest is coming; DDL default true.
        coming -> Nullable<Bool>,
        /// Free-text allergies note (max 500 characters).
        allergies -> Nullable<Varchar>,
        /// Whether the guest needs transport help; DDL default false.
        transport_assist -> Nullable<Bool>,
        /// Timestamp of the latest submission; DDL default `now()`.
        created_at -> Nullable<Timestamptz>,
    }
}

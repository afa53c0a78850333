//! PostgreSQL persistence adapters.
//!
//! The request path runs through Diesel with async support (`diesel-async`
//! over a `bb8` pool); startup schema reconciliation uses a dedicated
//! synchronous `postgres` connection because it happens once, before any
//! traffic, and wants plain DDL strings.
//!
//! Principles carried across the module:
//!
//! - Thin adapters: only translation between rows and domain types here.
//! - Internal models: Diesel row structs and the `table!` definition are
//!   implementation details, never exposed to the domain layer.
//! - Strongly typed errors: every failure maps onto the domain's store or
//!   reconcile error types before leaving the module.

mod connection;
mod diesel_rsvp_store;
mod models;
mod schema;
mod schema_reconciler;

pub use connection::{DbPool, PoolConfig, PoolError, TransactionError};
pub use diesel_rsvp_store::DieselRsvpStore;
pub use schema_reconciler::{
    DdlStep, ObservedSchema, ReconcileError, SchemaReconciler, UniqueConstraint,
};

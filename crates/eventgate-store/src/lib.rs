//! Eventgate Store — PostgreSQL implementations of the hot-store seams.

pub mod pg_event_store;
pub mod pg_idempotency_registry;
pub mod schema;

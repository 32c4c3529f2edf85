//! # Curator Database Crate
//!
//! Application-specific interface to the exhibit database: the four entity
//! tables (display items, media resources, collections and their join rows),
//! the generic get-or-create helpers, and the typed `Repository` the HTTP
//! layer and the XEAC client talk to.
//!
//! ## Architectural Principles
//!
//! - **One explicit handle:** `Database::connect` builds the pool and
//!   bootstraps the schema once at startup; the value is passed down rather
//!   than cached in process-wide state.
//! - **Backend-agnostic:** all queries run through sqlx's `Any` driver, so
//!   the same code serves Postgres in production and SQLite in tests.
//! - **Conflict-safe creation:** `ops::get_one_or_create` wraps the insert
//!   in a nested transaction scope and recovers from a lost creation race by
//!   re-reading the winner's row.
//!
//! ## Public API
//!
//! - `Database`: pool construction and schema bootstrap.
//! - `Repository`: the high-level data access methods.
//! - `ops`: the generic `get_one` / `create` / `get_one_or_create` helpers.
//! - `models`: the entity types and their JSON projections.
//! - `DbError`: the specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod models;
pub mod ops;
pub mod repository;

pub use connection::{Backend, Database};
pub use error::DbError;
pub use models::{
    Collection, DisplayItem, ItemCollection, MediaResource, NewDisplayItem, NewMediaResource,
};
pub use ops::{OnMultiple, Value};
pub use repository::Repository;

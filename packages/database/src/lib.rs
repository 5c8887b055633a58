#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report store: connection, migrations, and geospatial queries.
//!
//! Two backends share one [`db::ReportStore`] API:
//!
//! - **`PostGIS`** for deployments. Reports live in a `geography(Point)`
//!   column with a `GIST` index and proximity queries use `ST_DWithin`.
//!   The schema is managed by embedded `switchy_schema` migrations.
//! - **`SQLite`** for local development and tests. Points are indexed in
//!   an R-tree virtual table; the R-tree narrows candidates to a bounding
//!   box and the exact great-circle check happens in Rust.

pub mod db;
pub mod postgis;
mod rows;
pub mod spatial;
pub mod sqlite;

use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

pub use db::{Backend, ReportStore, connect, connect_from_env, open_sqlite};

/// Embedded SQL migrations for the `PostGIS` backend.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Failed to open a connection.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Unsupported or malformed connection URL.
    #[error("Invalid database URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending `PostGIS` migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

//! Store connection and the backend-agnostic [`ReportStore`] handle.

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use crime_report_models::{GeoPoint, NewReport, Report, ReportStatus};
use switchy_database::Database;
use switchy_database_connection::{Credentials, init_sqlite_rusqlite};
use uuid::Uuid;

use crate::{DbError, postgis, run_migrations, sqlite};

/// Fallback when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/reports.db";

/// Which database engine backs a [`ReportStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `PostgreSQL` with the `PostGIS` extension.
    Postgis,
    /// `SQLite` with the R-tree module.
    Sqlite,
}

/// Handle to the report store.
///
/// Constructed once at startup and shared by all request handlers.
pub struct ReportStore {
    db: Box<dyn Database>,
    backend: Backend,
}

impl ReportStore {
    /// Wraps an already-initialized database. The schema must exist.
    #[must_use]
    pub fn new(db: Box<dyn Database>, backend: Backend) -> Self {
        Self { db, backend }
    }

    /// The engine backing this store.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// The underlying database connection.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.db.as_ref()
    }

    /// Persists a new report with `status = pending` and `created_at = now`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_report(&self, new_report: NewReport) -> Result<Report, DbError> {
        // Both backends store microsecond precision; truncate up front so the
        // returned record matches what a later read produces.
        let report = Report {
            id: Uuid::new_v4().to_string(),
            report_type: new_report.report_type,
            description: new_report.description,
            location: new_report.location,
            image_url: new_report.image_url,
            image_analysis: new_report.image_analysis.filter(|a| !a.is_empty()),
            status: ReportStatus::Pending,
            created_at: Utc::now().trunc_subsecs(6),
        };

        match self.backend {
            Backend::Postgis => postgis::insert_report(self.database(), &report).await?,
            Backend::Sqlite => sqlite::insert_report(self.database(), &report).await?,
        }

        log::debug!(
            "Stored report {} ({}) at [{}, {}]",
            report.id,
            report.report_type,
            report.location.longitude,
            report.location.latitude
        );

        Ok(report)
    }

    /// Returns every report, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a row cannot be decoded.
    pub async fn list_reports(&self) -> Result<Vec<Report>, DbError> {
        match self.backend {
            Backend::Postgis => postgis::list_reports(self.database()).await,
            Backend::Sqlite => sqlite::list_reports(self.database()).await,
        }
    }

    /// Looks up a report by id.
    ///
    /// Ids that are not valid UUIDs cannot exist in the store, so they
    /// resolve to `None` without a query.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the row cannot be decoded.
    pub async fn get_report(&self, id: &str) -> Result<Option<Report>, DbError> {
        let Ok(uuid) = Uuid::parse_str(id.trim()) else {
            log::debug!("Rejecting malformed report id: {id:?}");
            return Ok(None);
        };
        let id = uuid.to_string();

        match self.backend {
            Backend::Postgis => postgis::get_report(self.database(), &id).await,
            Backend::Sqlite => sqlite::get_report(self.database(), &id).await,
        }
    }

    /// Returns reports within `radius_meters` great-circle distance of
    /// `center`, nearest first.
    ///
    /// Non-finite input or a negative radius matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a row cannot be decoded.
    pub async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<Report>, DbError> {
        if !center.is_finite() || !radius_meters.is_finite() || radius_meters < 0.0 {
            log::warn!(
                "Nearby query with unusable parameters (center=[{}, {}], radius={radius_meters}); returning no reports",
                center.longitude,
                center.latitude
            );
            return Ok(Vec::new());
        }

        match self.backend {
            Backend::Postgis => postgis::find_nearby(self.database(), center, radius_meters).await,
            Backend::Sqlite => sqlite::find_nearby(self.database(), center, radius_meters).await,
        }
    }
}

/// Opens the store named by `url`.
///
/// `postgres://` and `postgresql://` URLs connect to `PostGIS` and run the
/// embedded migrations. `sqlite://<path>` opens (or creates) a `SQLite`
/// file and ensures its schema.
///
/// # Errors
///
/// Returns [`DbError`] if the URL scheme is unsupported, the connection
/// fails, or schema setup fails.
pub async fn connect(url: &str) -> Result<ReportStore, DbError> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return connect_postgis(url).await;
    }

    if let Some(path) = url.strip_prefix("sqlite://")
        && !path.is_empty()
    {
        return open_sqlite(Path::new(path)).await;
    }

    Err(DbError::InvalidUrl {
        url: url.to_string(),
    })
}

/// Opens the store named by the `DATABASE_URL` environment variable,
/// falling back to [`DEFAULT_DATABASE_URL`].
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema setup fails.
pub async fn connect_from_env() -> Result<ReportStore, DbError> {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    connect(&url).await
}

/// Opens (or creates) a `SQLite` report store at `path`.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be created or the schema DDL
/// fails.
pub async fn open_sqlite(path: &Path) -> Result<ReportStore, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| DbError::Connection {
            message: format!("Failed to create {}: {e}", parent.display()),
        })?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Connection {
        message: e.to_string(),
    })?;

    sqlite::ensure_schema(db.as_ref()).await?;

    log::info!("Opened SQLite report store at {}", path.display());

    Ok(ReportStore::new(db, Backend::Sqlite))
}

/// Connects to `PostGIS` and applies pending migrations.
///
/// Configures a 30-second `statement_timeout` so stalled queries fail
/// instead of holding a request open indefinitely.
async fn connect_postgis(url: &str) -> Result<ReportStore, DbError> {
    // The Credentials parser doesn't understand query parameters such as
    // ?sslmode=require; TLS is negotiated by the connector.
    let url_base = url.split('?').next().unwrap_or(url);

    let creds = Credentials::from_url(url_base).map_err(|e| DbError::Connection {
        message: e.to_string(),
    })?;
    let db = switchy_database_connection::init_postgres_raw_native_tls(creds)
        .await
        .map_err(|e| DbError::Connection {
            message: e.to_string(),
        })?;

    db.exec_raw("SET statement_timeout = '30s'").await?;

    run_migrations(db.as_ref()).await?;

    log::info!("Connected to PostGIS report store");

    Ok(ReportStore::new(db, Backend::Postgis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unknown_url_scheme() {
        let err = connect("mongodb://localhost:27017/reports")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::InvalidUrl { .. }));

        let err = connect("sqlite://").await.err().unwrap();
        assert!(matches!(err, DbError::InvalidUrl { .. }));
    }
}

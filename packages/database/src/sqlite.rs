//! `SQLite` report queries.
//!
//! Each report row gets a matching entry in the `reports_rtree` virtual
//! table keyed by the row's integer `seq`. Nearby queries use the R-tree
//! to fetch candidates inside [`search_bounds`], then keep only those
//! within the exact great-circle radius.

use std::cmp::Ordering;

use crime_report_models::{GeoPoint, Report};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;
use crate::rows::{
    analysis_values, format_timestamp, optional_string, parse_timestamp, report_from_row,
};
use crate::spatial::{distance_meters, search_bounds};

const SELECT_COLUMNS: &str = "SELECT r.id, r.report_type, r.description, r.image_url,
        r.analysis_report_type, r.analysis_description, r.analysis_confidence,
        r.status, r.created_at, r.longitude, r.latitude
     FROM reports r";

/// Creates the report tables and indexes if they don't already exist.
///
/// # Errors
///
/// Returns [`DbError`] if any DDL statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS reports (
            seq                  INTEGER PRIMARY KEY AUTOINCREMENT,
            id                   TEXT NOT NULL UNIQUE,
            report_type          TEXT NOT NULL CHECK (report_type IN
                ('theft', 'vandalism', 'accident', 'suspicious', 'other')),
            description          TEXT NOT NULL,
            longitude            REAL NOT NULL,
            latitude             REAL NOT NULL,
            image_url            TEXT,
            analysis_report_type TEXT,
            analysis_description TEXT,
            analysis_confidence  REAL,
            status               TEXT NOT NULL DEFAULT 'pending' CHECK (status IN
                ('pending', 'reviewed', 'resolved')),
            created_at           TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE VIRTUAL TABLE IF NOT EXISTS reports_rtree USING rtree(
            seq, min_lng, max_lng, min_lat, max_lat
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_reports_created_at
         ON reports (created_at DESC)",
    )
    .await?;

    Ok(())
}

/// Inserts a fully-formed report and its R-tree entry in one transaction.
///
/// # Errors
///
/// Returns [`DbError`] if either insert fails.
pub async fn insert_report(db: &dyn Database, report: &Report) -> Result<(), DbError> {
    let [analysis_type, analysis_description, analysis_confidence] =
        analysis_values(report.image_analysis.as_ref());

    let txn = db.begin_transaction().await?;

    txn.exec_raw_params(
        "INSERT INTO reports (
            id, report_type, description, longitude, latitude, image_url,
            analysis_report_type, analysis_description, analysis_confidence,
            status, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        &[
            DatabaseValue::String(report.id.clone()),
            DatabaseValue::String(report.report_type.to_string()),
            DatabaseValue::String(report.description.clone()),
            DatabaseValue::Real64(report.location.longitude),
            DatabaseValue::Real64(report.location.latitude),
            optional_string(report.image_url.as_ref()),
            analysis_type,
            analysis_description,
            analysis_confidence,
            DatabaseValue::String(report.status.to_string()),
            DatabaseValue::String(format_timestamp(&report.created_at)),
        ],
    )
    .await?;

    txn.exec_raw_params(
        "INSERT INTO reports_rtree (seq, min_lng, max_lng, min_lat, max_lat)
         SELECT seq, longitude, longitude, latitude, latitude
         FROM reports WHERE id = $1",
        &[DatabaseValue::String(report.id.clone())],
    )
    .await?;

    txn.commit().await?;

    Ok(())
}

/// Returns all reports, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn list_reports(db: &dyn Database) -> Result<Vec<Report>, DbError> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY r.created_at DESC, r.seq DESC");
    let rows = db.query_raw_params(&sql, &[]).await?;
    rows.iter().map(decode_row).collect()
}

/// Fetches a single report by its canonical id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_report(db: &dyn Database, id: &str) -> Result<Option<Report>, DbError> {
    let sql = format!("{SELECT_COLUMNS} WHERE r.id = $1");
    let rows = db
        .query_raw_params(&sql, &[DatabaseValue::String(id.to_string())])
        .await?;

    rows.first().map(decode_row).transpose()
}

/// Returns reports within `radius_meters` of `center`, nearest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn find_nearby(
    db: &dyn Database,
    center: GeoPoint,
    radius_meters: f64,
) -> Result<Vec<Report>, DbError> {
    let bounds = search_bounds(center, radius_meters);

    let sql = format!(
        "{SELECT_COLUMNS}
         JOIN reports_rtree t ON t.seq = r.seq
         WHERE t.max_lng >= $1 AND t.min_lng <= $2
           AND t.max_lat >= $3 AND t.min_lat <= $4"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[
                DatabaseValue::Real64(bounds.west),
                DatabaseValue::Real64(bounds.east),
                DatabaseValue::Real64(bounds.south),
                DatabaseValue::Real64(bounds.north),
            ],
        )
        .await?;

    let candidates = rows.len();

    let mut within: Vec<(f64, Report)> = rows
        .iter()
        .map(decode_row)
        .filter_map(|report| match report {
            Ok(report) => {
                let distance = distance_meters(center, report.location);
                (distance <= radius_meters).then_some(Ok((distance, report)))
            }
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<_, DbError>>()?;

    within.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    log::debug!(
        "Nearby query: {} of {candidates} R-tree candidates within {radius_meters} m",
        within.len()
    );

    Ok(within.into_iter().map(|(_, report)| report).collect())
}

fn decode_row(row: &Row) -> Result<Report, DbError> {
    let created_at: String = row.to_value("created_at").unwrap_or_default();
    report_from_row(row, parse_timestamp(&created_at)?)
}

//! `PostGIS` report queries.
//!
//! Locations are `geography(Point, 4326)` so `ST_DWithin` and
//! `ST_Distance` work in meters on the spheroid and use the `GIST` index.

use chrono::{DateTime, NaiveDateTime, Utc};
use crime_report_models::{GeoPoint, Report};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;
use crate::rows::{analysis_values, optional_string, report_from_row};

const SELECT_COLUMNS: &str = "SELECT id, report_type, description, image_url,
        analysis_report_type, analysis_description, analysis_confidence,
        status, created_at,
        ST_X(location::geometry) AS longitude,
        ST_Y(location::geometry) AS latitude
     FROM reports";

/// Inserts a fully-formed report.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn insert_report(db: &dyn Database, report: &Report) -> Result<(), DbError> {
    let [analysis_type, analysis_description, analysis_confidence] =
        analysis_values(report.image_analysis.as_ref());

    db.exec_raw_params(
        "INSERT INTO reports (
            id, report_type, description, location, image_url,
            analysis_report_type, analysis_description, analysis_confidence,
            status, created_at
        ) VALUES (
            $1, $2, $3,
            ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography,
            $6, $7, $8, $9, $10, $11
        )",
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
            DatabaseValue::DateTime(report.created_at.naive_utc()),
        ],
    )
    .await?;

    Ok(())
}

/// Returns all reports, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn list_reports(db: &dyn Database) -> Result<Vec<Report>, DbError> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, seq DESC");
    let rows = db.query_raw_params(&sql, &[]).await?;
    decode_rows(&rows)
}

/// Fetches a single report by its canonical id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_report(db: &dyn Database, id: &str) -> Result<Option<Report>, DbError> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
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
    let sql = format!(
        "{SELECT_COLUMNS}
         WHERE ST_DWithin(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)
         ORDER BY ST_Distance(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography) ASC"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[
                DatabaseValue::Real64(center.longitude),
                DatabaseValue::Real64(center.latitude),
                DatabaseValue::Real64(radius_meters),
            ],
        )
        .await?;

    decode_rows(&rows)
}

fn decode_rows(rows: &[Row]) -> Result<Vec<Report>, DbError> {
    rows.iter().map(decode_row).collect()
}

fn decode_row(row: &Row) -> Result<Report, DbError> {
    let created_at: NaiveDateTime = row.to_value("created_at").map_err(|e| DbError::Conversion {
        message: format!("Failed to read created_at: {e}"),
    })?;

    report_from_row(
        row,
        DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc),
    )
}

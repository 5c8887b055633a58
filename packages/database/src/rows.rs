//! Row decoding shared by both backends.

use chrono::{DateTime, SecondsFormat, Utc};
use crime_report_models::{GeoPoint, ImageAnalysis, Report, ReportStatus, ReportType};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{DatabaseValue, Row};

use crate::DbError;

/// Renders a timestamp the way the `SQLite` backend stores it.
///
/// Fixed-width RFC 3339 with microseconds, so lexical order matches
/// chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Conversion {
            message: format!("Invalid created_at {s:?}: {e}"),
        })
}

pub fn optional_string(value: Option<&String>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| DatabaseValue::String(s.clone()))
}

/// Flattens the optional analysis into its three nullable columns.
pub fn analysis_values(analysis: Option<&ImageAnalysis>) -> [DatabaseValue; 3] {
    let Some(analysis) = analysis else {
        return [DatabaseValue::Null, DatabaseValue::Null, DatabaseValue::Null];
    };

    [
        analysis
            .suggested_report_type
            .map_or(DatabaseValue::Null, |t| {
                DatabaseValue::String(t.to_string())
            }),
        optional_string(analysis.description.as_ref()),
        analysis
            .confidence
            .map_or(DatabaseValue::Null, DatabaseValue::Real64),
    ]
}

/// Decodes every column except `created_at`, whose storage type differs
/// between backends.
pub fn report_from_row(row: &Row, created_at: DateTime<Utc>) -> Result<Report, DbError> {
    let id: String = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to read report id: {e}"),
    })?;

    let report_type_name: String = row.to_value("report_type").unwrap_or_default();
    let report_type =
        report_type_name
            .parse::<ReportType>()
            .map_err(|_| DbError::Conversion {
                message: format!("Report {id} has unknown type {report_type_name:?}"),
            })?;

    let status_name: String = row.to_value("status").unwrap_or_default();
    let status = status_name
        .parse::<ReportStatus>()
        .map_err(|_| DbError::Conversion {
            message: format!("Report {id} has unknown status {status_name:?}"),
        })?;

    let longitude: f64 = row.to_value("longitude").map_err(|e| DbError::Conversion {
        message: format!("Report {id} has no longitude: {e}"),
    })?;
    let latitude: f64 = row.to_value("latitude").map_err(|e| DbError::Conversion {
        message: format!("Report {id} has no latitude: {e}"),
    })?;

    let analysis_type: Option<String> = row.to_value("analysis_report_type").unwrap_or(None);
    let analysis = ImageAnalysis {
        suggested_report_type: analysis_type.and_then(|t| t.parse().ok()),
        description: row.to_value("analysis_description").unwrap_or(None),
        confidence: row.to_value("analysis_confidence").unwrap_or(None),
    };

    Ok(Report {
        id,
        report_type,
        description: row.to_value("description").unwrap_or_default(),
        location: GeoPoint::new(longitude, latitude),
        image_url: row.to_value("image_url").unwrap_or(None),
        image_analysis: (!analysis.is_empty()).then_some(analysis),
        status,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 11, 2, 3, 4, 5).unwrap();
        let early_str = format_timestamp(&early);
        let late_str = format_timestamp(&late);

        assert_eq!(early_str, "2024-01-02T03:04:05.000000Z");
        assert!(early_str < late_str);
        assert_eq!(parse_timestamp(&late_str).unwrap(), late);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime report server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the report model so the wire contract (`_id`, `GeoJSON` points,
//! lenient query parsing) stays out of the store.

use chrono::{DateTime, Utc};
use crime_report_models::{
    GeoPoint, ImageAnalysis, NewReport, Report, ReportStatus, ReportType,
};
use serde::{Deserialize, Serialize};

/// Radius used by the nearby endpoint when none is given.
pub const DEFAULT_NEARBY_RADIUS_METERS: f64 = 5000.0;

/// A submission that can't be turned into a report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Message returned to the client.
    pub message: String,
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `POST /api/reports`.
///
/// Every field is optional at the serde level so that missing fields
/// produce a validation error instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub report_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<LocationInput>,
    pub image_url: Option<String>,
    pub image_analysis: Option<ImageAnalysisInput>,
}

/// Location as submitted by the client.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LocationInput {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

/// Client-supplied copy of an earlier triage result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisInput {
    pub suggested_report_type: Option<String>,
    pub description: Option<String>,
    pub confidence: Option<f64>,
}

impl CreateReportRequest {
    /// Validates the submission.
    ///
    /// `reportType`, `description`, and `location` are required; an empty
    /// string counts as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if a required field is missing, the
    /// report type is unknown, or the location has no numeric coordinates
    /// or coordinates outside the valid longitude/latitude ranges.
    pub fn into_new_report(self) -> Result<NewReport, ValidationError> {
        let (Some(report_type), Some(description), Some(location)) = (
            self.report_type.filter(|s| !s.is_empty()),
            self.description.filter(|s| !s.is_empty()),
            self.location,
        ) else {
            return Err(ValidationError::new("Missing required fields"));
        };

        let report_type = parse_report_type(&report_type)?;

        let (Some(longitude), Some(latitude)) = (location.longitude, location.latitude) else {
            return Err(ValidationError::new(
                "Location must include numeric longitude and latitude",
            ));
        };

        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::new(
                "Location must have longitude in [-180, 180] and latitude in [-90, 90]",
            ));
        }

        let image_analysis = self
            .image_analysis
            .map(|analysis| {
                Ok::<_, ValidationError>(ImageAnalysis {
                    suggested_report_type: analysis
                        .suggested_report_type
                        .filter(|s| !s.is_empty())
                        .map(|s| parse_report_type(&s))
                        .transpose()?,
                    description: analysis.description,
                    confidence: analysis.confidence,
                })
            })
            .transpose()?;

        Ok(NewReport {
            report_type,
            description,
            location: GeoPoint::new(longitude, latitude),
            image_url: self.image_url.filter(|s| !s.is_empty()),
            image_analysis,
        })
    }
}

fn parse_report_type(value: &str) -> Result<ReportType, ValidationError> {
    value.parse().map_err(|_| {
        let valid = ReportType::all()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        ValidationError::new(format!("Invalid report type '{value}'. Expected one of: {valid}"))
    })
}

/// `GeoJSON` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApiLocation {
    /// Always `"Point"`.
    #[serde(rename = "type")]
    pub kind: ApiGeometryType,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

/// `GeoJSON` geometry type. Reports only ever carry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiGeometryType {
    Point,
}

impl From<GeoPoint> for ApiLocation {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: ApiGeometryType::Point,
            coordinates: point.coordinates(),
        }
    }
}

/// A report as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    /// Report id. Named `_id` for existing clients.
    #[serde(rename = "_id")]
    pub id: String,
    pub report_type: ReportType,
    pub description: String,
    pub location: ApiLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_analysis: Option<ImageAnalysis>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ApiReport {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            report_type: report.report_type,
            description: report.description,
            location: report.location.into(),
            image_url: report.image_url,
            image_analysis: report.image_analysis,
            status: report.status,
            created_at: report.created_at,
        }
    }
}

/// Query parameters for the nearby endpoint.
///
/// Kept as raw strings and parsed leniently: coordinates accept a numeric
/// prefix (`"51.5abc"` is `51.5`) and the radius an integer prefix
/// (`"250m"` is `250`). Anything unparseable becomes `NaN`, which the
/// store treats as matching nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyQueryParams {
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub radius: Option<String>,
}

impl NearbyQueryParams {
    /// The search center.
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            self.longitude.as_deref().map_or(f64::NAN, parse_float_prefix),
            self.latitude.as_deref().map_or(f64::NAN, parse_float_prefix),
        )
    }

    /// The search radius in meters, [`DEFAULT_NEARBY_RADIUS_METERS`] if
    /// absent.
    #[must_use]
    pub fn radius_meters(&self) -> f64 {
        self.radius
            .as_deref()
            .map_or(DEFAULT_NEARBY_RADIUS_METERS, parse_int_prefix)
    }
}

/// Parses the longest leading decimal number, ignoring leading whitespace.
#[must_use]
pub fn parse_float_prefix(value: &str) -> f64 {
    let value = value.trim_start();
    let bytes = value.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &value[digits_start..end] == "." {
        return f64::NAN;
    }

    // Optional exponent, only if it has digits
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    value[..end].parse().unwrap_or(f64::NAN)
}

/// Parses the leading base-10 integer, ignoring leading whitespace.
#[must_use]
pub fn parse_int_prefix(value: &str) -> f64 {
    let value = value.trim_start();
    let bytes = value.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return f64::NAN;
    }

    value[..end].parse().unwrap_or(f64::NAN)
}

/// Triage result returned by `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImageTriage {
    pub suggested_report_type: ReportType,
    pub description: String,
    pub confidence: f64,
    /// The uploaded image as a `data:` URL.
    pub image_url: String,
    pub model_used: String,
}

/// Response body of `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub analysis: ApiImageTriage,
}

/// Body of `POST /api/safety-tips/ai`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyTipRequest {
    pub message: Option<String>,
}

/// Response of `POST /api/safety-tips/ai`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyTipResponse {
    /// The model's advice, verbatim.
    pub response: String,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    /// Upstream error message, only set for AI failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiErrorBody {
    /// Creates an error body without details.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Deployment environment (`APP_ENV`).
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreateReportRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn valid_request_becomes_new_report() {
        let report = request(
            r#"{"reportType":"Theft","description":"bike stolen","location":{"longitude":-0.09,"latitude":51.505}}"#,
        )
        .into_new_report()
        .unwrap();

        assert_eq!(report.report_type, ReportType::Theft);
        assert_eq!(report.description, "bike stolen");
        assert_eq!(report.location.coordinates(), [-0.09, 51.505]);
        assert!(report.image_url.is_none());
        assert!(report.image_analysis.is_none());
    }

    #[test]
    fn missing_or_empty_required_fields_are_rejected() {
        for json in [
            r#"{"description":"x","location":{"longitude":1,"latitude":2}}"#,
            r#"{"reportType":"theft","location":{"longitude":1,"latitude":2}}"#,
            r#"{"reportType":"theft","description":"x"}"#,
            r#"{"reportType":"","description":"x","location":{"longitude":1,"latitude":2}}"#,
            r#"{"reportType":"theft","description":"","location":{"longitude":1,"latitude":2}}"#,
        ] {
            let err = request(json).into_new_report().unwrap_err();
            assert_eq!(err.message, "Missing required fields", "{json}");
        }
    }

    #[test]
    fn invalid_type_or_location_is_rejected() {
        let err = request(
            r#"{"reportType":"burglary","description":"x","location":{"longitude":1,"latitude":2}}"#,
        )
        .into_new_report()
        .unwrap_err();
        assert!(err.message.contains("burglary"));

        let err = request(r#"{"reportType":"theft","description":"x","location":{}}"#)
            .into_new_report()
            .unwrap_err();
        assert!(err.message.contains("longitude"));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        for location in [
            r#"{"longitude":500.0,"latitude":1000.0}"#,
            r#"{"longitude":-180.5,"latitude":0.0}"#,
            r#"{"longitude":0.0,"latitude":90.01}"#,
        ] {
            let err = request(&format!(
                r#"{{"reportType":"theft","description":"x","location":{location}}}"#
            ))
            .into_new_report()
            .unwrap_err();
            assert!(err.message.contains("latitude in [-90, 90]"), "{location}");
        }

        let edge = request(
            r#"{"reportType":"theft","description":"x","location":{"longitude":-180.0,"latitude":90.0}}"#,
        )
        .into_new_report()
        .unwrap();
        assert_eq!(edge.location, GeoPoint::new(-180.0, 90.0));
    }

    #[test]
    fn image_analysis_is_carried_over() {
        let report = request(
            r#"{"reportType":"vandalism","description":"graffiti","location":{"longitude":1,"latitude":2},
                "imageUrl":"data:image/png;base64,AA==",
                "imageAnalysis":{"suggestedReportType":"vandalism","confidence":0.8}}"#,
        )
        .into_new_report()
        .unwrap();

        assert_eq!(report.image_url.as_deref(), Some("data:image/png;base64,AA=="));
        let analysis = report.image_analysis.unwrap();
        assert_eq!(analysis.suggested_report_type, Some(ReportType::Vandalism));
        assert_eq!(analysis.confidence, Some(0.8));
        assert!(analysis.description.is_none());
    }

    #[test]
    fn api_report_uses_underscore_id_and_geojson() {
        let report = Report {
            id: "4a8f3c1e-1d2b-4c3d-9e8f-0a1b2c3d4e5f".to_string(),
            report_type: ReportType::Accident,
            description: "fender bender".to_string(),
            location: GeoPoint::new(-0.09, 51.505),
            image_url: None,
            image_analysis: None,
            status: ReportStatus::Pending,
            created_at: DateTime::parse_from_rfc3339("2026-10-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let json = serde_json::to_value(ApiReport::from(report)).unwrap();

        assert_eq!(json["_id"], "4a8f3c1e-1d2b-4c3d-9e8f-0a1b2c3d4e5f");
        assert_eq!(json["reportType"], "accident");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["location"]["type"], "Point");
        assert_eq!(json["location"]["coordinates"][0], -0.09);
        assert_eq!(json["location"]["coordinates"][1], 51.505);
        assert!(json.get("imageUrl").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn float_prefix_parsing() {
        assert!((parse_float_prefix("51.505") - 51.505).abs() < f64::EPSILON);
        assert!((parse_float_prefix(" -0.09xyz") + 0.09).abs() < f64::EPSILON);
        assert!((parse_float_prefix("1e3m") - 1000.0).abs() < f64::EPSILON);
        assert!((parse_float_prefix("2e") - 2.0).abs() < f64::EPSILON);
        assert!((parse_float_prefix(".5") - 0.5).abs() < f64::EPSILON);
        assert!(parse_float_prefix("abc").is_nan());
        assert!(parse_float_prefix("").is_nan());
        assert!(parse_float_prefix("-").is_nan());
        assert!(parse_float_prefix(".").is_nan());
    }

    #[test]
    fn int_prefix_parsing() {
        assert!((parse_int_prefix("250m") - 250.0).abs() < f64::EPSILON);
        assert!((parse_int_prefix("1500.9") - 1500.0).abs() < f64::EPSILON);
        assert!(parse_int_prefix("far").is_nan());
        assert!(parse_int_prefix("").is_nan());
    }

    #[test]
    fn nearby_params_default_radius() {
        let params = NearbyQueryParams {
            longitude: Some("-0.09".to_string()),
            latitude: Some("51.505".to_string()),
            radius: None,
        };

        assert_eq!(params.center().coordinates(), [-0.09, 51.505]);
        assert!((params.radius_meters() - DEFAULT_NEARBY_RADIUS_METERS).abs() < f64::EPSILON);

        let params = NearbyQueryParams::default();
        assert!(!params.center().is_finite());
    }
}

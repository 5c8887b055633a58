#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident report data model shared by the store, the AI adapters, and
//! the HTTP server.
//!
//! A [`Report`] is the only persisted entity. Reports are created once
//! and never updated or deleted, so every field here is effectively
//! immutable after [`Report::created_at`] is assigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The kind of incident being reported.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportType {
    /// Stolen property.
    Theft,
    /// Damage to property.
    Vandalism,
    /// Traffic or other accidents.
    Accident,
    /// Suspicious activity.
    Suspicious,
    /// Anything that doesn't fit the other types.
    Other,
}

impl ReportType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Theft,
            Self::Vandalism,
            Self::Accident,
            Self::Suspicious,
            Self::Other,
        ]
    }
}

/// Review status of a report.
///
/// Only [`ReportStatus::Pending`] is ever assigned; nothing transitions a
/// report to the other states yet.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportStatus {
    /// Newly submitted, not yet looked at.
    #[default]
    Pending,
    /// Looked at by a reviewer.
    Reviewed,
    /// Closed out.
    Resolved,
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether both coordinates are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }

    /// Returns the coordinates in GeoJSON order (`[longitude, latitude]`).
    #[must_use]
    pub const fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// AI-generated triage of a report's photo, as attached by the client.
///
/// Every member is optional because clients may submit a partial
/// analysis (or edit it) before creating the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    /// Report type suggested by the model.
    pub suggested_report_type: Option<ReportType>,
    /// Model description of the image.
    pub description: Option<String>,
    /// Confidence score in `[0, 1]`.
    pub confidence: Option<f64>,
}

impl ImageAnalysis {
    /// Whether no member is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.suggested_report_type.is_none()
            && self.description.is_none()
            && self.confidence.is_none()
    }
}

/// A validated report submission, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    /// Incident type.
    pub report_type: ReportType,
    /// Free-text description.
    pub description: String,
    /// Where the incident happened.
    pub location: GeoPoint,
    /// Optional photo (data URL or external URL).
    pub image_url: Option<String>,
    /// Optional AI triage of the photo.
    pub image_analysis: Option<ImageAnalysis>,
}

/// A persisted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Store-assigned identifier (UUID v4).
    pub id: String,
    /// Incident type.
    pub report_type: ReportType,
    /// Free-text description.
    pub description: String,
    /// Where the incident happened.
    pub location: GeoPoint,
    /// Optional photo.
    pub image_url: Option<String>,
    /// Optional AI triage of the photo.
    pub image_analysis: Option<ImageAnalysis>,
    /// Review status.
    pub status: ReportStatus,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_type_parses_case_insensitively() {
        assert_eq!("theft".parse::<ReportType>().unwrap(), ReportType::Theft);
        assert_eq!("Theft".parse::<ReportType>().unwrap(), ReportType::Theft);
        assert_eq!(
            "SUSPICIOUS".parse::<ReportType>().unwrap(),
            ReportType::Suspicious
        );
        assert!("burglary".parse::<ReportType>().is_err());
        assert!("".parse::<ReportType>().is_err());
    }

    #[test]
    fn report_type_display_matches_wire_form() {
        for report_type in ReportType::all() {
            let json = serde_json::to_string(report_type).unwrap();
            assert_eq!(json, format!("\"{report_type}\""));
            assert_eq!(report_type.as_ref(), report_type.to_string());
        }
    }

    #[test]
    fn status_defaults_to_pending() {
        assert_eq!(ReportStatus::default(), ReportStatus::Pending);
        assert_eq!(ReportStatus::Pending.to_string(), "pending");
        assert_eq!(
            "resolved".parse::<ReportStatus>().unwrap(),
            ReportStatus::Resolved
        );
    }

    #[test]
    fn geo_point_coordinates_are_longitude_first() {
        let point = GeoPoint::new(-0.09, 51.505);
        assert_eq!(point.coordinates(), [-0.09, 51.505]);
        assert!(point.is_finite());
        assert!(!GeoPoint::new(f64::NAN, 51.505).is_finite());
    }

    #[test]
    fn image_analysis_accepts_partial_json() {
        let analysis: ImageAnalysis =
            serde_json::from_str(r#"{"suggestedReportType":"vandalism"}"#).unwrap();
        assert_eq!(analysis.suggested_report_type, Some(ReportType::Vandalism));
        assert!(analysis.description.is_none());
        assert!(!analysis.is_empty());
        assert!(ImageAnalysis::default().is_empty());
    }
}

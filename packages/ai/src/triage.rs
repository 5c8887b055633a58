//! Photo triage.
//!
//! Sends an uploaded image to the model with a fixed instruction asking for
//! a description and one of the five report types, then pulls both back out
//! of the free-text reply. Parsing is best-effort: the model's formatting
//! drifts, so anything unrecognizable falls back to [`ReportType::Other`].

use crime_report_models::{ImageAnalysis, ReportType};
use regex::Regex;
use serde::Serialize;

use crate::AiError;
use crate::providers::{LlmProvider, Part, encode_base64};

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Confidence reported for every triage result. The model gives no score.
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.8;

/// Instruction sent alongside the image.
pub const TRIAGE_PROMPT: &str = "Analyze this image and provide a detailed description of what you see. Also, determine the most appropriate report type from these options: 'theft', 'vandalism', 'accident', 'suspicious', or 'other'. Format your response as follows:\n\nDescription: [detailed description]\nReport Type: [one of the specified types]";

/// Result of triaging one photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTriage {
    pub suggested_report_type: ReportType,
    pub description: String,
    pub confidence: f64,
    /// The image itself as a `data:` URL, stored on the report as-is.
    pub image_url: String,
    pub model_used: String,
}

impl ImageTriage {
    /// The subset of the triage result that is attached to a report.
    #[must_use]
    pub fn to_analysis(&self) -> ImageAnalysis {
        ImageAnalysis {
            suggested_report_type: Some(self.suggested_report_type),
            description: Some(self.description.clone()),
            confidence: Some(self.confidence),
        }
    }
}

/// Report type and description extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnalysis {
    pub report_type: ReportType,
    pub description: String,
    /// Whether `report_type` came from the reply rather than the fallback.
    pub type_recognized: bool,
}

/// Checks an upload before anything is sent upstream.
///
/// # Errors
///
/// * [`AiError::InvalidInput`] if the payload is empty, larger than
///   [`MAX_IMAGE_BYTES`], or its MIME type is not `image/*`
pub fn validate_image(data: &[u8], mime_type: &str) -> Result<(), AiError> {
    if !mime_type.to_ascii_lowercase().starts_with("image/") {
        return Err(AiError::InvalidInput {
            message: "Only image files are allowed".to_string(),
        });
    }

    if data.is_empty() {
        return Err(AiError::InvalidInput {
            message: "No image file provided".to_string(),
        });
    }

    if data.len() > MAX_IMAGE_BYTES {
        return Err(AiError::InvalidInput {
            message: format!(
                "Image is too large ({} bytes, limit is {MAX_IMAGE_BYTES})",
                data.len()
            ),
        });
    }

    Ok(())
}

/// Builds the `data:` URL the frontend displays and stores.
#[must_use]
pub fn data_url(data: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", encode_base64(data))
}

/// Triage a photo with the given provider.
///
/// # Errors
///
/// * [`AiError::InvalidInput`] if the image fails [`validate_image`]
/// * Any provider error if the upstream call fails
pub async fn analyze_image(
    provider: &dyn LlmProvider,
    data: &[u8],
    mime_type: &str,
) -> Result<ImageTriage, AiError> {
    validate_image(data, mime_type)?;

    log::debug!(
        "Triaging {} byte {mime_type} image with model {}",
        data.len(),
        provider.model()
    );

    let reply = provider
        .generate(&[Part::image(mime_type, data), Part::text(TRIAGE_PROMPT)])
        .await?;

    let parsed = parse_analysis(&reply);

    Ok(ImageTriage {
        suggested_report_type: parsed.report_type,
        description: parsed.description,
        confidence: PLACEHOLDER_CONFIDENCE,
        image_url: data_url(data, mime_type),
        model_used: provider.model().to_string(),
    })
}

/// Extracts the description and report type from a model reply.
///
/// Labels are matched case-insensitively and may be wrapped in markdown
/// emphasis (`**Report Type:**`). The description runs from its label up
/// to the report type label or the end of the reply. Without a usable
/// description section the whole reply is returned as-is.
#[must_use]
pub fn parse_analysis(reply: &str) -> ParsedAnalysis {
    let description_re = Regex::new(
        r"(?is)[*_]*description[*_]*\s*:[*_]*(.*?)(?:[*_]*report\s+type[*_]*\s*:|\z)",
    )
    .unwrap_or_else(|_| unreachable!());
    let type_re = Regex::new(r#"(?i)report\s+type[*_]*\s*:[*_\s'"`]*(\w+)"#)
        .unwrap_or_else(|_| unreachable!());

    let description = description_re
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|d| !d.is_empty())
        .unwrap_or(reply)
        .to_string();

    let parsed_type = type_re
        .captures(reply)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<ReportType>().ok());

    let type_recognized = parsed_type.is_some();
    let report_type = parsed_type.unwrap_or_else(|| {
        log::warn!("Could not find a valid report type in model reply, using 'other': {reply:?}");
        ReportType::Other
    });

    ParsedAnalysis {
        report_type,
        description,
        type_recognized,
    }
}

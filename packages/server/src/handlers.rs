//! HTTP handler functions for the crime report API.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use crime_report_ai::providers::LlmProvider;
use crime_report_ai::{advice, triage};
use crime_report_server_models::{
    ApiErrorBody, ApiHealth, ApiImageTriage, ApiReport, CreateReportRequest, NearbyQueryParams,
    SafetyTipRequest, SafetyTipResponse, UploadResponse,
};
use futures::StreamExt as _;

use crate::AppState;
use crate::error::ApiError;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.clone(),
    })
}

/// `POST /api/reports`
///
/// Validates and stores a new report, answering `201` with the stored
/// record.
pub async fn create_report(
    state: web::Data<AppState>,
    body: web::Json<CreateReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let new_report = body.into_inner().into_new_report()?;

    let report = state
        .store
        .insert_report(new_report)
        .await
        .map_err(|e| ApiError::store("Error creating report", e))?;

    log::info!("Created {} report {}", report.report_type, report.id);

    Ok(HttpResponse::Created().json(ApiReport::from(report)))
}

/// `GET /api/reports`
///
/// Returns every report, newest first.
pub async fn list_reports(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let reports = state
        .store
        .list_reports()
        .await
        .map_err(|e| ApiError::store("Error fetching reports", e))?;

    let api_reports: Vec<ApiReport> = reports.into_iter().map(ApiReport::from).collect();
    Ok(HttpResponse::Ok().json(api_reports))
}

/// `GET /api/reports/{id}`
pub async fn get_report(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let report = state
        .store
        .get_report(&id)
        .await
        .map_err(|e| ApiError::store("Error fetching report", e))?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiReport::from(report)))
}

/// `GET /api/reports/nearby?longitude=&latitude=&radius=`
///
/// Returns reports within `radius` meters (default 5000), nearest first.
/// Unparseable parameters yield an empty list rather than an error.
pub async fn nearby_reports(
    state: web::Data<AppState>,
    params: web::Query<NearbyQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let center = params.center();
    let radius = params.radius_meters();

    let reports = state
        .store
        .find_nearby(center, radius)
        .await
        .map_err(|e| ApiError::store("Error fetching nearby reports", e))?;

    let api_reports: Vec<ApiReport> = reports.into_iter().map(ApiReport::from).collect();
    Ok(HttpResponse::Ok().json(api_reports))
}

/// `POST /api/upload`
///
/// Accepts a multipart `image` field and returns the model's triage of it.
pub async fn upload_image(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (mime_type, data) = read_image_field(payload)
        .await?
        .ok_or_else(|| ApiError::Validation("No image file provided".to_string()))?;

    let provider = ai_provider(&state, "Failed to analyze image")?;

    log::info!("Using model: {}", provider.model());

    let result = triage::analyze_image(provider.as_ref(), &data, &mime_type)
        .await
        .map_err(|e| ApiError::ai("Failed to analyze image", e))?;

    Ok(HttpResponse::Ok().json(UploadResponse {
        analysis: ApiImageTriage {
            suggested_report_type: result.suggested_report_type,
            description: result.description,
            confidence: result.confidence,
            image_url: result.image_url,
            model_used: result.model_used,
        },
    }))
}

/// `POST /api/safety-tips/ai`
///
/// A blank message is rejected before the provider lookup, so it is a
/// `400` even when no AI provider is configured.
pub async fn safety_tip(
    state: web::Data<AppState>,
    body: web::Json<SafetyTipRequest>,
) -> Result<HttpResponse, ApiError> {
    let message = body.into_inner().message.unwrap_or_default();
    advice::validate_message(&message)
        .map_err(|e| ApiError::ai("Failed to get safety tip", e))?;

    let provider = ai_provider(&state, "Failed to get safety tip")?;

    let response = advice::get_safety_tip(provider.as_ref(), &message)
        .await
        .map_err(|e| ApiError::ai("Failed to get safety tip", e))?;

    Ok(HttpResponse::Ok().json(SafetyTipResponse { response }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiErrorBody::new("Not found"))
}

fn ai_provider(state: &AppState, message: &str) -> Result<Arc<dyn LlmProvider>, ApiError> {
    state.ai.clone().ok_or_else(|| ApiError::Upstream {
        message: message.to_string(),
        details: "AI provider is not configured".to_string(),
    })
}

/// Reads the first `image` field of a multipart body.
///
/// Other fields are skipped. The MIME type is checked before the body is
/// read, and reading stops as soon as the size limit is passed.
async fn read_image_field(mut payload: Multipart) -> Result<Option<(String, Vec<u8>)>, ApiError> {
    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?;

        if field.name() != Some("image") {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?;
            }
            continue;
        }

        let mime_type = field
            .content_type()
            .map(ToString::to_string)
            .unwrap_or_default();
        if !mime_type.to_ascii_lowercase().starts_with("image/") {
            return Err(ApiError::Validation(
                "Only image files are allowed".to_string(),
            ));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?;
            if data.len() + chunk.len() > triage::MAX_IMAGE_BYTES {
                return Err(ApiError::Validation(format!(
                    "Image exceeds the {} MB limit",
                    triage::MAX_IMAGE_BYTES / (1024 * 1024)
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Ok(None);
        }

        return Ok(Some((mime_type, data)));
    }

    Ok(None)
}

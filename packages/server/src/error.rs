//! HTTP error mapping.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{HttpRequest, HttpResponse, ResponseError, error::JsonPayloadError};
use crime_report_ai::AiError;
use crime_report_database::DbError;
use crime_report_server_models::{ApiErrorBody, ValidationError};

/// Body sent for any 500 that doesn't already carry a JSON error.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was malformed or incomplete.
    #[error("{0}")]
    Validation(String),

    /// The requested resource doesn't exist.
    #[error("{0}")]
    NotFound(String),

    /// The AI provider failed or isn't configured.
    #[error("{message}: {details}")]
    Upstream {
        /// Client-facing summary, e.g. `Failed to analyze image`.
        message: String,
        /// The provider's error message.
        details: String,
    },

    /// The report store failed. Details are logged, never returned.
    #[error("{message}")]
    Store {
        /// Client-facing summary, e.g. `Error creating report`.
        message: String,
        #[source]
        source: DbError,
    },

    /// The client exceeded its request budget.
    #[error("Too many requests, please try again later.")]
    RateLimited {
        /// Seconds until the client may retry.
        retry_after_seconds: u64,
    },
}

impl ApiError {
    /// Wraps a store failure, logging the underlying error.
    pub fn store(message: &str, source: DbError) -> Self {
        log::error!("{message}: {source}");
        Self::Store {
            message: message.to_string(),
            source,
        }
    }

    /// Maps an AI adapter failure. Input problems become validation errors,
    /// everything else is an upstream failure summarized as `message`.
    pub fn ai(message: &str, err: AiError) -> Self {
        if err.is_invalid_input() {
            return Self::Validation(err.to_string());
        }

        log::error!("{message}: {err}");
        Self::Upstream {
            message: message.to_string(),
            details: err.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } | Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        let body = match self {
            Self::Validation(message) | Self::NotFound(message) | Self::Store { message, .. } => {
                ApiErrorBody::new(message.clone())
            }
            Self::Upstream { message, details } => ApiErrorBody {
                error: message.clone(),
                details: Some(details.clone()),
            },
            Self::RateLimited {
                retry_after_seconds,
            } => {
                builder.insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()));
                ApiErrorBody::new(self.to_string())
            }
        };

        builder.json(body)
    }
}

/// Turns JSON body extraction failures into `400 {error}` responses.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = ApiErrorBody::new(format!("Invalid JSON body: {err}"));
    actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body))
        .into()
}

/// Replaces any 500 response that isn't already a JSON error with the
/// generic error body.
pub fn error_handlers<B: MessageBody + 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, generic_internal_error)
}

fn generic_internal_error<B: MessageBody>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let (req, res) = res.into_parts();
    if let Some(err) = res.error() {
        log::error!("Unhandled error on {} {}: {err}", req.method(), req.path());
    }

    let response: HttpResponse<BoxBody> = HttpResponse::InternalServerError()
        .json(ApiErrorBody::new(GENERIC_ERROR_MESSAGE));

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body::<B>(),
    ))
}

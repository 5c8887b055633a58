#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generative-AI adapters for the crime report backend.
//!
//! The external model is treated as an opaque text generator behind the
//! [`providers::LlmProvider`] trait. Google Gemini is the default, with
//! `OpenAI` and Anthropic Claude available through `AI_PROVIDER`.
//!
//! Two adapters sit on top of the provider:
//!
//! - [`triage`] sends an uploaded photo with a fixed instruction prompt and
//!   parses the reply into a suggested report type and description.
//! - [`advice`] wraps a user's free-text description of a situation in a
//!   fixed prompt and returns the model's safety advice verbatim.

pub mod advice;
pub mod providers;
pub mod triage;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// The caller supplied input the adapters refuse to forward.
    #[error("{message}")]
    InvalidInput {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error, usually the message from its error body.
    #[error("{message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

impl AiError {
    /// Whether this error was caused by the caller's input rather than the
    /// provider.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}
